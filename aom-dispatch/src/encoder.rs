use std::{os::raw::c_int, ptr};

use tracing::{debug, warn};

use crate::{ffi, Control, Error, Image, Library, Packets, Result};

/// An initialized `aom_codec_ctx_t`.
///
/// Keeps its [`Library`] alive and destroys the context when dropped.
pub struct Encoder {
    pub(crate) lib: Library,
    pub(crate) ctx: Box<ffi::aom_codec_ctx_t>,
}

// A context is only ever touched through `&mut self`.
unsafe impl Send for Encoder {}

impl Library {
    /// Creates an encoder context from a complete configuration.
    ///
    /// Unless the ABI version was pinned, an `ABI version mismatch` moves on
    /// to the next known version.
    pub fn encoder(&self, cfg: &ffi::aom_codec_enc_cfg_t) -> Result<Encoder> {
        let versions = self.abi_candidates();
        for &version in &versions {
            let mut ctx: Box<ffi::aom_codec_ctx_t> = Box::new(unsafe { std::mem::zeroed() });
            let code = unsafe {
                (self.0.fns.enc_init_ver)(ctx.as_mut(), self.0.iface, cfg, 0, version)
            };
            if code == ffi::AOM_CODEC_ABI_MISMATCH && versions.len() > 1 {
                debug!("Encoder ABI version {version} rejected");
                continue;
            }
            self.check(code, Some(&*ctx as *const _))?;
            self.accept_abi(version);

            debug!("Encoder context created for {}x{}", cfg.g_w, cfg.g_h);
            return Ok(Encoder {
                lib: self.clone(),
                ctx,
            });
        }

        Err(Error::Codec {
            code: ffi::AOM_CODEC_ABI_MISMATCH,
            message: self.error_string(ffi::AOM_CODEC_ABI_MISMATCH),
            detail: Some(format!("no encoder ABI version accepted, tried {versions:?}")),
        })
    }
}

impl Encoder {
    pub fn library(&self) -> &Library {
        &self.lib
    }

    /// Applies a new configuration to the running encoder.
    pub fn set_config(&mut self, cfg: &ffi::aom_codec_enc_cfg_t) -> Result<()> {
        let code = unsafe { (self.lib.0.fns.enc_config_set)(self.ctx.as_mut(), cfg) };
        self.check(code)
    }

    pub fn supports(&self, control: Control) -> bool {
        self.lib.supports(control)
    }

    /// Sets one integer control.
    pub fn control(&mut self, control: Control, value: c_int) -> Result<()> {
        let f = match self.lib.0.fns.control {
            Some(f) if self.lib.supports(control) => f,
            _ => return Err(Error::UnsupportedControl(control)),
        };
        let code = unsafe { f(self.ctx.as_mut(), control.id(), value) };
        self.check(code)
    }

    /// Sequence header bytes.
    ///
    /// The buffer handed out by the library is copied and never released, so
    /// this is meant to be called once per encoder.
    pub fn global_headers(&mut self) -> Result<Option<Vec<u8>>> {
        let buf = unsafe { (self.lib.0.fns.get_global_headers)(self.ctx.as_mut()) };
        if buf.is_null() {
            return Ok(None);
        }
        let buf = unsafe { &*buf };
        if buf.buf.is_null() || buf.sz == 0 {
            return Ok(None);
        }
        let bytes = unsafe { std::slice::from_raw_parts(buf.buf as *const u8, buf.sz) };
        Ok(Some(bytes.to_vec()))
    }

    /// Submits one picture. `None` asks the encoder to flush.
    pub fn encode(
        &mut self,
        image: Option<&Image<'_>>,
        pts: i64,
        duration: u64,
        flags: i64,
    ) -> Result<()> {
        let img = image.map_or(ptr::null(), |i| &i.raw as *const _);
        let code = unsafe {
            (self.lib.0.fns.encode)(
                self.ctx.as_mut(),
                img,
                pts,
                duration as _,
                flags as ffi::aom_enc_frame_flags_t,
            )
        };
        self.check(code)
    }

    /// Drains the packets produced by the last [`Encoder::encode`].
    pub fn packets(&mut self) -> Packets<'_> {
        Packets::new(self)
    }

    fn check(&self, code: ffi::aom_codec_err_t) -> Result<()> {
        self.lib.check(code, Some(&*self.ctx as *const _))
    }
}

impl Drop for Encoder {
    fn drop(&mut self) {
        let code = unsafe { (self.lib.0.fns.destroy)(self.ctx.as_mut()) };
        if code != ffi::AOM_CODEC_OK {
            warn!(
                "Destroying the encoder context failed: {}",
                self.lib.error_string(code)
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{ffi, Control, FrameFlags, ImageColor, ImageFormat, Library, Packet};

    #[test]
    #[ignore = "needs libaom installed"]
    fn encode_a_few_gray_frames() {
        let library = Library::new().unwrap();
        let mut cfg = library.default_config(ffi::AOM_USAGE_REALTIME).unwrap();
        cfg.g_w = 320;
        cfg.g_h = 240;
        cfg.g_timebase = ffi::aom_rational_t { num: 1, den: 30 };
        cfg.rc_end_usage = ffi::AOM_CBR;
        cfg.rc_target_bitrate = 500;

        let mut encoder = library.encoder(&cfg).unwrap();
        encoder.control(Control::CpuUsed, 10).unwrap();
        let headers = encoder.global_headers().unwrap();
        assert!(headers.is_some_and(|h| !h.is_empty()));

        let layout = ImageFormat::I420.layout(320, 240);
        let mut buffer = vec![128u8; layout.size];
        let mut frames = 0;
        for pts in 0..5 {
            let mut image = library
                .wrap_image(ImageFormat::I420, 320, 240, &mut buffer)
                .unwrap();
            image.set_color(&ImageColor {
                primaries: 1,
                transfer: 1,
                matrix: 1,
                full_range: false,
                chroma_sample_position: 1,
                monochrome: false,
            });
            encoder.encode(Some(&image), pts, 1, 0).unwrap();
            for packet in encoder.packets() {
                if let Packet::Frame(frame) = packet {
                    if pts == 0 {
                        assert!(frame.is_key());
                    }
                    frames += 1;
                }
            }
        }
        assert!(frames > 0);
    }

    #[test]
    #[ignore = "needs libaom installed"]
    fn abi_version_is_found_without_pinning() {
        let library = Library::new().unwrap();
        assert_eq!(library.abi_version(), None);
        let mut cfg = library.default_config(ffi::AOM_USAGE_REALTIME).unwrap();
        cfg.g_w = 64;
        cfg.g_h = 64;
        let _first = library.encoder(&cfg).unwrap();
        let version = library.abi_version().unwrap();
        assert!(ffi::AOM_ENCODER_ABI_VERSIONS.contains(&version));
        let _second = library.encoder(&cfg).unwrap();
        assert_eq!(library.abi_version(), Some(version));
    }

    #[test]
    #[ignore = "needs libaom installed"]
    fn color_controls_leave_inter_frames_alone() {
        let library = Library::new().unwrap();
        let mut cfg = library.default_config(ffi::AOM_USAGE_REALTIME).unwrap();
        cfg.g_w = 64;
        cfg.g_h = 64;
        cfg.g_timebase = ffi::aom_rational_t { num: 1, den: 30 };
        cfg.rc_end_usage = ffi::AOM_CBR;
        cfg.rc_target_bitrate = 300;

        let mut encoder = library.encoder(&cfg).unwrap();
        encoder.control(Control::CpuUsed, 10).unwrap();
        for (control, value) in [
            (Control::ColorPrimaries, 1),
            (Control::TransferCharacteristics, 1),
            (Control::MatrixCoefficients, 1),
            (Control::ColorRange, 1),
            (Control::ChromaSamplePosition, 1),
        ] {
            encoder.control(control, value).unwrap();
        }

        let mut buffer = vec![128u8; ImageFormat::I420.layout(64, 64).size];
        let mut inter_frames = 0;
        for pts in 0..6 {
            let image = library
                .wrap_image(ImageFormat::I420, 64, 64, &mut buffer)
                .unwrap();
            encoder.encode(Some(&image), pts, 1, 0).unwrap();
            for packet in encoder.packets() {
                if let Packet::Frame(frame) = packet {
                    if !frame.is_key() {
                        inter_frames += 1;
                        assert!(!frame.flags.contains(FrameFlags::ERROR_RESILIENT));
                    }
                }
            }
        }
        assert!(inter_frames > 0);
    }

    #[test]
    #[ignore = "needs libaom installed"]
    fn small_buffers_are_rejected() {
        let library = Library::new().unwrap();
        let mut buffer = vec![0u8; 16];
        let result = library.wrap_image(ImageFormat::I444, 64, 64, &mut buffer);
        assert!(matches!(result, Err(crate::Error::ImageWrap { .. })));
    }
}
