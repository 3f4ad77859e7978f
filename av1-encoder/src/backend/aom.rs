use aom_dispatch::{ffi, Control, Encoder, ImageColor, Library, LoadOptions, Packets};
use tracing::info;

use super::{Backend, BackendContext, BackendResult};
use crate::{
    config::{BackendConfig, KeyFrameMode, Rational, RateControlMode},
    pool::FrameBuffer,
    settings::Usage,
    Error, Result,
};

/// Loads libaom, failing with [`Error::BackendUnavailable`].
pub fn load_library(options: &LoadOptions) -> Result<Library> {
    let library = Library::load(options).map_err(Error::BackendUnavailable)?;
    info!(
        "Using libaom {} with controls {:?}",
        library.version().unwrap_or("(unknown version)"),
        library.controls()
    );
    Ok(library)
}

fn from_raw(usage: Usage, raw: &ffi::aom_codec_enc_cfg_t) -> BackendConfig {
    BackendConfig {
        usage,
        width: raw.g_w,
        height: raw.g_h,
        timebase: Rational::new(raw.g_timebase.num as u32, raw.g_timebase.den as u32),
        bit_depth: raw.g_bit_depth as u32,
        input_bit_depth: raw.g_input_bit_depth,
        profile: raw.g_profile,
        monochrome: raw.monochrome != 0,
        single_pass: raw.g_pass == ffi::AOM_RC_ONE_PASS,
        threads: raw.g_threads,
        look_ahead: raw.g_lag_in_frames,
        rate_control: RateControlMode::try_from(raw.rc_end_usage as i64).unwrap_or_default(),
        target_bitrate: raw.rc_target_bitrate,
        undershoot_pct: raw.rc_undershoot_pct,
        overshoot_pct: raw.rc_overshoot_pct,
        min_quantizer: raw.rc_min_quantizer,
        max_quantizer: raw.rc_max_quantizer,
        buffer_size: raw.rc_buf_sz,
        buffer_initial_size: raw.rc_buf_initial_sz,
        buffer_optimal_size: raw.rc_buf_optimal_sz,
        keyframe_mode: if raw.kf_mode == ffi::AOM_KF_FIXED {
            KeyFrameMode::Fixed
        } else {
            KeyFrameMode::Auto
        },
        keyframe_min_distance: raw.kf_min_dist,
        keyframe_max_distance: raw.kf_max_dist,
    }
}

fn apply(config: &BackendConfig, raw: &mut ffi::aom_codec_enc_cfg_t) {
    raw.g_usage = config.usage.raw();
    raw.g_w = config.width;
    raw.g_h = config.height;
    raw.g_timebase = ffi::aom_rational_t {
        num: config.timebase.num as _,
        den: config.timebase.den as _,
    };
    raw.g_bit_depth = config.bit_depth as _;
    raw.g_input_bit_depth = config.input_bit_depth;
    raw.g_profile = config.profile;
    raw.monochrome = config.monochrome.into();
    if config.single_pass {
        raw.g_pass = ffi::AOM_RC_ONE_PASS;
    }
    raw.g_threads = config.threads;
    raw.g_lag_in_frames = config.look_ahead;

    raw.rc_end_usage = config.rate_control.raw();
    raw.rc_target_bitrate = config.target_bitrate;
    raw.rc_undershoot_pct = config.undershoot_pct;
    raw.rc_overshoot_pct = config.overshoot_pct;
    raw.rc_min_quantizer = config.min_quantizer;
    raw.rc_max_quantizer = config.max_quantizer;
    raw.rc_buf_sz = config.buffer_size;
    raw.rc_buf_initial_sz = config.buffer_initial_size;
    raw.rc_buf_optimal_sz = config.buffer_optimal_size;

    raw.kf_mode = match config.keyframe_mode {
        KeyFrameMode::Fixed => ffi::AOM_KF_FIXED,
        KeyFrameMode::Auto => ffi::AOM_KF_AUTO,
    };
    raw.kf_min_dist = config.keyframe_min_distance;
    raw.kf_max_dist = config.keyframe_max_distance;
}

impl Backend for Library {
    type Context = AomContext;

    fn defaults(&self, usage: Usage) -> BackendResult<BackendConfig> {
        let raw = self.default_config(usage.raw())?;
        Ok(from_raw(usage, &raw))
    }

    fn init(&self, config: &BackendConfig) -> BackendResult<AomContext> {
        let raw = raw_config(self, config)?;
        let encoder = self.encoder(&raw)?;
        Ok(AomContext {
            library: self.clone(),
            encoder,
        })
    }
}

/// The library defaults for the config's usage with `config` on top.
fn raw_config(
    library: &Library,
    config: &BackendConfig,
) -> BackendResult<Box<ffi::aom_codec_enc_cfg_t>> {
    let mut raw = library.default_config(config.usage.raw())?;
    apply(config, &mut raw);
    Ok(raw)
}

pub struct AomContext {
    library: Library,
    encoder: Encoder,
}

impl BackendContext for AomContext {
    type Packets<'a> = Packets<'a>;

    fn set_config(&mut self, config: &BackendConfig) -> BackendResult<()> {
        let raw = raw_config(&self.library, config)?;
        Ok(self.encoder.set_config(&raw)?)
    }

    fn supports(&self, control: Control) -> bool {
        self.encoder.supports(control)
    }

    fn control(&mut self, control: Control, value: i32) -> BackendResult<()> {
        Ok(self.encoder.control(control, value)?)
    }

    fn global_headers(&mut self) -> BackendResult<Option<Vec<u8>>> {
        Ok(self.encoder.global_headers()?)
    }

    fn encode(&mut self, buffer: &mut FrameBuffer, pts: i64, duration: u64) -> BackendResult<()> {
        let picture = *buffer.picture();
        let mut image = self.library.wrap_image(
            picture.chroma.image_format(),
            picture.width,
            picture.height,
            buffer.data_mut(),
        )?;
        image.set_color(&ImageColor {
            primaries: picture.color.primaries,
            transfer: picture.color.transfer,
            matrix: picture.color.matrix,
            full_range: picture.color.full_range,
            chroma_sample_position: picture.color.chroma_sample_position,
            monochrome: picture.color.monochrome,
        });
        Ok(self.encoder.encode(Some(&image), pts, duration, 0)?)
    }

    fn packets(&mut self) -> Packets<'_> {
        self.encoder.packets()
    }
}
