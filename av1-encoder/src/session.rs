use tracing::{debug, error, info, warn};

use crate::{
    backend::{Backend, BackendContext, Control},
    config::{BackendConfig, Rational},
    error::BackendError,
    format::{PictureFormat, VideoInfo},
    frame::Frame,
    packet::{self, OutputPacket},
    pool::FramePool,
    settings::{explicit_control, Settings},
    Error, Result,
};

/// A control that the encoder refused.
#[derive(Debug, Clone)]
pub struct TuningFailure {
    pub control: Control,
    pub value: i32,
    pub error: BackendError,
}

/// Collects what a session needs before anything touches the backend.
pub struct SessionBuilder<B: Backend> {
    backend: B,
    video: VideoInfo,
    settings: Settings,
}

impl<B: Backend> SessionBuilder<B> {
    pub fn new(backend: B, video: VideoInfo) -> Self {
        Self {
            backend,
            video,
            settings: Settings::default(),
        }
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Resolves the picture format and translates the settings, starting from
    /// the backend's defaults for the requested usage.
    pub fn configure(self) -> Result<ConfiguredSession<B>> {
        let picture = self.video.resolve()?;
        let defaults = self
            .backend
            .defaults(self.settings.usage)
            .map_err(Error::InitializationFailure)?;
        let config = BackendConfig::initial(
            defaults,
            &picture,
            Rational::new(self.video.fps_num, self.video.fps_den),
            &self.settings,
        );

        Ok(ConfiguredSession {
            backend: self.backend,
            picture,
            settings: self.settings,
            config,
        })
    }
}

/// A translated configuration, not yet handed to the backend.
pub struct ConfiguredSession<B: Backend> {
    backend: B,
    picture: PictureFormat,
    settings: Settings,
    config: BackendConfig,
}

impl<B: Backend> ConfiguredSession<B> {
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub fn picture(&self) -> &PictureFormat {
        &self.picture
    }

    /// Initializes the encoder, then applies color signalling, user tuning,
    /// captures the global headers and allocates the frame buffers.
    pub fn start(self) -> Result<Session<B>> {
        let mut context = self.backend.init(&self.config).map_err(|e| {
            error!("Failed to initialize the encoder: {e}");
            Error::InitializationFailure(e)
        })?;

        let mut diagnostics = vec![];
        let color = self.picture.color;
        for (control, value) in [
            (Control::ColorPrimaries, color.primaries),
            (Control::TransferCharacteristics, color.transfer),
            (Control::MatrixCoefficients, color.matrix),
            (Control::ColorRange, i32::from(color.full_range)),
            (Control::ChromaSamplePosition, color.chroma_sample_position),
        ] {
            set_control(&mut context, control, value, &mut diagnostics);
        }

        context.set_config(&self.config).map_err(|e| {
            error!("Failed to apply the configuration: {e}");
            Error::InitializationFailure(e)
        })?;
        apply_tuning(&mut context, &self.config, &self.settings, &mut diagnostics);

        let global_headers = match context.global_headers() {
            Ok(headers) => headers,
            Err(e) => {
                warn!("Failed to retrieve the global headers: {e}");
                None
            }
        };

        let pool = FramePool::create(self.config.threads as usize, self.picture)?;

        info!(
            "Encoder started: {}x{} {:?}, {:?} at {} kbit/s, {} threads",
            self.config.width,
            self.config.height,
            self.picture.chroma,
            self.config.rate_control,
            self.config.target_bitrate,
            self.config.threads
        );

        Ok(Session {
            pool,
            context,
            backend: self.backend,
            picture: self.picture,
            settings: self.settings,
            config: self.config,
            global_headers,
            diagnostics,
        })
    }
}

/// A running encoder.
///
/// Dropping the session releases the frame buffers first, then the encoder.
pub struct Session<B: Backend> {
    pool: FramePool,
    context: B::Context,
    backend: B,
    picture: PictureFormat,
    settings: Settings,
    config: BackendConfig,
    global_headers: Option<Vec<u8>>,
    diagnostics: Vec<TuningFailure>,
}

impl<B: Backend> Session<B> {
    /// Configures and starts a session in one go.
    pub fn new(backend: B, video: VideoInfo, settings: Settings) -> Result<Self> {
        SessionBuilder::new(backend, video)
            .with_settings(settings)
            .configure()?
            .start()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub fn picture(&self) -> &PictureFormat {
        &self.picture
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn buffer_count(&self) -> usize {
        self.pool.len()
    }

    /// Controls the encoder refused so far.
    pub fn diagnostics(&self) -> &[TuningFailure] {
        &self.diagnostics
    }

    /// Sequence header captured after initialization.
    pub fn global_headers(&self) -> Option<&[u8]> {
        self.global_headers.as_deref()
    }

    /// Same bytes as [`Session::global_headers`].
    pub fn sei_data(&self) -> Option<&[u8]> {
        self.global_headers()
    }

    /// Applies new user settings to the running encoder.
    ///
    /// If the encoder rejects the result, the previous configuration stays in
    /// effect. Control failures afterwards are only recorded.
    pub fn update(&mut self, settings: &Settings) -> Result<()> {
        let mut config = self.config.clone();
        config.merge_update(settings);

        self.context.set_config(&config).map_err(|e| {
            error!("Failed to apply the configuration: {e}");
            Error::ReconfigurationFailure(e)
        })?;
        self.config = config;
        self.settings = settings.clone();

        apply_tuning(
            &mut self.context,
            &self.config,
            &self.settings,
            &mut self.diagnostics,
        );
        Ok(())
    }

    /// Copies `frame` into the next free buffer and submits it. Returns the
    /// first packet the encoder produced, if any.
    pub fn encode(&mut self, frame: &Frame<'_>) -> Result<Option<OutputPacket<'_>>> {
        let buffer = self.pool.acquire_next();
        buffer.copy_from(frame)?;

        self.context.encode(buffer, frame.pts, 1).map_err(|e| {
            error!("Encoding frame {} failed: {e}", frame.pts);
            Error::EncodeFailure(e)
        })?;
        self.pool.release_back();

        Ok(packet::extract(self.context.packets()))
    }

    /// Ends the session, releasing the buffers and the encoder.
    pub fn close(self) {}
}

impl<B: Backend> Drop for Session<B> {
    fn drop(&mut self) {
        debug!("Closing encoder session");
    }
}

fn set_control<C: BackendContext>(
    context: &mut C,
    control: Control,
    value: i32,
    diagnostics: &mut Vec<TuningFailure>,
) {
    if !context.supports(control) {
        debug!("Skipping {}, not supported by the encoder", control.name());
        return;
    }
    if let Err(error) = context.control(control, value) {
        warn!("Failed to change {} to {value}: {error}", control.name());
        diagnostics.push(TuningFailure {
            control,
            value,
            error,
        });
    }
}

/// Controls that only exist for a running encoder.
fn apply_tuning<C: BackendContext>(
    context: &mut C,
    config: &BackendConfig,
    settings: &Settings,
    diagnostics: &mut Vec<TuningFailure>,
) {
    let quality = if config.rate_control.uses_quality() {
        settings.quality
    } else {
        -1
    };

    for (control, value) in [
        (Control::CpuUsed, settings.cpu_usage),
        (Control::CqLevel, quality),
        (Control::RowMultiThreading, settings.row_multithreading),
        (Control::TileColumns, settings.tile_columns),
        (Control::TileRows, settings.tile_rows),
    ] {
        if let Some(value) = explicit_control(value) {
            set_control(context, control, value, diagnostics);
        }
    }
}

#[cfg(test)]
mod tests {
    use aom_dispatch::Controls;

    use super::*;
    use crate::{
        backend::{
            mock::{MockBackend, Script, Scripted},
            FrameFlags,
        },
        config::RateControlMode,
        format::{ColorRange, ColorSpace, VideoFormat},
        frame::Plane,
    };

    fn hd() -> VideoInfo {
        VideoInfo::new(1920, 1080, 30, 1, VideoFormat::I420)
    }

    fn small() -> VideoInfo {
        VideoInfo::new(64, 48, 30, 1, VideoFormat::I420)
    }

    struct Picture {
        planes: [Vec<u8>; 3],
        strides: [usize; 3],
    }

    impl Picture {
        fn i420(width: usize, height: usize) -> Self {
            let (cw, ch) = ((width + 1) / 2, (height + 1) / 2);
            Self {
                planes: [vec![16; width * height], vec![128; cw * ch], vec![128; cw * ch]],
                strides: [width, cw, cw],
            }
        }

        fn frame(&self, pts: i64) -> Frame<'_> {
            Frame::new(
                [
                    Plane::new(&self.planes[0], self.strides[0]),
                    Plane::new(&self.planes[1], self.strides[1]),
                    Plane::new(&self.planes[2], self.strides[2]),
                ],
                pts,
            )
        }
    }

    fn session(video: VideoInfo, settings: Settings, script: Script) -> Session<MockBackend> {
        Session::new(MockBackend::new(script), video, settings).unwrap()
    }

    #[test]
    fn start_sequence() {
        let mut settings = Settings::default();
        settings.threads = 3;
        settings.cpu_usage = 8;
        let video = hd().with_color(ColorSpace::Bt709, ColorRange::Full);
        let session = session(video, settings, Script::default());
        let journal = session.backend().journal.borrow();

        assert_eq!(journal.inits.len(), 1);
        assert_eq!(journal.config_sets.len(), 1);
        assert_eq!(journal.inits[0], journal.config_sets[0]);
        assert_eq!(
            journal.controls,
            vec![
                (Control::ColorPrimaries, 1),
                (Control::TransferCharacteristics, 1),
                (Control::MatrixCoefficients, 1),
                (Control::ColorRange, 1),
                (Control::ChromaSamplePosition, 1),
                (Control::CpuUsed, 8),
            ]
        );
        assert_eq!(journal.header_requests, 1);
        assert_eq!(session.buffer_count(), 3);
        assert_eq!(session.global_headers(), Some(&[0x0a, 0x0b, 0x00, 0x00][..]));
        assert_eq!(session.sei_data(), session.global_headers());
    }

    #[test]
    fn failed_init_is_fatal() {
        let script = Script {
            fail_init: true,
            ..Script::default()
        };
        let result = Session::new(MockBackend::new(script), small(), Settings::default());
        assert!(matches!(result, Err(Error::InitializationFailure(_))));
    }

    #[test]
    fn rejected_initial_config_is_fatal() {
        let script = Script {
            max_bitrate: Some(1000),
            ..Script::default()
        };
        let backend = MockBackend::new(script);
        let journal = backend.journal.clone();
        let result = Session::new(backend, small(), Settings::default());
        assert!(matches!(result, Err(Error::InitializationFailure(_))));
        assert!(journal.borrow().destroyed);
    }

    #[test]
    fn unsupported_format_never_reaches_the_backend() {
        let backend = MockBackend::new(Script::default());
        let journal = backend.journal.clone();
        let video = VideoInfo::new(64, 48, 30, 1, VideoFormat::P010);
        let result = Session::new(backend, video, Settings::default());
        assert!(matches!(result, Err(Error::UnsupportedColorFormat(VideoFormat::P010))));
        assert!(journal.borrow().inits.is_empty());
    }

    #[test]
    fn color_controls_are_best_effort() {
        let script = Script {
            unsupported: Controls::COLOR_RANGE,
            failing: Controls::MATRIX_COEFFICIENTS,
            ..Script::default()
        };
        let session = session(small(), Settings::default(), script);
        let journal = session.backend().journal.borrow();
        assert!(!journal.controls.iter().any(|(c, _)| *c == Control::ColorRange));
        assert_eq!(session.diagnostics().len(), 1);
        assert_eq!(session.diagnostics()[0].control, Control::MatrixCoefficients);
    }

    #[test]
    fn end_to_end_bitrate_update() {
        let mut settings = Settings::default();
        settings.threads = 4;
        let mut session = session(hd(), settings.clone(), Script::default());
        assert_eq!(session.config().rate_control, RateControlMode::Cbr);
        assert_eq!(session.config().target_bitrate, 6000);

        let picture = Picture::i420(1920, 1080);
        let buffers: Vec<usize> = (0..session.buffer_count())
            .map(|i| {
                session.encode(&picture.frame(i as i64)).unwrap();
                session.backend().journal.borrow().encodes[i].1
            })
            .collect();
        assert_eq!(buffers.len(), 4);

        settings.bitrate = 8000;
        session.update(&settings).unwrap();
        assert_eq!(session.config().target_bitrate, 8000);

        let start = buffers.len() as i64;
        for pts in start..start + 2 * buffers.len() as i64 {
            let packet = session.encode(&picture.frame(pts)).unwrap().unwrap();
            assert_eq!(packet.dts, pts);
        }

        let journal = session.backend().journal.borrow();
        assert_eq!(journal.inits.len(), 1);
        assert_eq!(journal.config_sets.last().unwrap().target_bitrate, 8000);
        for (i, (_, buffer)) in journal.encodes.iter().enumerate() {
            assert_eq!(*buffer, buffers[i % buffers.len()]);
        }
    }

    #[test]
    fn rejected_update_keeps_the_last_good_config() {
        let script = Script {
            max_bitrate: Some(7000),
            ..Script::default()
        };
        let mut session = session(small(), Settings::default(), script);
        let before = session.config().clone();

        let mut settings = Settings::default();
        settings.bitrate = 9000;
        settings.cpu_usage = 4;
        let result = session.update(&settings);
        assert!(matches!(result, Err(Error::ReconfigurationFailure(_))));
        assert_eq!(session.config(), &before);
        assert_eq!(session.settings(), &Settings::default());

        let journal = session.backend().journal.borrow();
        assert!(!journal.controls.iter().any(|(c, _)| *c == Control::CpuUsed));
    }

    #[test]
    fn tuning_controls_follow_settings() {
        let mut session = session(small(), Settings::default(), Script::default());
        let color_controls = session.backend().journal.borrow().controls.len();

        let mut settings = Settings::default();
        settings.rate_control = RateControlMode::Vbr;
        settings.quality = 20;
        settings.row_multithreading = 1;
        settings.tile_columns = 2;
        session.update(&settings).unwrap();

        settings.rate_control = RateControlMode::ConstantQuality;
        session.update(&settings).unwrap();

        let journal = session.backend().journal.borrow();
        assert_eq!(
            journal.controls[color_controls..],
            [
                (Control::RowMultiThreading, 1),
                (Control::TileColumns, 2),
                (Control::CqLevel, 20),
                (Control::RowMultiThreading, 1),
                (Control::TileColumns, 2),
            ]
        );
    }

    #[test]
    fn tuning_failures_do_not_fail_the_update() {
        let script = Script {
            failing: Controls::TILE_ROWS,
            unsupported: Controls::ROW_MT,
            ..Script::default()
        };
        let mut session = session(small(), Settings::default(), script);
        let mut settings = Settings::default();
        settings.tile_rows = 1;
        settings.row_multithreading = 1;
        session.update(&settings).unwrap();

        assert_eq!(session.diagnostics().len(), 1);
        assert_eq!(session.diagnostics()[0].control, Control::TileRows);
        assert_eq!(session.diagnostics()[0].error.code, Some(8));
    }

    #[test]
    fn geometry_survives_updates() {
        let mut session = session(small(), Settings::default(), Script::default());
        let mut settings = Settings::default();
        settings.keyframe_interval_seconds = 5.0;
        settings.look_ahead = 10;
        session.update(&settings).unwrap();
        assert_eq!((session.config().width, session.config().height), (64, 48));
        assert_eq!(session.config().timebase, Rational::new(1, 30));
        assert_eq!(session.config().keyframe_max_distance, 150);
        assert_eq!(session.config().look_ahead, 10);
    }

    #[test]
    fn timestamps_over_several_frames() {
        let mut session = session(small(), Settings::default(), Script::default());
        let picture = Picture::i420(64, 48);
        for pts in 0..6 {
            let packet = session.encode(&picture.frame(pts)).unwrap().unwrap();
            assert_eq!((packet.pts, packet.dts), (pts + 1, pts));
            assert_eq!(packet.keyframe, pts == 0);
            assert_eq!(packet.priority, if pts == 0 { 0 } else { -1 });
            assert_eq!(packet.size(), 100);
        }
    }

    #[test]
    fn one_packet_per_call() {
        fn burst(_pts: i64) -> Vec<Scripted> {
            vec![
                Scripted::Other(1),
                Scripted::Frame {
                    flags: FrameFlags::DROPPABLE,
                    size: 10,
                },
                Scripted::Frame {
                    flags: FrameFlags::KEY,
                    size: 20,
                },
            ]
        }
        let script = Script {
            output: burst,
            ..Script::default()
        };
        let mut session = session(small(), Settings::default(), script);
        let picture = Picture::i420(64, 48);
        let packet = session.encode(&picture.frame(0)).unwrap().unwrap();
        assert_eq!(packet.size(), 10);
        assert_eq!(packet.drop_priority, -2);
    }

    #[test]
    fn no_output_is_not_an_error() {
        let script = Script {
            output: |_| vec![],
            ..Script::default()
        };
        let mut session = session(small(), Settings::default(), script);
        let picture = Picture::i420(64, 48);
        assert!(session.encode(&picture.frame(0)).unwrap().is_none());
    }

    #[test]
    fn failed_encode_keeps_the_buffer() {
        let script = Script {
            fail_encode_at: Some(1),
            ..Script::default()
        };
        let mut settings = Settings::default();
        settings.threads = 2;
        let mut session = session(small(), settings, script);
        let picture = Picture::i420(64, 48);

        session.encode(&picture.frame(0)).unwrap();
        let result = session.encode(&picture.frame(1));
        assert!(matches!(result, Err(Error::EncodeFailure(_))));
        session.encode(&picture.frame(2)).unwrap();

        let journal = session.backend().journal.borrow();
        let pts: Vec<i64> = journal.encodes.iter().map(|(pts, _)| *pts).collect();
        assert_eq!(pts, vec![0, 2]);
        assert_ne!(journal.encodes[0].1, journal.encodes[1].1);
    }

    #[test]
    fn mismatched_frames_are_rejected() {
        let mut session = session(small(), Settings::default(), Script::default());
        let picture = Picture::i420(32, 24);
        let result = session.encode(&picture.frame(0));
        assert!(matches!(result, Err(Error::InvalidFrame(_))));
        assert!(session.backend().journal.borrow().encodes.is_empty());
    }

    #[test]
    fn closing_destroys_the_encoder() {
        let backend = MockBackend::new(Script::default());
        let journal = backend.journal.clone();
        let session = Session::new(backend, small(), Settings::default()).unwrap();
        assert!(!journal.borrow().destroyed);
        session.close();
        assert!(journal.borrow().destroyed);
    }
}
