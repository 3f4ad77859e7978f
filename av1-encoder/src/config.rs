use serde::{Deserialize, Serialize};

use crate::{
    format::PictureFormat,
    settings::{explicit, KeyFrameIntervalType, Settings, Usage},
};

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    pub num: u32,
    pub den: u32,
}

impl Rational {
    pub const fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    pub const fn invert(self) -> Self {
        Self {
            num: self.den,
            den: self.num,
        }
    }

    pub fn to_f64(self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

impl std::fmt::Debug for Rational {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum RateControlMode {
    Vbr,
    #[default]
    Cbr,
    /// Constrained quality, bitrate is a ceiling.
    ConstantQuality,
    /// Constant quantizer, bitrate limits do not apply.
    FixedQuantizer,
}

bitflags::bitflags! {
    /// User parameters that have an effect under a rate control mode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RateControlParameters: u8 {
        const BITRATE = 1 << 0;
        /// Both the undershoot and the overshoot percentage.
        const OVER_UNDERSHOOT = 1 << 1;
        const QUALITY = 1 << 2;
    }
}

impl RateControlMode {
    pub fn raw(self) -> i32 {
        use aom_dispatch::ffi;
        match self {
            RateControlMode::Vbr => ffi::AOM_VBR,
            RateControlMode::Cbr => ffi::AOM_CBR,
            RateControlMode::ConstantQuality => ffi::AOM_CQ,
            RateControlMode::FixedQuantizer => ffi::AOM_Q,
        }
    }

    pub fn parameters(self) -> RateControlParameters {
        match self {
            RateControlMode::Cbr => RateControlParameters::BITRATE,
            RateControlMode::Vbr => {
                RateControlParameters::BITRATE | RateControlParameters::OVER_UNDERSHOOT
            }
            RateControlMode::ConstantQuality => RateControlParameters::all(),
            RateControlMode::FixedQuantizer => RateControlParameters::QUALITY,
        }
    }

    /// Whether the CQ level control is meaningful.
    pub fn uses_quality(self) -> bool {
        self.parameters().contains(RateControlParameters::QUALITY)
    }
}

impl TryFrom<i64> for RateControlMode {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RateControlMode::Vbr),
            1 => Ok(RateControlMode::Cbr),
            2 => Ok(RateControlMode::ConstantQuality),
            3 => Ok(RateControlMode::FixedQuantizer),
            v => Err(format!("unknown rate control mode {v}")),
        }
    }
}

impl From<RateControlMode> for i64 {
    fn from(value: RateControlMode) -> Self {
        value.raw() as i64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyFrameMode {
    Fixed,
    #[default]
    Auto,
}

/// The encoder parameters a session manages.
///
/// Everything the encoder has that is not listed here keeps the library's
/// default for `usage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub usage: Usage,
    pub width: u32,
    pub height: u32,
    /// Seconds per tick, the inverse of the frame rate.
    pub timebase: Rational,
    pub bit_depth: u32,
    pub input_bit_depth: u32,
    pub profile: u32,
    pub monochrome: bool,
    pub single_pass: bool,
    pub threads: u32,
    /// Frames the encoder may buffer before emitting output.
    pub look_ahead: u32,

    pub rate_control: RateControlMode,
    /// kbit/s.
    pub target_bitrate: u32,
    pub undershoot_pct: u32,
    pub overshoot_pct: u32,
    pub min_quantizer: u32,
    pub max_quantizer: u32,
    /// Milliseconds.
    pub buffer_size: u32,
    pub buffer_initial_size: u32,
    pub buffer_optimal_size: u32,

    pub keyframe_mode: KeyFrameMode,
    pub keyframe_min_distance: u32,
    pub keyframe_max_distance: u32,
}

impl BackendConfig {
    /// Starts from the backend's `defaults`, fixes everything the picture
    /// format decides, then applies `settings`.
    pub fn initial(
        defaults: BackendConfig,
        picture: &PictureFormat,
        frame_rate: Rational,
        settings: &Settings,
    ) -> Self {
        let mut config = Self {
            usage: settings.usage,
            width: picture.width,
            height: picture.height,
            timebase: frame_rate.invert(),
            bit_depth: 8,
            input_bit_depth: 8,
            profile: picture.chroma.profile(),
            monochrome: picture.color.monochrome,
            single_pass: true,
            threads: settings.resolved_threads(),
            ..defaults
        };
        config.merge_update(settings);
        config
    }

    /// Applies the user controlled parameters. Geometry and timing are left
    /// alone, applying the same settings twice changes nothing.
    pub fn merge_update(&mut self, settings: &Settings) {
        self.rate_control = settings.rate_control;

        let overrides = [
            (settings.look_ahead, &mut self.look_ahead),
            (settings.bitrate, &mut self.target_bitrate),
            (settings.undershoot, &mut self.undershoot_pct),
            (settings.overshoot, &mut self.overshoot_pct),
            (settings.min_quantizer, &mut self.min_quantizer),
            (settings.max_quantizer, &mut self.max_quantizer),
            (settings.buffer_size, &mut self.buffer_size),
            (settings.buffer_initial, &mut self.buffer_initial_size),
            (settings.buffer_optimal, &mut self.buffer_optimal_size),
        ];
        for (value, field) in overrides {
            if let Some(value) = explicit(value) {
                *field = value;
            }
        }

        match self.rate_control {
            RateControlMode::Cbr => {
                self.undershoot_pct = 0;
                self.overshoot_pct = 0;
            }
            RateControlMode::FixedQuantizer => {
                self.target_bitrate = 0;
                self.undershoot_pct = 0;
                self.overshoot_pct = 0;
            }
            RateControlMode::Vbr | RateControlMode::ConstantQuality => {}
        }

        self.keyframe_mode = KeyFrameMode::Auto;
        self.keyframe_max_distance = match settings.keyframe_interval_type {
            KeyFrameIntervalType::Seconds => {
                let frames = settings.keyframe_interval_seconds * self.timebase.invert().to_f64();
                frames.round() as u32
            }
            KeyFrameIntervalType::Frames => {
                u32::try_from(settings.keyframe_interval_frames.max(0)).unwrap_or(u32::MAX)
            }
        };
        self.keyframe_min_distance = self.keyframe_max_distance;
    }
}
