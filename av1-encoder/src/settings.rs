//! User-facing encoder settings.
//!
//! The document is a flat JSON object keyed like the host's settings store
//! (`"RateControl.Limits.Bitrate"`, ...). Keys that are missing take their
//! defaults. Integer options use `-1` for "leave the encoder's value alone".

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{config::RateControlMode, Result};

/// Current version of the settings layout.
pub const SETTINGS_VERSION: u64 = 1;

/// Usage class the encoder's defaults are tuned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Usage {
    GoodQuality,
    #[default]
    Realtime,
    AllIntra,
}

impl Usage {
    pub fn raw(self) -> u32 {
        match self {
            Usage::GoodQuality => aom_dispatch::ffi::AOM_USAGE_GOOD_QUALITY,
            Usage::Realtime => aom_dispatch::ffi::AOM_USAGE_REALTIME,
            Usage::AllIntra => aom_dispatch::ffi::AOM_USAGE_ALL_INTRA,
        }
    }
}

impl TryFrom<i64> for Usage {
    type Error = String;

    fn try_from(value: i64) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Usage::GoodQuality),
            1 => Ok(Usage::Realtime),
            2 => Ok(Usage::AllIntra),
            v => Err(format!("unknown usage {v}")),
        }
    }
}

impl From<Usage> for i64 {
    fn from(value: Usage) -> Self {
        value.raw() as i64
    }
}

/// How the key-frame interval is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum KeyFrameIntervalType {
    #[default]
    Seconds,
    Frames,
}

impl TryFrom<i64> for KeyFrameIntervalType {
    type Error = String;

    fn try_from(value: i64) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(KeyFrameIntervalType::Seconds),
            1 => Ok(KeyFrameIntervalType::Frames),
            v => Err(format!("unknown key-frame interval type {v}")),
        }
    }
}

impl From<KeyFrameIntervalType> for i64 {
    fn from(value: KeyFrameIntervalType) -> Self {
        match value {
            KeyFrameIntervalType::Seconds => 0,
            KeyFrameIntervalType::Frames => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(rename = "Preset.Usage")]
    pub usage: Usage,
    /// Speed/quality trade-off, `-1` keeps the usage default.
    #[serde(rename = "Preset.CPUUsage")]
    pub cpu_usage: i64,

    #[serde(rename = "RateControl.Mode")]
    pub rate_control: RateControlMode,
    /// Frames of look-ahead.
    #[serde(rename = "RateControl.LookAhead")]
    pub look_ahead: i64,
    /// kbit/s.
    #[serde(rename = "RateControl.Limits.Bitrate")]
    pub bitrate: i64,
    #[serde(rename = "RateControl.Limits.Bitrate.Undershoot")]
    pub undershoot: i64,
    #[serde(rename = "RateControl.Limits.Bitrate.Overshoot")]
    pub overshoot: i64,
    /// CQ level, only used by the quality based modes.
    #[serde(rename = "RateControl.Limits.Quality")]
    pub quality: i64,
    #[serde(rename = "RateControl.Limits.Quantizer.Minimum")]
    pub min_quantizer: i64,
    #[serde(rename = "RateControl.Limits.Quantizer.Maximum")]
    pub max_quantizer: i64,
    /// Milliseconds.
    #[serde(rename = "RateControl.Buffer.Size")]
    pub buffer_size: i64,
    #[serde(rename = "RateControl.Buffer.Size.Initial")]
    pub buffer_initial: i64,
    #[serde(rename = "RateControl.Buffer.Size.Optimal")]
    pub buffer_optimal: i64,

    #[serde(rename = "KeyFrames.IntervalType")]
    pub keyframe_interval_type: KeyFrameIntervalType,
    #[serde(rename = "KeyFrames.Interval.Seconds")]
    pub keyframe_interval_seconds: f64,
    #[serde(rename = "KeyFrames.Interval.Frames")]
    pub keyframe_interval_frames: i64,

    /// `0` picks the number of logical CPUs.
    #[serde(rename = "Advanced.Threads")]
    pub threads: i64,
    #[serde(rename = "Advanced.RowMultiThreading")]
    pub row_multithreading: i64,
    /// log2 of the tile count.
    #[serde(rename = "Advanced.Tile.Columns")]
    pub tile_columns: i64,
    #[serde(rename = "Advanced.Tile.Rows")]
    pub tile_rows: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            usage: Usage::Realtime,
            cpu_usage: -1,
            rate_control: RateControlMode::Cbr,
            look_ahead: -1,
            bitrate: 6000,
            undershoot: -1,
            overshoot: -1,
            quality: -1,
            min_quantizer: -1,
            max_quantizer: -1,
            buffer_size: -1,
            buffer_initial: -1,
            buffer_optimal: -1,
            keyframe_interval_type: KeyFrameIntervalType::Seconds,
            keyframe_interval_seconds: 2.0,
            keyframe_interval_frames: 300,
            threads: 0,
            row_multithreading: -1,
            tile_columns: -1,
            tile_rows: -1,
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Brings settings saved by an older version up to date.
    pub fn migrate(&mut self, version: u64) {
        debug!("Settings version {version}, current is {SETTINGS_VERSION}, nothing to migrate");
    }

    /// Thread count to configure, `Advanced.Threads` or the number of logical
    /// CPUs when that is not positive. Never less than one.
    pub fn resolved_threads(&self) -> u32 {
        match u32::try_from(self.threads) {
            Ok(threads) if threads > 0 => threads,
            _ => std::thread::available_parallelism()
                .map(|n| n.get() as u32)
                .unwrap_or(1),
        }
    }
}

/// An option value that is not the `-1` sentinel (or any other negative).
pub(crate) fn explicit(value: i64) -> Option<u32> {
    u32::try_from(value).ok()
}

/// Like [`explicit`], for values handed to encoder controls.
pub(crate) fn explicit_control(value: i64) -> Option<i32> {
    i32::try_from(value).ok().filter(|v| *v >= 0)
}
