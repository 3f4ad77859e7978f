//! AV1 encoding sessions on top of a dynamically loaded libaom.
//!
//! A [`Session`] owns one encoder context and a small ring of frame buffers.
//! It translates [`Settings`] into the encoder's configuration, copies caller
//! frames into its buffers and hands back at most one [`OutputPacket`] per
//! submitted frame.

pub mod backend;
mod config;
mod error;
mod format;
mod frame;
mod packet;
mod pool;
mod session;
mod settings;

pub use backend::{load_library, Backend, BackendContext};
pub use config::{
    BackendConfig, KeyFrameMode, RateControlMode, RateControlParameters, Rational,
};
pub use error::{BackendError, Error, Result};
pub use format::{
    ChromaFormat, ColorMetadata, ColorRange, ColorSpace, PictureFormat, VideoFormat, VideoInfo,
};
pub use frame::{Frame, Plane};
pub use packet::{extract, OutputPacket, PacketPriority};
pub use pool::{FrameBuffer, FramePool};
pub use session::{ConfiguredSession, Session, SessionBuilder, TuningFailure};
pub use settings::{KeyFrameIntervalType, Settings, Usage, SETTINGS_VERSION};

pub use aom_dispatch::{Library, LoadOptions};
