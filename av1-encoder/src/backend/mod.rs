//! The seam between a session and the library doing the actual encoding.

mod aom;
#[cfg(test)]
pub(crate) mod mock;

pub use aom::{load_library, AomContext};
pub use aom_dispatch::{Control, FrameFlags, FramePacket, Packet};

use crate::{config::BackendConfig, error::BackendError, pool::FrameBuffer, settings::Usage};

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Creates encoder contexts.
pub trait Backend {
    type Context: BackendContext;

    /// The backend's own defaults for a usage class.
    fn defaults(&self, usage: Usage) -> BackendResult<BackendConfig>;

    /// Creates an encoder from a complete configuration.
    fn init(&self, config: &BackendConfig) -> BackendResult<Self::Context>;
}

/// An initialized encoder. Dropping it destroys the encoder.
pub trait BackendContext {
    type Packets<'a>: Iterator<Item = Packet<'a>>
    where
        Self: 'a;

    fn set_config(&mut self, config: &BackendConfig) -> BackendResult<()>;

    /// Whether `control` can be used with this backend build.
    fn supports(&self, control: Control) -> bool;

    fn control(&mut self, control: Control, value: i32) -> BackendResult<()>;

    fn global_headers(&mut self) -> BackendResult<Option<Vec<u8>>>;

    fn encode(&mut self, buffer: &mut FrameBuffer, pts: i64, duration: u64) -> BackendResult<()>;

    /// Output of the last [`BackendContext::encode`].
    fn packets(&mut self) -> Self::Packets<'_>;
}
