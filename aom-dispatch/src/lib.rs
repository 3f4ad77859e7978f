//! Runtime bindings to libaom's AV1 encoder.
//!
//! The shared library is opened with `libloading` and every entry point is
//! resolved by name, so nothing links against libaom at build time. A build
//! without some optional entry points (`aom_codec_control`, the error string
//! helpers) is still usable, see [`Library::controls`].

mod control;
mod encoder;
mod error;
pub mod ffi;
mod image;
mod library;
mod packet;

pub use control::{Control, Controls};
pub use encoder::Encoder;
pub use error::{check_error, Error, Result};
pub use image::{align_up, Image, ImageColor, ImageFormat, ImageLayout, STRIDE_ALIGN};
pub use library::{Library, LoadOptions, LIBRARY_PATH_ENV};
pub use packet::{FrameFlags, FramePacket, Packet, Packets};
