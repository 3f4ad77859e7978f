use std::{marker::PhantomData, os::raw::c_int, ptr};

use crate::{ffi, Encoder};

bitflags::bitflags! {
    /// Properties of an encoded frame, as reported by the encoder.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FrameFlags: u32 {
        /// The frame can be decoded without any other frame.
        const KEY = ffi::AOM_FRAME_IS_KEY;
        /// No other frame references this one.
        const DROPPABLE = ffi::AOM_FRAME_IS_DROPPABLE;
        const INTRA_ONLY = ffi::AOM_FRAME_IS_INTRAONLY;
        const SWITCH = ffi::AOM_FRAME_IS_SWITCH;
        const ERROR_RESILIENT = ffi::AOM_FRAME_IS_ERROR_RESILIENT;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FramePacket<'a> {
    pub data: &'a [u8],
    pub pts: i64,
    pub duration: u64,
    pub flags: FrameFlags,
}

impl<'a> FramePacket<'a> {
    pub fn is_key(&self) -> bool {
        self.flags.contains(FrameFlags::KEY)
    }

    pub fn is_droppable(&self) -> bool {
        self.flags.contains(FrameFlags::DROPPABLE)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Packet<'a> {
    Frame(FramePacket<'a>),
    /// Statistics and other packet kinds we do not interpret.
    Other(c_int),
}

/// Packets produced by the last call to [`Encoder::encode`].
///
/// The data stays valid until the encoder is used again, which the borrow on
/// the encoder enforces.
pub struct Packets<'a> {
    get_cx_data: ffi::aom_codec_get_cx_data_fn,
    ctx: *mut ffi::aom_codec_ctx_t,
    iter: ffi::aom_codec_iter_t,
    _encoder: PhantomData<&'a mut Encoder>,
}

impl<'a> Packets<'a> {
    pub(crate) fn new(encoder: &'a mut Encoder) -> Self {
        Self {
            get_cx_data: encoder.lib.0.fns.get_cx_data,
            ctx: encoder.ctx.as_mut(),
            iter: ptr::null(),
            _encoder: PhantomData,
        }
    }
}

impl<'a> Iterator for Packets<'a> {
    type Item = Packet<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let pkt = unsafe { (self.get_cx_data)(self.ctx, &mut self.iter) };
        if pkt.is_null() {
            return None;
        }

        let pkt = unsafe { &*pkt };
        if pkt.kind != ffi::AOM_CODEC_CX_FRAME_PKT {
            return Some(Packet::Other(pkt.kind));
        }

        let frame = unsafe { pkt.data.frame };
        let data = if frame.buf.is_null() || frame.sz == 0 {
            &[][..]
        } else {
            unsafe { std::slice::from_raw_parts(frame.buf as *const u8, frame.sz) }
        };

        Some(Packet::Frame(FramePacket {
            data,
            pts: frame.pts,
            duration: frame.duration as u64,
            flags: FrameFlags::from_bits_retain(frame.flags),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_flag_bits_are_kept() {
        let flags = FrameFlags::from_bits_retain(ffi::AOM_FRAME_IS_KEY | 0x1000);
        assert!(flags.contains(FrameFlags::KEY));
        assert_eq!(flags.bits() & 0x1000, 0x1000);
    }

    #[test]
    fn key_and_droppable_accessors() {
        let packet = FramePacket {
            data: &[0, 1, 2],
            pts: 7,
            duration: 1,
            flags: FrameFlags::DROPPABLE,
        };
        assert!(!packet.is_key());
        assert!(packet.is_droppable());
    }
}
