use tracing::debug;

use crate::backend::{FrameFlags, Packet};

/// How much the stream suffers if a packet is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketPriority {
    /// A key frame.
    Keyframe,
    /// Dropping it breaks the frames that reference it.
    Reference,
    /// Can be dropped at will.
    Disposable,
}

impl PacketPriority {
    pub fn classify(flags: FrameFlags) -> Self {
        if flags.contains(FrameFlags::KEY) {
            PacketPriority::Keyframe
        } else if !flags.contains(FrameFlags::DROPPABLE) {
            PacketPriority::Reference
        } else {
            PacketPriority::Disposable
        }
    }

    /// The value used for both priority and drop priority.
    pub fn value(self) -> i32 {
        match self {
            PacketPriority::Keyframe => 0,
            PacketPriority::Reference => -1,
            PacketPriority::Disposable => -2,
        }
    }
}

/// An encoded frame, borrowed from the backend until the next encode.
#[derive(Debug, Clone, Copy)]
pub struct OutputPacket<'a> {
    pub data: &'a [u8],
    pub pts: i64,
    pub dts: i64,
    pub keyframe: bool,
    pub priority: i32,
    pub drop_priority: i32,
}

impl<'a> OutputPacket<'a> {
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Takes the first frame out of `packets`, skipping anything else before it.
/// Whatever follows stays in the backend.
pub fn extract<'a>(packets: impl Iterator<Item = Packet<'a>>) -> Option<OutputPacket<'a>> {
    let frame = packets
        .filter_map(|packet| match packet {
            Packet::Frame(frame) => Some(frame),
            Packet::Other(_) => None,
        })
        .next()?;

    let priority = PacketPriority::classify(frame.flags);
    let packet = OutputPacket {
        data: frame.data,
        pts: frame.pts.wrapping_add(1),
        dts: frame.pts,
        keyframe: priority == PacketPriority::Keyframe,
        priority: priority.value(),
        drop_priority: priority.value(),
    };

    debug!(
        "Packet PTS={} DTS={} Size={}",
        packet.pts,
        packet.dts,
        packet.size()
    );
    Some(packet)
}
