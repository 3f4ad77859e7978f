use aom_dispatch::ImageLayout;
use tracing::debug;

use crate::{format::PictureFormat, frame::Frame, Error, Result};

/// A picture buffer laid out the way the encoder expects, Y then U then V in
/// one allocation.
pub struct FrameBuffer {
    data: Vec<u8>,
    picture: PictureFormat,
    layout: ImageLayout,
}

impl FrameBuffer {
    fn new(picture: PictureFormat) -> Result<Self> {
        let layout = picture
            .chroma
            .image_format()
            .layout(picture.width, picture.height);

        let mut data = Vec::new();
        data.try_reserve_exact(layout.size)
            .map_err(|source| Error::AllocationFailure {
                size: layout.size,
                source,
            })?;
        data.resize(layout.size, 0);

        Ok(Self {
            data,
            picture,
            layout,
        })
    }

    pub fn picture(&self) -> &PictureFormat {
        &self.picture
    }

    pub fn layout(&self) -> &ImageLayout {
        &self.layout
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn plane(&self, plane: usize) -> &[u8] {
        let start = self.layout.offsets[plane];
        &self.data[start..start + self.layout.plane_len(plane)]
    }

    /// Copies the visible area of `frame` in, row by row.
    ///
    /// The frame is checked completely before anything is written.
    pub fn copy_from(&mut self, frame: &Frame<'_>) -> Result<()> {
        let PictureFormat {
            width,
            height,
            chroma,
            ..
        } = self.picture;

        for (index, plane) in frame.planes.iter().enumerate() {
            let (w, h) = chroma.plane_size(index, width, height);
            if h > 0 && plane.row(h - 1, w).is_none() {
                return Err(Error::InvalidFrame(format!(
                    "plane {index} needs {h} rows of {w} bytes, got {} bytes with line size {}",
                    plane.data().len(),
                    plane.line_size()
                )));
            }
        }

        for (index, plane) in frame.planes.iter().enumerate() {
            let (w, h) = chroma.plane_size(index, width, height);
            let stride = self.layout.strides[index];
            let base = self.layout.offsets[index];
            for y in 0..h {
                let Some(src) = plane.row(y, w) else { break };
                let dst = base + y * stride;
                self.data[dst..dst + w].copy_from_slice(src);
            }
        }

        Ok(())
    }
}

/// Fixed set of frame buffers, handed out in a strict ring order.
pub struct FramePool {
    buffers: Vec<FrameBuffer>,
    head: usize,
}

impl FramePool {
    /// Allocates `count` buffers up front, at least one.
    pub fn create(count: usize, picture: PictureFormat) -> Result<Self> {
        let count = count.max(1);
        let mut buffers = Vec::with_capacity(count);
        for _ in 0..count {
            buffers.push(FrameBuffer::new(picture)?);
        }

        debug!(
            "Allocated {count} frame buffers of {} bytes for {}x{} {:?}",
            buffers[0].layout.size, picture.width, picture.height, picture.chroma
        );

        Ok(Self { buffers, head: 0 })
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// The buffer at the head of the ring. Returns the same buffer until
    /// [`FramePool::release_back`] is called.
    pub fn acquire_next(&mut self) -> &mut FrameBuffer {
        &mut self.buffers[self.head]
    }

    /// Moves the head buffer to the tail.
    pub fn release_back(&mut self) {
        self.head = (self.head + 1) % self.buffers.len();
    }
}
