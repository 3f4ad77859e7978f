use std::{marker::PhantomData, os::raw::c_int};

use crate::{ffi, Error, Library, Result};

/// Row alignment used for every plane we hand to the encoder.
pub const STRIDE_ALIGN: usize = 32;

pub fn align_up(value: usize, alignment: usize) -> usize {
    (value + alignment - 1) & !(alignment - 1)
}

/// Planar 8-bit layouts accepted by the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    I420,
    I422,
    I444,
}

impl ImageFormat {
    pub(crate) fn raw(self) -> ffi::aom_img_fmt_t {
        match self {
            ImageFormat::I420 => ffi::AOM_IMG_FMT_I420,
            ImageFormat::I422 => ffi::AOM_IMG_FMT_I422,
            ImageFormat::I444 => ffi::AOM_IMG_FMT_I444,
        }
    }

    /// Horizontal and vertical chroma subsampling as shift amounts.
    pub fn chroma_shift(self) -> (u32, u32) {
        match self {
            ImageFormat::I420 => (1, 1),
            ImageFormat::I422 => (1, 0),
            ImageFormat::I444 => (0, 0),
        }
    }

    /// Where the planes of a `width`x`height` picture live in one contiguous
    /// buffer, matching what `aom_img_wrap` computes for the same arguments.
    pub fn layout(self, width: u32, height: u32) -> ImageLayout {
        let (xcs, ycs) = self.chroma_shift();
        let aligned_w = align_up(width as usize, 1 << xcs);
        let aligned_h = align_up(height as usize, 1 << ycs);

        let luma_stride = align_up(aligned_w, STRIDE_ALIGN);
        let chroma_stride = luma_stride >> xcs;
        let chroma_rows = aligned_h >> ycs;

        let luma_size = luma_stride * aligned_h;
        let chroma_size = chroma_stride * chroma_rows;

        ImageLayout {
            strides: [luma_stride, chroma_stride, chroma_stride],
            offsets: [0, luma_size, luma_size + chroma_size],
            rows: [aligned_h, chroma_rows, chroma_rows],
            size: luma_size + 2 * chroma_size,
        }
    }
}

/// Plane geometry of a wrapped image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageLayout {
    pub strides: [usize; 3],
    pub offsets: [usize; 3],
    pub rows: [usize; 3],
    /// Total number of bytes the buffer must hold.
    pub size: usize,
}

impl ImageLayout {
    pub fn plane_len(&self, plane: usize) -> usize {
        self.strides[plane] * self.rows[plane]
    }
}

/// Color signalling written into each image before it is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageColor {
    pub primaries: c_int,
    pub transfer: c_int,
    pub matrix: c_int,
    pub full_range: bool,
    pub chroma_sample_position: c_int,
    pub monochrome: bool,
}

/// An `aom_image_t` describing memory owned by someone else.
///
/// Nothing is allocated: the planes point into the wrapped buffer, which stays
/// mutably borrowed for as long as the image exists.
pub struct Image<'a> {
    pub(crate) raw: ffi::aom_image_t,
    _buf: PhantomData<&'a mut [u8]>,
}

impl<'a> Image<'a> {
    pub fn width(&self) -> u32 {
        self.raw.d_w
    }

    pub fn height(&self) -> u32 {
        self.raw.d_h
    }

    pub fn set_color(&mut self, color: &ImageColor) {
        self.raw.cp = color.primaries;
        self.raw.tc = color.transfer;
        self.raw.mc = color.matrix;
        self.raw.range = c_int::from(color.full_range);
        self.raw.csp = color.chroma_sample_position;
        self.raw.monochrome = c_int::from(color.monochrome);
    }
}

impl Library {
    /// Describes `data` as a `width`x`height` picture in `format`.
    pub fn wrap_image<'a>(
        &self,
        format: ImageFormat,
        width: u32,
        height: u32,
        data: &'a mut [u8],
    ) -> Result<Image<'a>> {
        let required = format.layout(width, height).size;
        if data.len() < required {
            return Err(Error::ImageWrap {
                required,
                actual: data.len(),
            });
        }

        let mut raw: ffi::aom_image_t = unsafe { std::mem::zeroed() };
        let wrapped = unsafe {
            (self.0.fns.img_wrap)(
                &mut raw,
                format.raw(),
                width,
                height,
                STRIDE_ALIGN as _,
                data.as_mut_ptr(),
            )
        };
        if wrapped.is_null() {
            return Err(Error::Codec {
                code: ffi::AOM_CODEC_INVALID_PARAM,
                message: "aom_img_wrap rejected the image".to_string(),
                detail: None,
            });
        }

        Ok(Image {
            raw,
            _buf: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn i420_1080p_layout() {
        let layout = ImageFormat::I420.layout(1920, 1080);
        assert_eq!(layout.strides, [1920, 960, 960]);
        assert_eq!(layout.rows, [1080, 540, 540]);
        assert_eq!(layout.offsets, [0, 1920 * 1080, 1920 * 1080 + 960 * 540]);
        assert_eq!(layout.size, 1920 * 1080 * 3 / 2);
    }

    #[test]
    fn odd_sizes_are_padded() {
        let layout = ImageFormat::I420.layout(33, 17);
        assert_eq!(layout.strides, [64, 32, 32]);
        assert_eq!(layout.rows, [18, 9, 9]);
        assert_eq!(layout.size, 64 * 18 + 2 * 32 * 9);
    }

    #[test]
    fn i422_keeps_full_chroma_height() {
        let layout = ImageFormat::I422.layout(1280, 720);
        assert_eq!(layout.strides, [1280, 640, 640]);
        assert_eq!(layout.rows, [720, 720, 720]);
        assert_eq!(layout.plane_len(1), 640 * 720);
    }

    #[test]
    fn i444_has_three_equal_planes() {
        let layout = ImageFormat::I444.layout(100, 50);
        assert_eq!(layout.strides, [128, 128, 128]);
        assert_eq!(layout.size, 3 * 128 * 50);
    }
}
