use std::{fmt, str::FromStr};

use aom_dispatch::ImageFormat;
use tracing::warn;

use crate::{Error, Result};

/// Pixel formats a host video pipeline may deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoFormat {
    None,
    I420,
    NV12,
    YVYU,
    YUY2,
    UYVY,
    RGBA,
    BGRA,
    BGRX,
    Y800,
    I444,
    BGR3,
    I422,
    I40A,
    I42A,
    YUVA,
    AYUV,
    I010,
    P010,
    I210,
    I412,
    YA2L,
    P216,
    P416,
    V210,
}

impl VideoFormat {
    const ALL: [VideoFormat; 25] = [
        VideoFormat::None,
        VideoFormat::I420,
        VideoFormat::NV12,
        VideoFormat::YVYU,
        VideoFormat::YUY2,
        VideoFormat::UYVY,
        VideoFormat::RGBA,
        VideoFormat::BGRA,
        VideoFormat::BGRX,
        VideoFormat::Y800,
        VideoFormat::I444,
        VideoFormat::BGR3,
        VideoFormat::I422,
        VideoFormat::I40A,
        VideoFormat::I42A,
        VideoFormat::YUVA,
        VideoFormat::AYUV,
        VideoFormat::I010,
        VideoFormat::P010,
        VideoFormat::I210,
        VideoFormat::I412,
        VideoFormat::YA2L,
        VideoFormat::P216,
        VideoFormat::P416,
        VideoFormat::V210,
    ];

    pub fn name(self) -> &'static str {
        match self {
            VideoFormat::None => "None",
            VideoFormat::I420 => "I420",
            VideoFormat::NV12 => "NV12",
            VideoFormat::YVYU => "YVYU",
            VideoFormat::YUY2 => "YUY2",
            VideoFormat::UYVY => "UYVY",
            VideoFormat::RGBA => "RGBA",
            VideoFormat::BGRA => "BGRA",
            VideoFormat::BGRX => "BGRX",
            VideoFormat::Y800 => "Y800",
            VideoFormat::I444 => "I444",
            VideoFormat::BGR3 => "BGR3",
            VideoFormat::I422 => "I422",
            VideoFormat::I40A => "I40A",
            VideoFormat::I42A => "I42A",
            VideoFormat::YUVA => "YUVA",
            VideoFormat::AYUV => "AYUV",
            VideoFormat::I010 => "I010",
            VideoFormat::P010 => "P010",
            VideoFormat::I210 => "I210",
            VideoFormat::I412 => "I412",
            VideoFormat::YA2L => "YA2L",
            VideoFormat::P216 => "P216",
            VideoFormat::P416 => "P416",
            VideoFormat::V210 => "V210",
        }
    }

    /// Maps the format onto the closest planar layout the encoder accepts.
    ///
    /// Formats without an exact match are forced to the planar layout with the
    /// same chroma resolution, the caller is expected to convert its frames.
    pub fn resolve(self) -> Result<ChromaFormat> {
        let chroma = match self {
            VideoFormat::I420 => return Ok(ChromaFormat::Yuv420),
            VideoFormat::I422 => return Ok(ChromaFormat::Yuv422),
            VideoFormat::I444 => return Ok(ChromaFormat::Yuv444),

            VideoFormat::NV12 | VideoFormat::I40A => ChromaFormat::Yuv420,
            VideoFormat::UYVY | VideoFormat::YUY2 | VideoFormat::YVYU | VideoFormat::I42A => {
                ChromaFormat::Yuv422
            }
            VideoFormat::BGR3
            | VideoFormat::BGRA
            | VideoFormat::BGRX
            | VideoFormat::RGBA
            | VideoFormat::YUVA
            | VideoFormat::AYUV
            | VideoFormat::Y800 => ChromaFormat::Yuv444,

            other => return Err(Error::UnsupportedColorFormat(other)),
        };

        warn!(
            "Color format '{}' is not supported, forcing '{}'",
            self,
            chroma.video_format()
        );
        Ok(chroma)
    }
}

impl fmt::Display for VideoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VideoFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown video format '{s}'"))
    }
}

/// Planar chroma layouts the encoder works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChromaFormat {
    Yuv420,
    Yuv422,
    Yuv444,
}

impl ChromaFormat {
    pub fn video_format(self) -> VideoFormat {
        match self {
            ChromaFormat::Yuv420 => VideoFormat::I420,
            ChromaFormat::Yuv422 => VideoFormat::I422,
            ChromaFormat::Yuv444 => VideoFormat::I444,
        }
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            ChromaFormat::Yuv420 => ImageFormat::I420,
            ChromaFormat::Yuv422 => ImageFormat::I422,
            ChromaFormat::Yuv444 => ImageFormat::I444,
        }
    }

    /// AV1 profile able to carry this chroma layout at 8 bits.
    pub fn profile(self) -> u32 {
        match self {
            ChromaFormat::Yuv420 => 0,
            ChromaFormat::Yuv444 => 1,
            ChromaFormat::Yuv422 => 2,
        }
    }

    /// Visible size of `plane` for a `width`x`height` picture.
    pub fn plane_size(self, plane: usize, width: u32, height: u32) -> (usize, usize) {
        let (w, h) = (width as usize, height as usize);
        if plane == 0 {
            return (w, h);
        }
        match self {
            ChromaFormat::Yuv420 => ((w + 1) / 2, (h + 1) / 2),
            ChromaFormat::Yuv422 => ((w + 1) / 2, h),
            ChromaFormat::Yuv444 => (w, h),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpace {
    #[default]
    Default,
    Bt601,
    Bt709,
    Srgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorRange {
    #[default]
    Default,
    Partial,
    Full,
}

// ISO/IEC 23091-4 code points.
const CICP_BT_709: i32 = 1;
const CICP_BT_601: i32 = 6;
const CHROMA_SAMPLE_POSITION_VERTICAL: i32 = 1;

/// Color signalling carried by every frame buffer and sent to the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorMetadata {
    pub primaries: i32,
    pub transfer: i32,
    pub matrix: i32,
    pub full_range: bool,
    pub chroma_sample_position: i32,
    pub monochrome: bool,
}

impl ColorMetadata {
    pub fn new(space: ColorSpace, range: ColorRange, monochrome: bool) -> Self {
        let cicp = match space {
            ColorSpace::Bt601 => CICP_BT_601,
            ColorSpace::Default | ColorSpace::Bt709 | ColorSpace::Srgb => CICP_BT_709,
        };
        Self {
            primaries: cicp,
            transfer: cicp,
            matrix: cicp,
            full_range: range == ColorRange::Full,
            chroma_sample_position: CHROMA_SAMPLE_POSITION_VERTICAL,
            monochrome,
        }
    }
}

/// What the host's video pipeline produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps_num: u32,
    pub fps_den: u32,
    pub format: VideoFormat,
    /// Format the host was asked to convert to, if any. Takes precedence over
    /// `format`.
    pub preferred_format: Option<VideoFormat>,
    pub color_space: ColorSpace,
    pub range: ColorRange,
}

impl VideoInfo {
    pub fn new(width: u32, height: u32, fps_num: u32, fps_den: u32, format: VideoFormat) -> Self {
        Self {
            width,
            height,
            fps_num,
            fps_den,
            format,
            preferred_format: None,
            color_space: ColorSpace::Default,
            range: ColorRange::Default,
        }
    }

    pub fn with_color(mut self, color_space: ColorSpace, range: ColorRange) -> Self {
        self.color_space = color_space;
        self.range = range;
        self
    }

    pub fn with_preferred_format(mut self, format: VideoFormat) -> Self {
        self.preferred_format = Some(format);
        self
    }

    /// Fixes up the format, color space and range into what is encoded.
    pub fn resolve(&self) -> Result<PictureFormat> {
        let format = match self.preferred_format {
            Some(VideoFormat::None) | None => self.format,
            Some(preferred) => preferred,
        };
        let chroma = format.resolve()?;

        let color_space = match self.color_space {
            ColorSpace::Default => ColorSpace::Srgb,
            space => space,
        };
        let range = match self.range {
            ColorRange::Default => ColorRange::Partial,
            range => range,
        };
        let monochrome = self.format == VideoFormat::Y800;

        Ok(PictureFormat {
            width: self.width,
            height: self.height,
            chroma,
            color: ColorMetadata::new(color_space, range, monochrome),
        })
    }
}

/// Geometry and layout of the pictures a session encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PictureFormat {
    pub width: u32,
    pub height: u32,
    pub chroma: ChromaFormat,
    pub color: ColorMetadata,
}
