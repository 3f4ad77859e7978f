//! Encodes raw frames from a file into an AV1 OBU stream.
//!
//! ```bash
//! av1-encode-test --input in.yuv --output out.obu --width 1280 --height 720 --fps 60
//! av1-encode-test --input in.bgra --format BGRA --settings cbr.json \
//!     --update-at 120 --update-settings cbr-8000.json --output out.obu --width 1920 --height 1080
//! ```

use std::{
    fs::File,
    io::{BufReader, BufWriter, ErrorKind, Read, Write},
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use aom_dispatch::{Control, Controls};
use av1_encoder::{
    load_library, ChromaFormat, ColorRange, ColorSpace, Frame, LoadOptions, Plane, Session,
    Settings, VideoFormat, VideoInfo, SETTINGS_VERSION,
};
use clap::{Parser, ValueEnum};
use dcv_color_primitives as dcp;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "av1-encode-test", version, about = "Encode raw frames to AV1 with libaom")]
struct Cli {
    /// Raw frames, back to back, without padding between rows.
    #[arg(long)]
    input: PathBuf,
    /// The encoded packets are written here one after another.
    #[arg(long)]
    output: PathBuf,
    #[arg(long)]
    width: u32,
    #[arg(long)]
    height: u32,
    /// Frame rate as `NUM` or `NUM/DEN`.
    #[arg(long, default_value = "30", value_parser = parse_rate)]
    fps: (u32, u32),
    /// I420, I422, I444 or BGRA.
    #[arg(long, default_value = "I420")]
    format: VideoFormat,
    #[arg(long, value_enum, default_value_t = ColorSpaceArg::Bt709)]
    color_space: ColorSpaceArg,
    #[arg(long)]
    full_range: bool,

    /// Settings document (JSON), defaults are used for missing keys.
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Apply `--update-settings` once this many frames were submitted.
    #[arg(long, requires = "update_settings")]
    update_at: Option<u64>,
    #[arg(long)]
    update_settings: Option<PathBuf>,
    /// Stop after this many frames.
    #[arg(long)]
    frames: Option<u64>,

    /// Load this libaom instead of searching for one.
    #[arg(long)]
    library: Option<PathBuf>,
    /// Encoder ABI version of that libaom (29 for 3.6), searched for if unset.
    #[arg(long)]
    abi_version: Option<i32>,
    /// Treat a control as unavailable, e.g. `row-mt`. May be repeated.
    #[arg(long = "disable-control", value_parser = parse_control)]
    disabled_controls: Vec<Control>,
    /// Also write the sequence header to this file.
    #[arg(long)]
    headers: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum ColorSpaceArg {
    Bt601,
    Bt709,
    Srgb,
}

impl From<ColorSpaceArg> for ColorSpace {
    fn from(value: ColorSpaceArg) -> Self {
        match value {
            ColorSpaceArg::Bt601 => ColorSpace::Bt601,
            ColorSpaceArg::Bt709 => ColorSpace::Bt709,
            ColorSpaceArg::Srgb => ColorSpace::Srgb,
        }
    }
}

fn parse_rate(s: &str) -> Result<(u32, u32), String> {
    let (num, den) = s.split_once('/').unwrap_or((s, "1"));
    let num = num.trim().parse::<u32>().map_err(|e| e.to_string())?;
    let den = den.trim().parse::<u32>().map_err(|e| e.to_string())?;
    if num == 0 || den == 0 {
        return Err("frame rate must be positive".to_string());
    }
    Ok((num, den))
}

fn parse_control(s: &str) -> Result<Control, String> {
    Control::from_name(s).ok_or_else(|| {
        let names: Vec<_> = Control::ALL.iter().map(|c| c.name()).collect();
        format!("unknown control '{s}', expected one of {}", names.join(", "))
    })
}

fn read_settings(path: &Path) -> Result<Settings> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut settings = Settings::from_json(&json)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    settings.migrate(SETTINGS_VERSION);
    Ok(settings)
}

#[derive(Debug, Clone, Copy)]
enum InputLayout {
    Planar(ChromaFormat),
    Bgra,
}

/// Reads one frame at a time from the input file.
struct FrameReader {
    file: BufReader<File>,
    layout: InputLayout,
    width: u32,
    height: u32,
    raw: Vec<u8>,
    converted: [Vec<u8>; 3],
}

impl FrameReader {
    fn open(path: &Path, format: VideoFormat, width: u32, height: u32) -> Result<Self> {
        let layout = match format {
            VideoFormat::I420 => InputLayout::Planar(ChromaFormat::Yuv420),
            VideoFormat::I422 => InputLayout::Planar(ChromaFormat::Yuv422),
            VideoFormat::I444 => InputLayout::Planar(ChromaFormat::Yuv444),
            VideoFormat::BGRA => InputLayout::Bgra,
            other => bail!("cannot read {other} input, convert it to I420, I422, I444 or BGRA"),
        };

        let (w, h) = (width as usize, height as usize);
        let (raw_size, converted) = match layout {
            InputLayout::Planar(chroma) => {
                let size = (0..3)
                    .map(|plane| {
                        let (pw, ph) = chroma.plane_size(plane, width, height);
                        pw * ph
                    })
                    .sum::<usize>();
                (size, Default::default())
            }
            InputLayout::Bgra => (w * h * 4, [vec![0; w * h], vec![0; w * h], vec![0; w * h]]),
        };

        let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        Ok(Self {
            file: BufReader::new(file),
            layout,
            width,
            height,
            raw: vec![0; raw_size],
            converted,
        })
    }

    /// `None` at the end of the input.
    fn next_frame(&mut self, pts: i64) -> Result<Option<Frame<'_>>> {
        match self.file.read_exact(&mut self.raw) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let planes = match self.layout {
            InputLayout::Planar(chroma) => {
                let mut planes = [Plane::new(&[], 0); 3];
                let mut rest = self.raw.as_slice();
                for (index, plane) in planes.iter_mut().enumerate() {
                    let (pw, ph) = chroma.plane_size(index, self.width, self.height);
                    let (data, tail) = rest.split_at(pw * ph);
                    *plane = Plane::new(data, pw);
                    rest = tail;
                }
                planes
            }
            InputLayout::Bgra => {
                bgra_to_i444(self.width, self.height, &self.raw, &mut self.converted)?;
                let w = self.width as usize;
                [
                    Plane::new(&self.converted[0], w),
                    Plane::new(&self.converted[1], w),
                    Plane::new(&self.converted[2], w),
                ]
            }
        };

        Ok(Some(Frame::new(planes, pts)))
    }
}

fn bgra_to_i444(width: u32, height: u32, src: &[u8], dst: &mut [Vec<u8>; 3]) -> Result<()> {
    let src_format = dcp::ImageFormat {
        pixel_format: dcp::PixelFormat::Bgra,
        color_space: dcp::ColorSpace::Rgb,
        num_planes: 1,
    };
    let dst_format = dcp::ImageFormat {
        pixel_format: dcp::PixelFormat::I444,
        color_space: dcp::ColorSpace::Bt709,
        num_planes: 3,
    };

    let [y, u, v] = dst;
    dcp::convert_image(
        width,
        height,
        &src_format,
        None,
        &[src],
        &dst_format,
        None,
        &mut [y.as_mut_slice(), u.as_mut_slice(), v.as_mut_slice()],
    )?;
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let settings = match &cli.settings {
        Some(path) => read_settings(path)?,
        None => Settings::default(),
    };
    let update = match &cli.update_settings {
        Some(path) => Some(read_settings(path)?),
        None => None,
    };

    let options = LoadOptions {
        path: cli.library.clone(),
        abi_version: cli.abi_version,
        disabled_controls: cli
            .disabled_controls
            .iter()
            .fold(Controls::empty(), |acc, c| acc | c.flag()),
        ..LoadOptions::default()
    };
    let library = load_library(&options)?;

    let (fps_num, fps_den) = cli.fps;
    let video = VideoInfo::new(cli.width, cli.height, fps_num, fps_den, cli.format).with_color(
        cli.color_space.into(),
        if cli.full_range {
            ColorRange::Full
        } else {
            ColorRange::Partial
        },
    );

    let mut reader = FrameReader::open(&cli.input, cli.format, cli.width, cli.height)?;
    let mut session = Session::new(library, video, settings)?;

    match (session.global_headers(), &cli.headers) {
        (Some(headers), Some(path)) => {
            std::fs::write(path, headers)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("Wrote {} bytes of sequence header", headers.len());
        }
        (None, Some(_)) => warn!("The encoder did not provide a sequence header"),
        _ => {}
    }

    let file = File::create(&cli.output)
        .with_context(|| format!("failed to create {}", cli.output.display()))?;
    let mut output = BufWriter::new(file);

    let mut frames = 0u64;
    let mut packets = 0u64;
    let mut keyframes = 0u64;
    let mut bytes = 0usize;

    loop {
        if cli.frames.is_some_and(|limit| frames >= limit) {
            break;
        }
        if cli.update_at == Some(frames) {
            if let Some(update) = &update {
                session.update(update)?;
                info!(
                    "Settings updated at frame {frames}, now {:?} at {} kbit/s",
                    session.config().rate_control,
                    session.config().target_bitrate
                );
            }
        }

        let Some(frame) = reader.next_frame(frames as i64)? else {
            break;
        };
        if let Some(packet) = session.encode(&frame)? {
            output.write_all(packet.data)?;
            packets += 1;
            bytes += packet.size();
            if packet.keyframe {
                keyframes += 1;
                debug!("Key frame at pts {}", packet.pts);
            }
        }
        frames += 1;
    }
    output.flush()?;

    for failure in session.diagnostics() {
        warn!(
            "{} = {} was refused: {}",
            failure.control.name(),
            failure.value,
            failure.error
        );
    }
    info!(
        "Encoded {frames} frames into {packets} packets ({keyframes} key frames), {bytes} bytes"
    );

    session.close();
    Ok(())
}
