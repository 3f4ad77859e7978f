use std::os::raw::c_int;

use crate::ffi;

/// Encoder controls that are set through `aom_codec_control`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    CpuUsed,
    CqLevel,
    RowMultiThreading,
    TileColumns,
    TileRows,
    ColorPrimaries,
    TransferCharacteristics,
    MatrixCoefficients,
    ColorRange,
    ChromaSamplePosition,
}

impl Control {
    pub const ALL: [Control; 10] = [
        Control::CpuUsed,
        Control::CqLevel,
        Control::RowMultiThreading,
        Control::TileColumns,
        Control::TileRows,
        Control::ColorPrimaries,
        Control::TransferCharacteristics,
        Control::MatrixCoefficients,
        Control::ColorRange,
        Control::ChromaSamplePosition,
    ];

    pub(crate) fn id(self) -> c_int {
        match self {
            Control::CpuUsed => ffi::AOME_SET_CPUUSED,
            Control::CqLevel => ffi::AOME_SET_CQ_LEVEL,
            Control::RowMultiThreading => ffi::AV1E_SET_ROW_MT,
            Control::TileColumns => ffi::AV1E_SET_TILE_COLUMNS,
            Control::TileRows => ffi::AV1E_SET_TILE_ROWS,
            Control::ColorPrimaries => ffi::AV1E_SET_COLOR_PRIMARIES,
            Control::TransferCharacteristics => ffi::AV1E_SET_TRANSFER_CHARACTERISTICS,
            Control::MatrixCoefficients => ffi::AV1E_SET_MATRIX_COEFFICIENTS,
            Control::ColorRange => ffi::AV1E_SET_COLOR_RANGE,
            Control::ChromaSamplePosition => ffi::AV1E_SET_CHROMA_SAMPLE_POSITION,
        }
    }

    /// Name used in configuration files and logs.
    pub fn name(self) -> &'static str {
        match self {
            Control::CpuUsed => "cpu-used",
            Control::CqLevel => "cq-level",
            Control::RowMultiThreading => "row-mt",
            Control::TileColumns => "tile-columns",
            Control::TileRows => "tile-rows",
            Control::ColorPrimaries => "color-primaries",
            Control::TransferCharacteristics => "transfer-characteristics",
            Control::MatrixCoefficients => "matrix-coefficients",
            Control::ColorRange => "color-range",
            Control::ChromaSamplePosition => "chroma-sample-position",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    pub fn flag(self) -> Controls {
        match self {
            Control::CpuUsed => Controls::CPU_USED,
            Control::CqLevel => Controls::CQ_LEVEL,
            Control::RowMultiThreading => Controls::ROW_MT,
            Control::TileColumns => Controls::TILE_COLUMNS,
            Control::TileRows => Controls::TILE_ROWS,
            Control::ColorPrimaries => Controls::COLOR_PRIMARIES,
            Control::TransferCharacteristics => Controls::TRANSFER_CHARACTERISTICS,
            Control::MatrixCoefficients => Controls::MATRIX_COEFFICIENTS,
            Control::ColorRange => Controls::COLOR_RANGE,
            Control::ChromaSamplePosition => Controls::CHROMA_SAMPLE_POSITION,
        }
    }
}

bitflags::bitflags! {
    /// A set of controls, used to describe what a loaded library can be asked to do.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Controls: u32 {
        const CPU_USED = 1 << 0;
        const CQ_LEVEL = 1 << 1;
        const ROW_MT = 1 << 2;
        const TILE_COLUMNS = 1 << 3;
        const TILE_ROWS = 1 << 4;
        const COLOR_PRIMARIES = 1 << 5;
        const TRANSFER_CHARACTERISTICS = 1 << 6;
        const MATRIX_COEFFICIENTS = 1 << 7;
        const COLOR_RANGE = 1 << 8;
        const CHROMA_SAMPLE_POSITION = 1 << 9;
    }
}

impl Controls {
    pub fn supports(&self, control: Control) -> bool {
        self.contains(control.flag())
    }
}
