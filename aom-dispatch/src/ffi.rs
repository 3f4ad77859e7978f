//! Hand-written mirrors of the parts of `aom/aom_encoder.h`, `aom/aom_image.h`
//! and `aom/aomcx.h` that this crate touches.
//!
//! Nothing here is linked at build time. Every function is resolved from the
//! shared library at runtime, see [`crate::Library`].

#![allow(non_camel_case_types, non_upper_case_globals, dead_code)]

use std::os::raw::{c_char, c_int, c_long, c_uint, c_ulong, c_void};

pub type aom_codec_err_t = c_int;
pub type aom_codec_flags_t = c_long;
pub type aom_enc_frame_flags_t = c_long;
pub type aom_codec_frame_flags_t = u32;
pub type aom_codec_er_flags_t = u32;
pub type aom_codec_pts_t = i64;
pub type aom_codec_iter_t = *const c_void;
pub type aom_img_fmt_t = c_int;

pub const AOM_CODEC_OK: aom_codec_err_t = 0;
pub const AOM_CODEC_ERROR: aom_codec_err_t = 1;
pub const AOM_CODEC_MEM_ERROR: aom_codec_err_t = 2;
pub const AOM_CODEC_ABI_MISMATCH: aom_codec_err_t = 3;
pub const AOM_CODEC_INCAPABLE: aom_codec_err_t = 4;
pub const AOM_CODEC_UNSUP_BITSTREAM: aom_codec_err_t = 5;
pub const AOM_CODEC_UNSUP_FEATURE: aom_codec_err_t = 6;
pub const AOM_CODEC_CORRUPT_FRAME: aom_codec_err_t = 7;
pub const AOM_CODEC_INVALID_PARAM: aom_codec_err_t = 8;

/// `AOM_ENCODER_ABI_VERSION` values used across the libaom 3.x releases,
/// newest first. 3.6 reports 29, newer releases went up from there.
pub const AOM_ENCODER_ABI_VERSIONS: &[c_int] = &[34, 33, 32, 31, 30, 29, 28, 27, 26, 25];

pub const AOM_USAGE_GOOD_QUALITY: c_uint = 0;
pub const AOM_USAGE_REALTIME: c_uint = 1;
pub const AOM_USAGE_ALL_INTRA: c_uint = 2;

pub const AOM_VBR: c_int = 0;
pub const AOM_CBR: c_int = 1;
pub const AOM_CQ: c_int = 2;
pub const AOM_Q: c_int = 3;

pub const AOM_RC_ONE_PASS: c_int = 0;

pub const AOM_KF_FIXED: c_int = 0;
pub const AOM_KF_AUTO: c_int = 1;

pub const AOM_BITS_8: c_int = 8;

pub const AOM_IMG_FMT_PLANAR: aom_img_fmt_t = 0x100;
pub const AOM_IMG_FMT_I420: aom_img_fmt_t = AOM_IMG_FMT_PLANAR | 2;
pub const AOM_IMG_FMT_I422: aom_img_fmt_t = AOM_IMG_FMT_PLANAR | 5;
pub const AOM_IMG_FMT_I444: aom_img_fmt_t = AOM_IMG_FMT_PLANAR | 6;

pub const AOM_CODEC_CX_FRAME_PKT: c_int = 0;

pub const AOM_FRAME_IS_KEY: aom_codec_frame_flags_t = 0x1;
pub const AOM_FRAME_IS_DROPPABLE: aom_codec_frame_flags_t = 0x2;
pub const AOM_FRAME_IS_INTRAONLY: aom_codec_frame_flags_t = 0x10;
pub const AOM_FRAME_IS_SWITCH: aom_codec_frame_flags_t = 0x20;
pub const AOM_FRAME_IS_ERROR_RESILIENT: aom_codec_frame_flags_t = 0x40;

// enum aome_enc_control_id
pub const AOME_SET_CPUUSED: c_int = 13;
pub const AOME_SET_CQ_LEVEL: c_int = 25;
pub const AV1E_SET_ROW_MT: c_int = 32;
pub const AV1E_SET_TILE_COLUMNS: c_int = 33;
pub const AV1E_SET_TILE_ROWS: c_int = 34;
pub const AV1E_SET_COLOR_PRIMARIES: c_int = 45;
pub const AV1E_SET_TRANSFER_CHARACTERISTICS: c_int = 46;
pub const AV1E_SET_MATRIX_COEFFICIENTS: c_int = 47;
pub const AV1E_SET_CHROMA_SAMPLE_POSITION: c_int = 48;
pub const AV1E_SET_COLOR_RANGE: c_int = 52;

#[repr(C)]
pub struct aom_codec_iface_t {
    _private: [u8; 0],
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct aom_rational_t {
    pub num: c_int,
    pub den: c_int,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct aom_fixed_buf_t {
    pub buf: *mut c_void,
    pub sz: usize,
}

#[repr(C)]
pub struct aom_codec_ctx_t {
    pub name: *const c_char,
    pub iface: *mut aom_codec_iface_t,
    pub err: aom_codec_err_t,
    pub err_detail: *const c_char,
    pub init_flags: aom_codec_flags_t,
    pub config: *const c_void,
    pub priv_: *mut c_void,
}

pub const MAX_TILE_WIDTHS: usize = 64;
pub const MAX_TILE_HEIGHTS: usize = 64;
pub const FIXED_QP_OFFSET_COUNT: usize = 5;

/// `aom_codec_enc_cfg_t`.
///
/// The trailing `cfg_options_t` is never read or written by us, it is kept as
/// an oversized opaque block so the library can copy its defaults into it.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct aom_codec_enc_cfg_t {
    pub g_usage: c_uint,
    pub g_threads: c_uint,
    pub g_profile: c_uint,
    pub g_w: c_uint,
    pub g_h: c_uint,
    pub g_limit: c_uint,
    pub g_forced_max_frame_width: c_uint,
    pub g_forced_max_frame_height: c_uint,
    pub g_bit_depth: c_int,
    pub g_input_bit_depth: c_uint,
    pub g_timebase: aom_rational_t,
    pub g_error_resilient: aom_codec_er_flags_t,
    pub g_pass: c_int,
    pub g_lag_in_frames: c_uint,
    pub rc_dropframe_thresh: c_uint,
    pub rc_resize_mode: c_uint,
    pub rc_resize_denominator: c_uint,
    pub rc_resize_kf_denominator: c_uint,
    pub rc_superres_mode: c_uint,
    pub rc_superres_denominator: c_uint,
    pub rc_superres_kf_denominator: c_uint,
    pub rc_superres_qthresh: c_uint,
    pub rc_superres_kf_qthresh: c_uint,
    pub rc_end_usage: c_int,
    pub rc_twopass_stats_in: aom_fixed_buf_t,
    pub rc_firstpass_mb_stats_in: aom_fixed_buf_t,
    pub rc_target_bitrate: c_uint,
    pub rc_min_quantizer: c_uint,
    pub rc_max_quantizer: c_uint,
    pub rc_undershoot_pct: c_uint,
    pub rc_overshoot_pct: c_uint,
    pub rc_buf_sz: c_uint,
    pub rc_buf_initial_sz: c_uint,
    pub rc_buf_optimal_sz: c_uint,
    pub rc_2pass_vbr_bias_pct: c_uint,
    pub rc_2pass_vbr_minsection_pct: c_uint,
    pub rc_2pass_vbr_maxsection_pct: c_uint,
    pub fwd_kf_enabled: c_int,
    pub kf_mode: c_int,
    pub kf_min_dist: c_uint,
    pub kf_max_dist: c_uint,
    pub sframe_dist: c_uint,
    pub sframe_mode: c_uint,
    pub large_scale_tile: c_uint,
    pub monochrome: c_uint,
    pub full_still_picture_hdr: c_uint,
    pub save_as_annexb: c_uint,
    pub tile_width_count: c_int,
    pub tile_height_count: c_int,
    pub tile_widths: [c_int; MAX_TILE_WIDTHS],
    pub tile_heights: [c_int; MAX_TILE_HEIGHTS],
    pub use_fixed_qp_offsets: c_uint,
    pub fixed_qp_offsets: [c_int; FIXED_QP_OFFSET_COUNT],
    pub encoder_cfg: [c_uint; 256],
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct aom_image_t {
    pub fmt: aom_img_fmt_t,
    pub cp: c_int,
    pub tc: c_int,
    pub mc: c_int,
    pub monochrome: c_int,
    pub csp: c_int,
    pub range: c_int,
    pub w: c_uint,
    pub h: c_uint,
    pub bit_depth: c_uint,
    pub d_w: c_uint,
    pub d_h: c_uint,
    pub r_w: c_uint,
    pub r_h: c_uint,
    pub x_chroma_shift: c_uint,
    pub y_chroma_shift: c_uint,
    pub planes: [*mut u8; 3],
    pub stride: [c_int; 3],
    pub sz: usize,
    pub bps: c_int,
    pub temporal_id: c_int,
    pub spatial_id: c_int,
    pub user_priv: *mut c_void,
    pub img_data: *mut u8,
    pub img_data_owner: c_int,
    pub self_allocd: c_int,
    pub metadata: *mut c_void,
    pub fb_priv: *mut c_void,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct aom_codec_cx_pkt_frame {
    pub buf: *mut c_void,
    pub sz: usize,
    pub pts: aom_codec_pts_t,
    pub duration: c_ulong,
    pub flags: aom_codec_frame_flags_t,
    pub partition_id: c_int,
    pub vis_frame_size: usize,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union aom_codec_cx_pkt_data {
    pub frame: aom_codec_cx_pkt_frame,
    pub raw: aom_fixed_buf_t,
    pub pad: [c_char; 124],
}

#[repr(C)]
pub struct aom_codec_cx_pkt_t {
    pub kind: c_int,
    pub data: aom_codec_cx_pkt_data,
}

pub type aom_codec_av1_cx_fn = unsafe extern "C" fn() -> *mut aom_codec_iface_t;
pub type aom_codec_enc_config_default_fn = unsafe extern "C" fn(
    iface: *mut aom_codec_iface_t,
    cfg: *mut aom_codec_enc_cfg_t,
    usage: c_uint,
) -> aom_codec_err_t;
pub type aom_codec_enc_init_ver_fn = unsafe extern "C" fn(
    ctx: *mut aom_codec_ctx_t,
    iface: *mut aom_codec_iface_t,
    cfg: *const aom_codec_enc_cfg_t,
    flags: aom_codec_flags_t,
    ver: c_int,
) -> aom_codec_err_t;
pub type aom_codec_enc_config_set_fn =
    unsafe extern "C" fn(ctx: *mut aom_codec_ctx_t, cfg: *const aom_codec_enc_cfg_t) -> aom_codec_err_t;
pub type aom_codec_encode_fn = unsafe extern "C" fn(
    ctx: *mut aom_codec_ctx_t,
    img: *const aom_image_t,
    pts: aom_codec_pts_t,
    duration: c_ulong,
    flags: aom_enc_frame_flags_t,
) -> aom_codec_err_t;
pub type aom_codec_get_cx_data_fn = unsafe extern "C" fn(
    ctx: *mut aom_codec_ctx_t,
    iter: *mut aom_codec_iter_t,
) -> *const aom_codec_cx_pkt_t;
pub type aom_codec_get_global_headers_fn =
    unsafe extern "C" fn(ctx: *mut aom_codec_ctx_t) -> *mut aom_fixed_buf_t;
pub type aom_codec_destroy_fn = unsafe extern "C" fn(ctx: *mut aom_codec_ctx_t) -> aom_codec_err_t;
pub type aom_codec_control_fn =
    unsafe extern "C" fn(ctx: *mut aom_codec_ctx_t, ctrl_id: c_int, ...) -> aom_codec_err_t;
pub type aom_img_wrap_fn = unsafe extern "C" fn(
    img: *mut aom_image_t,
    fmt: aom_img_fmt_t,
    d_w: c_uint,
    d_h: c_uint,
    stride_align: c_uint,
    img_data: *mut u8,
) -> *mut aom_image_t;
pub type aom_codec_err_to_string_fn = unsafe extern "C" fn(err: aom_codec_err_t) -> *const c_char;
pub type aom_codec_error_fn = unsafe extern "C" fn(ctx: *const aom_codec_ctx_t) -> *const c_char;
pub type aom_codec_version_str_fn = unsafe extern "C" fn() -> *const c_char;
