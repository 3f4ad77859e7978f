use std::{
    ffi::CStr,
    os::raw::{c_char, c_int},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicI32, Ordering},
        Arc,
    },
};

use tracing::{debug, info, warn};

use crate::{error::default_message, ffi, Control, Controls, Error, Result};

/// Environment variable that names an explicit library to load.
pub const LIBRARY_PATH_ENV: &str = "AOM_LIBRARY_PATH";

#[cfg(windows)]
const CANDIDATES: &[&str] = &["aom.dll", "libaom.dll"];
#[cfg(target_os = "macos")]
const CANDIDATES: &[&str] = &["libaom.3.dylib", "libaom.dylib"];
#[cfg(all(unix, not(target_os = "macos")))]
const CANDIDATES: &[&str] = &["libaom.so.3", "libaom.so"];

/// Options for locating and binding the library.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Tried before the platform's well-known names.
    pub path: Option<PathBuf>,
    /// Passed to `aom_codec_enc_init_ver`, must match the loaded build.
    /// `None` tries [`ffi::AOM_ENCODER_ABI_VERSIONS`] until one is accepted.
    pub abi_version: Option<c_int>,
    /// Controls to treat as absent even if the library exposes them.
    pub disabled_controls: Controls,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            path: None,
            abi_version: None,
            disabled_controls: Controls::empty(),
        }
    }
}

/// Entry points resolved from the library.
///
/// The mandatory ones are plain function pointers, a library without them is
/// rejected at load time. The optional ones are only used after checking.
pub(crate) struct FunctionTable {
    pub av1_cx: ffi::aom_codec_av1_cx_fn,
    pub enc_config_default: ffi::aom_codec_enc_config_default_fn,
    pub enc_init_ver: ffi::aom_codec_enc_init_ver_fn,
    pub enc_config_set: ffi::aom_codec_enc_config_set_fn,
    pub encode: ffi::aom_codec_encode_fn,
    pub get_cx_data: ffi::aom_codec_get_cx_data_fn,
    pub destroy: ffi::aom_codec_destroy_fn,
    pub img_wrap: ffi::aom_img_wrap_fn,
    pub get_global_headers: ffi::aom_codec_get_global_headers_fn,

    pub control: Option<ffi::aom_codec_control_fn>,
    pub err_to_string: Option<ffi::aom_codec_err_to_string_fn>,
    pub error: Option<ffi::aom_codec_error_fn>,
    pub error_detail: Option<ffi::aom_codec_error_fn>,
}

pub(crate) struct LibraryInner {
    _lib: libloading::Library,
    pub(crate) fns: FunctionTable,
    pub(crate) iface: *mut ffi::aom_codec_iface_t,
    pinned_abi: Option<c_int>,
    /// Last ABI version the library accepted, 0 before the first encoder.
    accepted_abi: AtomicI32,
    controls: Controls,
    version: Option<String>,
    path: PathBuf,
}

// The function pointers and the interface pointer are immutable after load
// and stay valid for as long as `_lib` is alive.
unsafe impl Send for LibraryInner {}
unsafe impl Sync for LibraryInner {}

/// A handle to the loaded library.
///
/// Cloning is cheap, every clone shares the same loaded library. The library
/// is unloaded once the last clone (and every encoder created from it) is gone.
#[derive(Clone)]
pub struct Library(pub(crate) Arc<LibraryInner>);

impl Library {
    /// Loads the library with default options.
    pub fn new() -> Result<Self> {
        Self::load(&LoadOptions::default())
    }

    /// Search order: `AOM_LIBRARY_PATH`, `options.path`, then well-known names.
    ///
    /// A candidate that cannot be opened is skipped. A candidate that opens but
    /// lacks a mandatory entry point stops the search with an error.
    pub fn load(options: &LoadOptions) -> Result<Self> {
        let mut candidates: Vec<PathBuf> = vec![];
        if let Ok(path) = std::env::var(LIBRARY_PATH_ENV) {
            candidates.push(path.into());
        }
        if let Some(path) = &options.path {
            candidates.push(path.clone());
        }
        candidates.extend(CANDIDATES.iter().map(PathBuf::from));

        for candidate in &candidates {
            match Self::open(candidate, options) {
                Ok(library) => return Ok(library),
                Err(Error::LoadLibrary(e)) => {
                    warn!("Loading of '{}' failed: {e}", candidate.display());
                }
                Err(e) => return Err(e),
            }
        }

        let tried = candidates
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Err(Error::NotFound { tried })
    }

    /// Opens one specific file and resolves its entry points.
    pub fn open(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Self> {
        let path = path.as_ref();
        let lib = unsafe { libloading::Library::new(path)? };

        let fns = unsafe {
            FunctionTable {
                av1_cx: required(&lib, "aom_codec_av1_cx")?,
                enc_config_default: required(&lib, "aom_codec_enc_config_default")?,
                enc_init_ver: required(&lib, "aom_codec_enc_init_ver")?,
                enc_config_set: required(&lib, "aom_codec_enc_config_set")?,
                encode: required(&lib, "aom_codec_encode")?,
                get_cx_data: required(&lib, "aom_codec_get_cx_data")?,
                destroy: required(&lib, "aom_codec_destroy")?,
                img_wrap: required(&lib, "aom_img_wrap")?,
                get_global_headers: required(&lib, "aom_codec_get_global_headers")?,

                control: optional(&lib, "aom_codec_control"),
                err_to_string: optional(&lib, "aom_codec_err_to_string"),
                error: optional(&lib, "aom_codec_error"),
                error_detail: optional(&lib, "aom_codec_error_detail"),
            }
        };

        let iface = unsafe { (fns.av1_cx)() };
        if iface.is_null() {
            return Err(Error::NoEncoderInterface);
        }

        let version = unsafe {
            optional::<ffi::aom_codec_version_str_fn>(&lib, "aom_codec_version_str")
                .and_then(|f| c_string(f()))
        };

        let controls = if fns.control.is_some() {
            Controls::all() - options.disabled_controls
        } else {
            debug!("aom_codec_control is not exported, tuning is disabled");
            Controls::empty()
        };

        info!(
            "Loaded libaom {} from {}",
            version.as_deref().unwrap_or("(unknown version)"),
            path.display()
        );

        Ok(Self(Arc::new(LibraryInner {
            _lib: lib,
            fns,
            iface,
            pinned_abi: options.abi_version,
            accepted_abi: AtomicI32::new(0),
            controls,
            version,
            path: path.to_path_buf(),
        })))
    }

    pub fn version(&self) -> Option<&str> {
        self.0.version.as_deref()
    }

    pub fn path(&self) -> &Path {
        &self.0.path
    }

    /// Controls this library accepts.
    pub fn controls(&self) -> Controls {
        self.0.controls
    }

    pub fn supports(&self, control: Control) -> bool {
        self.0.controls.supports(control)
    }

    /// The encoder ABI version in use, once an encoder was created.
    pub fn abi_version(&self) -> Option<c_int> {
        match self.0.pinned_abi {
            Some(version) => Some(version),
            None => match self.0.accepted_abi.load(Ordering::Relaxed) {
                0 => None,
                version => Some(version),
            },
        }
    }

    /// ABI versions to hand to `aom_codec_enc_init_ver`, in order.
    pub(crate) fn abi_candidates(&self) -> Vec<c_int> {
        abi_candidates(
            self.0.pinned_abi,
            self.0.accepted_abi.load(Ordering::Relaxed),
        )
    }

    pub(crate) fn accept_abi(&self, version: c_int) {
        if self.0.accepted_abi.swap(version, Ordering::Relaxed) != version {
            debug!("libaom accepted encoder ABI version {version}");
        }
    }

    /// Asks the library for its default configuration for a usage class.
    pub fn default_config(&self, usage: u32) -> Result<Box<ffi::aom_codec_enc_cfg_t>> {
        let mut cfg: Box<ffi::aom_codec_enc_cfg_t> = Box::new(unsafe { std::mem::zeroed() });
        let code = unsafe { (self.0.fns.enc_config_default)(self.0.iface, cfg.as_mut(), usage) };
        self.check(code, None)?;
        Ok(cfg)
    }

    /// Human readable description of a status code.
    pub fn error_string(&self, code: ffi::aom_codec_err_t) -> String {
        self.0
            .fns
            .err_to_string
            .and_then(|f| unsafe { c_string(f(code)) })
            .unwrap_or_else(|| default_message(code).to_string())
    }

    /// Turns a status code into a result, attaching whatever the library can
    /// tell about the failure.
    pub(crate) fn check(
        &self,
        code: ffi::aom_codec_err_t,
        ctx: Option<*const ffi::aom_codec_ctx_t>,
    ) -> Result<()> {
        if code == ffi::AOM_CODEC_OK {
            return Ok(());
        }

        let detail = ctx.and_then(|ctx| {
            let error = self.0.fns.error.and_then(|f| unsafe { c_string(f(ctx)) });
            let detail = self
                .0
                .fns
                .error_detail
                .and_then(|f| unsafe { c_string(f(ctx)) });
            match (error, detail) {
                (Some(e), Some(d)) => Some(format!("{e}: {d}")),
                (e, d) => e.or(d),
            }
        });

        Err(Error::Codec {
            code,
            message: self.error_string(code),
            detail,
        })
    }
}

fn abi_candidates(pinned: Option<c_int>, accepted: c_int) -> Vec<c_int> {
    if let Some(version) = pinned {
        return vec![version];
    }
    let mut versions = Vec::with_capacity(ffi::AOM_ENCODER_ABI_VERSIONS.len() + 1);
    if accepted != 0 {
        versions.push(accepted);
    }
    versions.extend(
        ffi::AOM_ENCODER_ABI_VERSIONS
            .iter()
            .copied()
            .filter(|&v| v != accepted),
    );
    versions
}

unsafe fn required<T: Copy>(lib: &libloading::Library, name: &'static str) -> Result<T> {
    let symbol: libloading::Symbol<'_, T> = unsafe { lib.get(name.as_bytes()) }
        .map_err(|source| Error::MissingSymbol { name, source })?;
    Ok(*symbol)
}

unsafe fn optional<T: Copy>(lib: &libloading::Library, name: &'static str) -> Option<T> {
    match unsafe { lib.get::<T>(name.as_bytes()) } {
        Ok(symbol) => Some(*symbol),
        Err(e) => {
            debug!("Optional symbol `{name}` is not available: {e}");
            None
        }
    }
}

unsafe fn c_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
    }
}
