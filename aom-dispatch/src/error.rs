use crate::{ffi, Control};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to load library: {0}")]
    LoadLibrary(#[from] libloading::Error),
    #[error("No usable libaom found (tried {tried})")]
    NotFound { tried: String },
    #[error("Symbol `{name}` is missing from the library: {source}")]
    MissingSymbol {
        name: &'static str,
        source: libloading::Error,
    },
    #[error("The library does not provide an AV1 encoder interface")]
    NoEncoderInterface,
    #[error("libaom error {code}: {message}")]
    Codec {
        code: ffi::aom_codec_err_t,
        message: String,
        detail: Option<String>,
    },
    #[error("Control {0:?} is not supported by this libaom build")]
    UnsupportedControl(Control),
    #[error("Image buffer of {actual} bytes is too small, {required} bytes required")]
    ImageWrap { required: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Maps a libaom status code to a result, without any context for the message.
///
/// The message is filled in by the callers that have access to the library's
/// error string functions.
pub fn check_error(code: ffi::aom_codec_err_t) -> Result<()> {
    match code {
        ffi::AOM_CODEC_OK => Ok(()),
        code => Err(Error::Codec {
            code,
            message: default_message(code).to_string(),
            detail: None,
        }),
    }
}

/// Fallback descriptions for libaom's status codes, used when the
/// `aom_codec_err_to_string` entry point is not available.
pub(crate) fn default_message(code: ffi::aom_codec_err_t) -> &'static str {
    match code {
        ffi::AOM_CODEC_OK => "Success",
        ffi::AOM_CODEC_ERROR => "Unspecified internal error",
        ffi::AOM_CODEC_MEM_ERROR => "Memory allocation error",
        ffi::AOM_CODEC_ABI_MISMATCH => "ABI version mismatch",
        ffi::AOM_CODEC_INCAPABLE => "Codec does not implement requested capability",
        ffi::AOM_CODEC_UNSUP_BITSTREAM => "Bitstream not supported by this decoder",
        ffi::AOM_CODEC_UNSUP_FEATURE => "Bitstream required feature not supported",
        ffi::AOM_CODEC_CORRUPT_FRAME => "Corrupt frame detected",
        ffi::AOM_CODEC_INVALID_PARAM => "Invalid parameter",
        _ => "Unknown error",
    }
}

impl Error {
    /// The libaom status code, if this error came from the codec.
    pub fn code(&self) -> Option<ffi::aom_codec_err_t> {
        match self {
            Error::Codec { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Extra detail reported by the codec context, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Error::Codec { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_is_not_an_error() {
        assert!(check_error(ffi::AOM_CODEC_OK).is_ok());
    }

    #[test]
    fn codes_keep_their_value() {
        let err = check_error(ffi::AOM_CODEC_INVALID_PARAM).unwrap_err();
        assert_eq!(err.code(), Some(ffi::AOM_CODEC_INVALID_PARAM));
        assert_eq!(err.to_string(), "libaom error 8: Invalid parameter");
        assert_eq!(err.detail(), None);
    }

    #[test]
    fn unknown_codes_are_reported() {
        let err = check_error(42).unwrap_err();
        assert_eq!(err.code(), Some(42));
        assert!(err.to_string().contains("Unknown error"));
    }
}
