use std::{collections::TryReserveError, fmt};

use crate::format::VideoFormat;

/// A failure reported by the encoder backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError {
    /// Backend status code, absent when the failure did not come from a call
    /// into the backend (e.g. an unsupported control).
    pub code: Option<i32>,
    pub message: String,
    pub detail: Option<String>,
}

impl BackendError {
    pub fn new(code: Option<i32>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code {code})", self.message)?,
            None => write!(f, "{}", self.message)?,
        }
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }
        Ok(())
    }
}

impl std::error::Error for BackendError {}

impl From<aom_dispatch::Error> for BackendError {
    fn from(e: aom_dispatch::Error) -> Self {
        match e {
            aom_dispatch::Error::Codec {
                code,
                message,
                detail,
            } => Self {
                code: Some(code),
                message,
                detail,
            },
            other => Self::new(None, other.to_string()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Encoder backend is unavailable: {0}")]
    BackendUnavailable(#[source] aom_dispatch::Error),
    #[error("Color format {0:?} cannot be encoded")]
    UnsupportedColorFormat(VideoFormat),
    #[error("Failed to initialize the encoder: {0}")]
    InitializationFailure(#[source] BackendError),
    #[error("Failed to apply the new configuration: {0}")]
    ReconfigurationFailure(#[source] BackendError),
    #[error("Failed to encode frame: {0}")]
    EncodeFailure(#[source] BackendError),
    #[error("Failed to allocate a frame buffer of {size} bytes")]
    AllocationFailure {
        size: usize,
        #[source]
        source: TryReserveError,
    },
    #[error("Frame does not match the session: {0}")]
    InvalidFrame(String),
    #[error("Invalid settings: {0}")]
    Settings(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_errors_keep_code_and_detail() {
        let err: BackendError = aom_dispatch::Error::Codec {
            code: 8,
            message: "Invalid parameter".to_string(),
            detail: Some("g_w out of range".to_string()),
        }
        .into();
        assert_eq!(err.code, Some(8));
        assert_eq!(err.to_string(), "Invalid parameter (code 8): g_w out of range");
    }

    #[test]
    fn other_dispatch_errors_have_no_code() {
        let err: BackendError =
            aom_dispatch::Error::UnsupportedControl(aom_dispatch::Control::RowMultiThreading).into();
        assert_eq!(err.code, None);
        assert!(err.message.contains("RowMultiThreading"));
    }

    #[test]
    fn session_errors_wrap_backend_errors() {
        let err = Error::ReconfigurationFailure(BackendError::new(Some(8), "Invalid parameter"));
        assert_eq!(
            err.to_string(),
            "Failed to apply the new configuration: Invalid parameter (code 8)"
        );
    }
}
