//! Recognition Layer
//!
//! Turns a scan-region snapshot into zero-or-one candidate name. Two
//! interchangeable backends sit behind the `Recognizer` trait:
//! - local OCR against the known-name list (PaddleOCR via ONNX Runtime)
//! - a one-shot remote vision call that names the creature directly

pub mod models;
pub mod ocr;
pub mod preprocess;
pub mod remote;

use crate::capture::Snapshot;

pub use models::ModelManager;
pub use ocr::LocalOcr;
pub use remote::RemoteVision;

/// Recognition backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognizerBackend {
    /// On-device text recognition matched against the catalog name list
    #[default]
    LocalOcr,
    /// Remote image-understanding service, one call per capture press
    RemoteVision,
}

impl RecognizerBackend {
    /// Display name for the settings UI
    pub fn label(&self) -> &'static str {
        match self {
            RecognizerBackend::LocalOcr => "On-device OCR",
            RecognizerBackend::RemoteVision => "Vision AI",
        }
    }

    /// Whether this backend is driven by the poll timer rather than an
    /// explicit capture press
    pub fn is_polling(&self) -> bool {
        matches!(self, RecognizerBackend::LocalOcr)
    }
}

/// Errors from recognizer construction and per-cycle recognition
#[derive(Debug, thiserror::Error)]
pub enum RecognizeError {
    /// Backend could not be constructed; terminal for the session
    #[error("recognizer setup failed: {0}")]
    Setup(String),
    /// A single local recognition cycle failed; the session retries
    #[error("recognition failed: {0}")]
    Inference(String),
    /// The remote vision call failed; surfaced as a transient notice
    #[error("vision service error: {0}")]
    Service(String),
}

impl RecognizeError {
    /// Setup failures end the session; everything else is absorbed by the
    /// retry loop
    pub fn is_fatal(&self) -> bool {
        matches!(self, RecognizeError::Setup(_))
    }
}

/// A recognition strategy. `Ok(None)` means "nothing recognized" and is
/// distinct from an error.
pub trait Recognizer: Send {
    fn recognize(&mut self, snapshot: &Snapshot) -> Result<Option<String>, RecognizeError>;

    fn backend(&self) -> RecognizerBackend;
}

impl<T: Recognizer + ?Sized> Recognizer for Box<T> {
    fn recognize(&mut self, snapshot: &Snapshot) -> Result<Option<String>, RecognizeError> {
        (**self).recognize(snapshot)
    }

    fn backend(&self) -> RecognizerBackend {
        (**self).backend()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_polling_mode() {
        assert!(RecognizerBackend::LocalOcr.is_polling());
        assert!(!RecognizerBackend::RemoteVision.is_polling());
    }

    #[test]
    fn test_only_setup_errors_are_fatal() {
        assert!(RecognizeError::Setup("x".into()).is_fatal());
        assert!(!RecognizeError::Inference("x".into()).is_fatal());
        assert!(!RecognizeError::Service("x".into()).is_fatal());
    }
}
