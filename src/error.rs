//! Error types for the edgequake-photovibe library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`PhotoVibeError`] (fatal): the run cannot start at all (no photos
//!   selected, API key missing, selection over the cap). Returned as
//!   `Err(PhotoVibeError)` from the top-level `analyze*` functions.
//!
//! * [`ItemError`] (non-fatal): a single photo failed (unreadable file,
//!   rejected request, malformed model output) but every other photo is
//!   fine. Stored inside [`crate::output::ResultItem`] so callers can render
//!   partial success instead of losing the whole batch to one bad photo.
//!
//! * [`CallError`]: the outcome of one retried HTTP exchange. It never
//!   leaves the inference stage; it is folded into an [`ItemError`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-photovibe library.
///
/// Photo-level failures use [`ItemError`] and are stored in
/// [`crate::output::ResultItem`] rather than propagated here.
#[derive(Debug, Error)]
pub enum PhotoVibeError {
    // ── Selection errors ──────────────────────────────────────────────────
    /// The run was started with an empty selection.
    #[error("No photos selected.\nAdd at least one image file before analysing.")]
    NoFiles,

    /// Adding the photos would push the selection over the cap.
    #[error(
        "You can select at most {cap} photos ({current} already selected, tried to add {attempted})."
    )]
    SelectionLimitExceeded {
        current: usize,
        attempted: usize,
        cap: usize,
    },

    /// An input path does not exist.
    #[error("Photo not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    // ── Credential errors ─────────────────────────────────────────────────
    /// No API key was configured or found in the environment.
    #[error("Gemini API key is missing.\n{hint}")]
    ApiKeyMissing { hint: String },

    // ── Outcome errors ────────────────────────────────────────────────────
    /// Some photos succeeded but at least one failed.
    ///
    /// Returned by [`crate::output::AnalysisOutput::into_result`] when the
    /// caller wants to treat any photo failure as an error.
    #[error("{failed}/{total} photos failed during analysis")]
    PartialFailure {
        success: usize,
        failed: usize,
        total: usize,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single photo.
///
/// The run continues for every other photo in the batch.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum ItemError {
    /// Reading or encoding the photo failed before any request was sent.
    #[error("{file}: could not prepare photo: {detail}")]
    PreprocessFailed { file: String, detail: String },

    /// The endpoint rejected the request, or retries were exhausted.
    #[error("{file}: analysis failed after {attempts} attempt(s): {detail}")]
    InferenceFailed {
        file: String,
        attempts: u32,
        detail: String,
    },

    /// The endpoint answered but the content is not a usable analysis.
    #[error("{file}: model returned an unusable response: {detail}")]
    MalformedResponse { file: String, detail: String },
}

impl ItemError {
    /// The human-readable cause, without the file-name prefix.
    pub fn detail(&self) -> &str {
        match self {
            ItemError::PreprocessFailed { detail, .. }
            | ItemError::InferenceFailed { detail, .. }
            | ItemError::MalformedResponse { detail, .. } => detail,
        }
    }
}

/// Outcome of one HTTP exchange with the generative endpoint.
///
/// `RateLimited` and `Transport` are retryable; `Http` is not.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// HTTP 429 from the endpoint.
    #[error("rate limit exceeded (HTTP 429): {message}")]
    RateLimited { message: String },

    /// The request never produced an HTTP response (DNS, TLS, timeout, reset).
    #[error("network error: {0}")]
    Transport(String),

    /// Any other non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
}

impl CallError {
    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CallError::RateLimited { .. } | CallError::Transport(_)
        )
    }

    /// The underlying message without the status prefix.
    pub fn message(&self) -> &str {
        match self {
            CallError::RateLimited { message } | CallError::Http { message, .. } => message,
            CallError::Transport(message) => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_failure_display() {
        let e = PhotoVibeError::PartialFailure {
            success: 9,
            failed: 1,
            total: 10,
        };
        let msg = e.to_string();
        assert!(msg.contains("1/10"), "got: {msg}");
    }

    #[test]
    fn selection_limit_display() {
        let e = PhotoVibeError::SelectionLimitExceeded {
            current: 20,
            attempted: 8,
            cap: 25,
        };
        let msg = e.to_string();
        assert!(msg.contains("at most 25"), "got: {msg}");
        assert!(msg.contains("20 already selected"), "got: {msg}");
    }

    #[test]
    fn item_error_detail_strips_prefix() {
        let e = ItemError::InferenceFailed {
            file: "beach.jpg".into(),
            attempts: 3,
            detail: "quota".into(),
        };
        assert_eq!(e.detail(), "quota");
        assert!(e.to_string().starts_with("beach.jpg"));
        assert!(e.to_string().contains("3 attempt(s)"));
    }

    #[test]
    fn only_rate_limit_and_transport_are_retryable() {
        assert!(CallError::RateLimited {
            message: "slow down".into()
        }
        .is_retryable());
        assert!(CallError::Transport("reset".into()).is_retryable());
        assert!(!CallError::Http {
            status: 500,
            message: "boom".into()
        }
        .is_retryable());
    }

    #[test]
    fn http_display_includes_status() {
        let e = CallError::Http {
            status: 400,
            message: "API key not valid".into(),
        };
        assert_eq!(e.to_string(), "HTTP 400: API key not valid");
        assert_eq!(e.message(), "API key not valid");
    }
}
