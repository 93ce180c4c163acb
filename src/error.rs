//! Error types for the serp-sieve crate.
//!
//! Each variant carries a stable code accessible via [`SieveError::code()`].
//! No API keys or page content appear in error messages.

/// Stable error codes for programmatic error handling.
pub mod error_codes {
    /// Missing or invalid configuration (including absent credentials).
    pub const CONFIG_INVALID: &str = "CONFIG_INVALID";

    /// The backend replied but the payload failed shape or range checks.
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";

    /// Network or provider failure for a single attempt.
    pub const TRANSPORT_FAILED: &str = "TRANSPORT_FAILED";

    /// Retry budget exhausted.
    pub const BACKEND_EXHAUSTED: &str = "BACKEND_EXHAUSTED";

    /// HTML or selector parsing failed.
    pub const PARSE_FAILED: &str = "PARSE_FAILED";
}

/// Errors produced while classifying, ranking, or extracting page content.
///
/// `Clone` so that every caller joined onto one in-flight classification
/// receives the same failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SieveError {
    /// Missing credentials or an invalid setting. Never retried.
    #[error("config error: {0}")]
    Config(String),

    /// The backend responded with a payload of the wrong shape or range.
    #[error("validation error: {0}")]
    Validation(String),

    /// A single backend call failed at the network or provider level.
    #[error("transport error: {0}")]
    Transport(String),

    /// Every attempt failed; carries the last attempt's error.
    #[error("backend error after {attempts} attempts: {last_error}")]
    Backend {
        /// Number of attempts made.
        attempts: u32,
        /// Display form of the final attempt's error.
        last_error: String,
    },

    /// HTML could not be parsed or a selector was invalid.
    #[error("parse error: {0}")]
    Parse(String),
}

impl SieveError {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => error_codes::CONFIG_INVALID,
            Self::Validation(_) => error_codes::VALIDATION_FAILED,
            Self::Transport(_) => error_codes::TRANSPORT_FAILED,
            Self::Backend { .. } => error_codes::BACKEND_EXHAUSTED,
            Self::Parse(_) => error_codes::PARSE_FAILED,
        }
    }

    /// Returns true if another attempt may succeed.
    ///
    /// Validation and transport failures share one retry budget.
    /// Configuration problems and an exhausted budget are terminal.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) | Self::Transport(_) => true,
            Self::Config(_) | Self::Backend { .. } | Self::Parse(_) => false,
        }
    }
}

/// Convenience type alias for serp-sieve results.
pub type Result<T> = std::result::Result<T, SieveError>;
