//! Error types shared across Reframe crates.
//!
//! Only input validation, render failures and cancellation ever reach the
//! caller. Per-segment analysis failures are absorbed inside the analyzer.

use std::path::PathBuf;

/// Top-level error type for Reframe operations.
#[derive(Debug, thiserror::Error)]
pub enum ReframeError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Probe error: {message}")]
    Probe { message: String },

    #[error("Unsupported target aspect ratio: {ratio}")]
    UnsupportedAspect { ratio: String },

    #[error("Analysis error: {message}")]
    Analysis { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Reframing job was cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ReframeError.
pub type ReframeResult<T> = Result<T, ReframeError>;

impl ReframeError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe {
            message: msg.into(),
        }
    }

    pub fn analysis(msg: impl Into<String>) -> Self {
        Self::Analysis {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether this error came from validating the job's inputs.
    ///
    /// Input errors are raised before any analysis or rendering work starts.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. }
                | Self::FileNotFound { .. }
                | Self::Probe { .. }
                | Self::UnsupportedAspect { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors_are_classified() {
        assert!(ReframeError::invalid_input("duration must be positive").is_input_error());
        assert!(ReframeError::probe("no video stream").is_input_error());
        assert!(ReframeError::UnsupportedAspect {
            ratio: "5:4".to_string()
        }
        .is_input_error());
        assert!(!ReframeError::render("ffmpeg exited with 1").is_input_error());
        assert!(!ReframeError::Cancelled.is_input_error());
    }

    #[test]
    fn test_display_includes_message() {
        let err = ReframeError::render("encoder missing");
        assert_eq!(err.to_string(), "Render error: encoder missing");
    }
}
