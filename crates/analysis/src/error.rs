//! Analysis error types.

use reframe_common::ReframeError;
use thiserror::Error;

pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Vision service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Frame extraction failed: {0}")]
    FrameExtraction(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Analysis cancelled")]
    Cancelled,
}

impl AnalysisError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AnalysisError::ServiceUnavailable(_)
                | AnalysisError::Timeout(_)
                | AnalysisError::Network(_)
        )
    }
}

impl From<AnalysisError> for ReframeError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::Cancelled => ReframeError::Cancelled,
            AnalysisError::Io(e) => ReframeError::Io(e),
            other => ReframeError::analysis(other.to_string()),
        }
    }
}
