//! Reframe Segment Analysis
//!
//! Produces one [`ActionEstimate`](reframe_model::ActionEstimate) per segment:
//!
//! ```text
//! Segment ──> FrameSampler ──> image(s) ──> VisionService ──> validated estimate
//!                                                 │
//!                     error / malformed ──────────┴──> degraded estimate
//! ```
//!
//! Analysis failures never fail the job; only cancellation escapes
//! [`SegmentAnalyzer::analyze_all`].

pub mod analyzer;
pub mod client;
pub mod error;
pub mod sampler;
pub mod types;

pub use analyzer::{AnalysisOutcome, AnalyzerConfig, DegradedEstimate, SegmentAnalyzer};
pub use client::{HttpVisionClient, VisionClientConfig, VisionService};
pub use error::{AnalysisError, AnalysisResult};
pub use sampler::{FfmpegFrameSampler, FrameSampler};
pub use types::{AnalysisHint, AnalyzeRequest, AnalyzeResponse, HealthResponse};
