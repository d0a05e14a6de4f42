//! Reframe Pipeline
//!
//! The caller-facing `reframe` operation:
//!
//! ```text
//! probe ─> segment ─> analyze ─> synthesize ─> smooth ─> compile ─> render
//!  0-5%                5-60%        60-65% ─────────────────────┘   65-100%
//! ```
//!
//! Input errors and cancellation are returned as `Err`. A render failure is
//! reported in the response (`success: false`) together with the analysis
//! trail.

pub mod job;
pub mod pipeline;
pub mod progress;
pub mod report;

pub use job::{parse_aspect, ProcessingStats, ReframeRequest, ReframeResponse};
pub use pipeline::{ReframePipeline, ReframePlan, RendererFactory};
pub use progress::{ProgressFn, ProgressTracker};
pub use report::AnalysisReport;
