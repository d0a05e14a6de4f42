//! Reframe Render Engine
//!
//! Probes source videos and executes compiled crop specs.
//!
//! # Pipeline Architecture
//!
//! ```text
//! source.mp4 ──> ffprobe ──> VideoInfo
//!      │
//!      │         CropFilterSpec ──> crop=w:h:x(t):y,scale
//!      │                                  │
//!      └──────────────────────────────────┤
//!                                         ▼
//!                                  ffmpeg (H.264)
//!                                         │
//!                                         ▼
//!                              .reframe-XXXX.mp4 (temp)
//!                                         │ rename on success
//!                                         ▼
//!                                    output.mp4
//! ```

pub mod export;
pub mod expr;
pub mod probe;

pub use export::*;
pub use expr::{build_crop_filter, build_piecewise_expr, even_output_size};
pub use probe::{FfprobeProbe, VideoProbe};
