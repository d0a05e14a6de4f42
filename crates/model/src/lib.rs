//! Reframe Data Model
//!
//! Defines the data contracts passed between reframing stages:
//! - **VideoInfo:** Source dimensions, duration and frame rate
//! - **Segment / ActionEstimate:** Per-window subject-position estimates
//! - **CropPathPoint:** Dense per-frame trajectory
//! - **CropRect / CropFilterSpec:** Compiled, renderer-agnostic crop instructions
//!
//! Subject positions are normalized to `[0.0, 1.0]` relative to the frame
//! (0 = left/top edge, 1 = right/bottom edge). Crop offsets are pixels.
//!
//! Every value here is created fresh per job and never mutated after the
//! stage that produced it hands it on.

pub mod aspect;
pub mod crop;
pub mod estimate;
pub mod path;
pub mod segment;
pub mod video;

pub use aspect::*;
pub use crop::*;
pub use estimate::*;
pub use path::*;
pub use segment::*;
pub use video::*;
