//! Reframe Processing Core
//!
//! The pure stages of the reframing pipeline:
//! - **Segmenter:** Split the timeline into bounded analysis windows
//! - **Synthesizer:** Expand sparse per-segment estimates into a dense per-frame path
//! - **Smoother:** Remove jitter from the dense path
//! - **Compiler:** Turn the smoothed path into a static or key-pointed crop spec
//!
//! This crate is pure computation: no I/O, no async, no platform dependencies.
//! All inputs are data; all outputs are data.

pub mod compile;
pub mod segmenter;
pub mod smooth;
pub mod synthesize;

pub use compile::{CompilerConfig, CropFilterCompiler};
pub use segmenter::segment;
pub use smooth::PathSmoother;
pub use synthesize::synthesize;
