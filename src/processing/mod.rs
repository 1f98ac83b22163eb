//! Denoising stages and the per-cell pipeline that chains them
//!
//! Each grid cell corrupts a copy of the original, restores it with a
//! median filter and scores the result against the untouched original.

pub mod pipeline;
pub mod steps;

pub use pipeline::{Cell, CellOutcome, CellPipeline, StepTiming};
