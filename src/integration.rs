//! Integration module for connecting labeling backends with the tracking core.
//!
//! This module provides the labeling backend trait and a pipeline that runs the
//! full per-frame chain: labeling, feature extraction, surface filtering, kNN
//! association and tracking.

mod builder;
mod pipeline;
mod source;

pub use builder::PipelineBuilder;
pub use pipeline::{FrameSummary, MotionPipeline, PipelineConfig, PipelineError};
pub use source::LabelSource;
