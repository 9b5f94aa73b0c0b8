//! Temporal tracking of moving objects from connected-component labels.
//!
//! The crate turns a label image into per-region features, filters them by
//! surface, associates the regions of two consecutive frames with a rank-based
//! k-nearest-neighbour matcher and maintains tracks across frames, bridging short
//! detection gaps by constant-velocity extrapolation.
//!
//! ```ignore
//! use motion_track::{PipelineBuilder, LabelSource};
//!
//! let mut pipeline = PipelineBuilder::new()
//!     .surface(50, 100_000)
//!     .knn(3, 10, 0.125)
//!     .extrapolation(5, 3)
//!     .build(my_labeler, (height, width))?;
//!
//! for (frame, mask) in masks.enumerate() {
//!     let summary = pipeline.process_frame(frame as u32, mask.view())?;
//!     println!("{summary:?}");
//! }
//! ```

pub mod error;
pub mod features;
pub mod integration;
pub mod tracker;

pub use error::{Error, Result};
pub use features::{LabelImage, Region, Relabel, SurfaceFilter, TrackedRegion};
pub use integration::{
    FrameSummary, LabelSource, MotionPipeline, PipelineBuilder, PipelineConfig, PipelineError,
};
pub use tracker::{Matcher, MatcherConfig, Track, TrackState, Tracker, TrackerConfig};
