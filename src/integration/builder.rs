//! Builder for creating a MotionPipeline from individual parameters.

use crate::error::Result;
use crate::features::SurfaceFilter;

use super::{LabelSource, MotionPipeline, PipelineConfig};

/// Builder for creating a [`MotionPipeline`] one parameter group at a time.
///
/// Unless set explicitly, the surface ratio required to recover a lost track
/// follows the one of the kNN matcher.
#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    config: PipelineConfig,
    min_extrapol_ratio_s: Option<f32>,
}

impl PipelineBuilder {
    /// Create a new builder with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn from_config(config: PipelineConfig) -> Self {
        Self {
            min_extrapol_ratio_s: Some(config.tracker.min_extrapol_ratio_s),
            config,
        }
    }

    /// Set the accepted surface range (both bounds inclusive).
    pub fn surface(mut self, min: u32, max: u32) -> Self {
        self.config.surface = SurfaceFilter::new(min, max);
        self
    }

    /// Set the kNN matcher parameters.
    pub fn knn(mut self, k: u32, max_dist: u32, min_ratio_s: f32) -> Self {
        self.config.matcher.k = k;
        self.config.matcher.max_dist = max_dist;
        self.config.matcher.min_ratio_s = min_ratio_s;
        self
    }

    /// Set the search radius and the number of frames a lost track is extrapolated.
    pub fn extrapolation(mut self, r_extrapol: u32, extrapol_order_max: u32) -> Self {
        self.config.tracker.r_extrapol = r_extrapol;
        self.config.tracker.extrapol_order_max = extrapol_order_max;
        self
    }

    pub fn min_extrapol_ratio_s(mut self, ratio: f32) -> Self {
        self.min_extrapol_ratio_s = Some(ratio);
        self
    }

    /// Set the number of consecutive detections needed to create a track.
    pub fn min_track_frames(mut self, frames: u32) -> Self {
        self.config.tracker.min_track_frames = frames;
        self
    }

    pub fn record_region_ids(mut self, record: bool) -> Self {
        self.config.tracker.record_region_ids = record;
        self
    }

    pub fn max_regions(mut self, max_regions: usize) -> Self {
        self.config.max_regions = max_regions;
        self
    }

    pub fn track_conflicts(mut self, track: bool) -> Self {
        self.config.track_conflicts = track;
        self
    }

    pub fn keep_filtered_labels(mut self, keep: bool) -> Self {
        self.config.keep_filtered_labels = keep;
        self
    }

    /// Build the final [`PipelineConfig`].
    pub fn config(&self) -> PipelineConfig {
        let mut config = self.config;
        config.tracker.min_extrapol_ratio_s = self
            .min_extrapol_ratio_s
            .unwrap_or(config.matcher.min_ratio_s);
        config
    }

    /// Build a pipeline for frames of `shape` (rows, columns).
    pub fn build<S: LabelSource>(self, source: S, shape: (usize, usize)) -> Result<MotionPipeline<S>> {
        MotionPipeline::new(source, self.config(), shape)
    }
}
