//! MotionPipeline for chaining labeling, feature extraction, matching and tracking.

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::error::{self, Error, check_capacity};
use crate::features::{
    LabelImage, Region, Relabel, SurfaceFilter, extract, filter_surface, shrink_into,
    zero_init_labels,
};
use crate::tracker::{Matcher, MatcherConfig, Tracker, TrackerConfig};

use super::LabelSource;

/// Per-run configuration of a [`MotionPipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Accepted region surfaces.
    pub surface: SurfaceFilter,
    pub matcher: MatcherConfig,
    pub tracker: TrackerConfig,
    /// Maximum number of regions per frame after surface filtering.
    pub max_regions: usize,
    /// Count association conflicts (diagnostics only).
    pub track_conflicts: bool,
    /// Maintain a label image holding only the surviving regions, densely relabeled.
    pub keep_filtered_labels: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            surface: SurfaceFilter::default(),
            matcher: MatcherConfig::default(),
            tracker: TrackerConfig::default(),
            max_regions: 8192,
            track_conflicts: false,
            keep_filtered_labels: false,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> error::Result<()> {
        if self.max_regions == 0 {
            return Err(Error::InvalidConfig("max_regions must be positive".into()));
        }
        self.surface.validate()?;
        self.matcher.validate()?;
        self.tracker.validate()
    }
}

/// Failure of a pipeline step.
#[derive(Debug, Error)]
pub enum PipelineError<E: std::error::Error + 'static> {
    /// The labeling backend failed.
    #[error("labeling failed")]
    Source(#[source] E),
    /// A precondition of the tracking core was violated.
    #[error(transparent)]
    Tracking(#[from] Error),
}

/// What happened during one [`MotionPipeline::process_frame`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameSummary {
    pub frame: u32,
    /// Number of labels produced by the source.
    pub n_labels: u32,
    /// Number of regions left after surface filtering.
    pub n_regions: usize,
    /// Number of associations with the previous frame.
    pub n_associations: usize,
    /// Number of tracks held by the tracker, finished ones included.
    pub n_tracks: usize,
}

/// A combined pipeline that bundles a labeling backend with the tracking core.
///
/// The label images, the per-frame region arrays, the matcher workspace and the
/// tracker history are allocated at construction for frames of a fixed shape and
/// reused from one frame to the next. Extraction returns a fresh array sized to the
/// label count of each frame.
pub struct MotionPipeline<S: LabelSource> {
    config: PipelineConfig,
    source: S,
    labels: LabelImage,
    filtered_labels: Option<LabelImage>,
    raw: Vec<Region>,
    prev: Vec<Region>,
    cur: Vec<Region>,
    matcher: Matcher,
    tracker: Tracker,
    last_frame: Option<u32>,
}

impl<S: LabelSource> MotionPipeline<S> {
    /// Create a pipeline for frames of `shape` (rows, columns).
    pub fn new(source: S, config: PipelineConfig, shape: (usize, usize)) -> error::Result<Self> {
        config.validate()?;
        info!(?shape, max_regions = config.max_regions, "creating motion pipeline");

        let matcher = Matcher::new(config.max_regions);
        let matcher = if config.track_conflicts {
            matcher.with_conflict_tracking()
        } else {
            matcher
        };

        Ok(Self {
            source,
            labels: LabelImage::new(shape.0, shape.1),
            filtered_labels: config
                .keep_filtered_labels
                .then(|| LabelImage::new(shape.0, shape.1)),
            raw: Vec::new(),
            prev: Vec::with_capacity(config.max_regions),
            cur: Vec::with_capacity(config.max_regions),
            matcher,
            tracker: Tracker::new(config.tracker, config.max_regions)?,
            last_frame: None,
            config,
        })
    }

    /// Create a pipeline with default configuration.
    pub fn with_default_config(source: S, shape: (usize, usize)) -> error::Result<Self> {
        Self::new(source, PipelineConfig::default(), shape)
    }

    /// Run the whole chain on the binary `mask` of `frame`.
    ///
    /// Frames must be processed in increasing order. After the call,
    /// [`previous_regions`](Self::previous_regions) and
    /// [`current_regions`](Self::current_regions) hold the associated regions of
    /// frames t-1 and t.
    pub fn process_frame(
        &mut self,
        frame: u32,
        mask: ArrayView2<'_, u8>,
    ) -> Result<FrameSummary, PipelineError<S::Error>> {
        let shape = mask.dim();
        if shape != self.labels.shape() {
            return Err(Error::ShapeMismatch {
                expected: self.labels.shape(),
                got: shape,
            }
            .into());
        }

        // only the boxes written last frame can hold labels
        zero_init_labels(&self.raw, &mut self.labels);
        let n_labels = match self.source.label(mask, &mut self.labels) {
            Ok(n_labels) => n_labels,
            Err(err) => {
                self.discard_labels();
                return Err(PipelineError::Source(err));
            }
        };

        self.raw = match extract(self.labels.view(), n_labels as usize) {
            Ok(raw) => raw,
            Err(err) => {
                self.discard_labels();
                return Err(err.into());
            }
        };
        let relabel = match self.filtered_labels.as_mut() {
            Some(target) => Relabel::Into {
                source: &self.labels,
                target,
            },
            None => Relabel::None,
        };
        let n_regions = filter_surface(&mut self.raw, self.config.surface, relabel)?;
        check_capacity("filtered frame", n_regions, self.config.max_regions)?;

        std::mem::swap(&mut self.prev, &mut self.cur);
        if self.last_frame.is_none() {
            self.prev.clear();
        }
        shrink_into(&self.raw, &mut self.cur);

        let n_associations = self
            .matcher
            .associate(&mut self.prev, &mut self.cur, &self.config.matcher)?;
        let n_tracks = self.tracker.update(&self.cur, frame)?.len();
        self.last_frame = Some(frame);

        let summary = FrameSummary {
            frame,
            n_labels,
            n_regions,
            n_associations,
            n_tracks,
        };
        debug!(?summary, "frame processed");
        Ok(summary)
    }

    // labels of a failed frame are not described by `raw`
    fn discard_labels(&mut self) {
        self.labels.clear();
        self.raw.clear();
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Frame number of the last processed frame.
    pub fn last_frame(&self) -> Option<u32> {
        self.last_frame
    }

    /// Regions of frame t-1 with their forward links to frame t.
    pub fn previous_regions(&self) -> &[Region] {
        &self.prev
    }

    /// Regions of frame t with their backward links to frame t-1.
    pub fn current_regions(&self) -> &[Region] {
        &self.cur
    }

    /// Raw label image of the last frame.
    pub fn labels(&self) -> &LabelImage {
        &self.labels
    }

    /// Label image of the surviving regions, when enabled.
    pub fn filtered_labels(&self) -> Option<&LabelImage> {
        self.filtered_labels.as_ref()
    }

    /// Get a reference to the underlying matcher.
    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Get a reference to the underlying tracker.
    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// Get a mutable reference to the underlying tracker.
    pub fn tracker_mut(&mut self) -> &mut Tracker {
        &mut self.tracker
    }

    /// Get a reference to the underlying label source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Get a mutable reference to the underlying label source.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Forget every frame and track; buffers are kept.
    pub fn reset(&mut self) {
        self.labels.clear();
        if let Some(filtered) = self.filtered_labels.as_mut() {
            filtered.clear();
        }
        self.raw.clear();
        self.prev.clear();
        self.cur.clear();
        self.tracker.reset();
        self.last_frame = None;
    }
}
