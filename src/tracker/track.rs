//! A persistent object identity across frames.

use crate::features::TrackedRegion;
use crate::tracker::motion_model::MotionModel;
use crate::tracker::track_state::TrackState;

/// Single object track.
#[derive(Debug, Clone)]
pub struct Track {
    /// Unique identifier, assigned at creation and never reused during a run
    pub id: u32,
    /// First region of the track
    pub begin: TrackedRegion,
    /// Most recent detected region of the track
    pub end: TrackedRegion,
    /// Frame number of `begin`
    pub frame_begin: u32,
    /// Frame number of `end`
    pub frame_end: u32,
    /// Extrapolation state
    pub motion: MotionModel,
    /// Current state
    pub state: TrackState,
    /// Region ids per frame, 0 for frames bridged by extrapolation. Only recorded
    /// when requested at tracker construction.
    pub region_ids: Option<Vec<u32>>,
}

impl Track {
    /// Create a track from a chain of associated regions, oldest first.
    pub(crate) fn from_chain(id: u32, chain: &[TrackedRegion], record_region_ids: bool) -> Self {
        let (begin, end) = match chain {
            [first, .., last] => (*first, *last),
            [only] => (*only, *only),
            [] => unreachable!("a track needs at least one region"),
        };
        let before_last = if chain.len() >= 2 {
            chain[chain.len() - 2]
        } else {
            end
        };

        Self {
            id,
            begin,
            end,
            frame_begin: begin.frame,
            frame_end: end.frame,
            motion: MotionModel::initiate(before_last.region.centroid(), end.region.centroid()),
            state: TrackState::Updated,
            region_ids: record_region_ids.then(|| chain.iter().map(|r| r.region.id).collect()),
        }
    }

    /// Elapsed time in frames between `begin` and `end`.
    #[inline]
    pub fn duration(&self) -> u32 {
        self.end.frame - self.begin.frame
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.state == TrackState::Finished
    }

    pub fn region_ids(&self) -> Option<&[u32]> {
        self.region_ids.as_deref()
    }

    /// Append a detected region to the track.
    pub(crate) fn extend(&mut self, region: TrackedRegion) {
        self.end = region;
        self.frame_end = region.frame;
        self.motion.update(region.region.centroid());
        if let Some(ids) = self.region_ids.as_mut() {
            ids.push(region.region.id);
        }
    }

    /// Resume a lost track on `region`.
    pub(crate) fn recover(&mut self, region: TrackedRegion) {
        if let Some(ids) = self.region_ids.as_mut() {
            ids.extend(std::iter::repeat_n(0, self.motion.order as usize));
        }
        self.extend(region);
        self.motion.order = 0;
        self.state = TrackState::Updated;
    }

    pub(crate) fn mark_lost(&mut self) {
        self.state = TrackState::Lost;
    }

    /// Account for one more frame without a detection: the track finishes once
    /// `extrapol_order_max` is exceeded, otherwise its prediction moves forward.
    pub(crate) fn coast(&mut self, extrapol_order_max: u32) {
        self.motion.order += 1;
        if self.motion.order > extrapol_order_max {
            self.state = TrackState::Finished;
        } else {
            self.motion.extrapolate();
        }
    }
}
