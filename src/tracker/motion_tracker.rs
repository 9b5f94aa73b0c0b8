//! History-driven multi-frame tracker.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result, check_capacity, check_ratio};
use crate::features::{Region, TrackedRegion, surface_ratio};
use crate::tracker::history::History;
use crate::tracker::track::Track;
use crate::tracker::track_state::TrackState;

/// Configuration for the [`Tracker`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Search radius (pixels) around the extrapolated position of a lost track.
    pub r_extrapol: u32,
    /// Number of frames a track may be extrapolated before it finishes.
    pub extrapol_order_max: u32,
    /// Number of consecutive detections needed before a track is created.
    pub min_track_frames: u32,
    /// Minimum surface ratio between a track and a region recovered by
    /// extrapolation.
    pub min_extrapol_ratio_s: f32,
    /// Record the region id of every frame of every track.
    pub record_region_ids: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            r_extrapol: 5,
            extrapol_order_max: 3,
            min_track_frames: 2,
            min_extrapol_ratio_s: 0.125,
            record_region_ids: false,
        }
    }
}

impl TrackerConfig {
    /// Frames kept in the history: enough to rebuild a creation chain and to cover
    /// the extrapolation budget.
    pub fn history_capacity(&self) -> usize {
        self.min_track_frames.max(self.extrapol_order_max) as usize + 1
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_track_frames < 2 {
            return Err(Error::InvalidConfig(format!(
                "min_track_frames must be at least 2, got {}",
                self.min_track_frames
            )));
        }
        if self.extrapol_order_max as usize >= self.history_capacity() {
            return Err(Error::InvalidConfig(format!(
                "extrapol_order_max ({}) must be lower than the history capacity ({})",
                self.extrapol_order_max,
                self.history_capacity()
            )));
        }
        check_ratio("min_extrapol_ratio_s", self.min_extrapol_ratio_s)
    }
}

/// Creates, extends, extrapolates and finishes tracks, one frame at a time.
///
/// Frames must be fed in order through [`Tracker::update`], each with the regions
/// of the frame already associated to the previous frame (their `prev_id`).
#[derive(Debug)]
pub struct Tracker {
    config: TrackerConfig,
    history: History,
    tracks: Vec<Track>,
    next_track_id: u32,
    chain: Vec<TrackedRegion>,
}

impl Tracker {
    /// Create a tracker for frames of at most `max_regions` regions.
    pub fn new(config: TrackerConfig, max_regions: usize) -> Result<Self> {
        config.validate()?;
        let capacity = config.history_capacity();
        info!(?config, history_capacity = capacity, max_regions, "creating tracker");

        Ok(Self {
            config,
            history: History::new(capacity, max_regions),
            tracks: Vec::new(),
            next_track_id: 1,
            chain: Vec::with_capacity(capacity),
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// All tracks, finished ones included, in creation order.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Number of tracks held by the tracker.
    pub fn count_objects(&self) -> usize {
        self.tracks.len()
    }

    /// Remove and return the finished tracks. Identifiers of later tracks keep
    /// increasing from where they were.
    pub fn drain_finished(&mut self) -> Vec<Track> {
        let (finished, active): (Vec<Track>, Vec<Track>) = std::mem::take(&mut self.tracks)
            .into_iter()
            .partition(Track::is_finished);
        self.tracks = active;
        finished
    }

    /// Forget every track and every past frame; identifiers restart at 1.
    pub fn reset(&mut self) {
        self.history.clear();
        self.tracks.clear();
        self.next_track_id = 1;
    }

    /// Process the regions of `frame`.
    ///
    /// `regions` must be dense (ids `1..=n` in order) with `prev_id` set by the
    /// association to the previous frame. A `prev_id` beyond the previous frame's
    /// regions is rejected with [`Error::DanglingLink`] before any state changes.
    pub fn update(&mut self, regions: &[Region], frame: u32) -> Result<&[Track]> {
        check_capacity("tracker frame", regions.len(), self.history.max_regions())?;
        if !self.history.is_empty() {
            let n_prev = self.history.slot(1).len();
            if let Some(r) = regions.iter().find(|r| r.prev_id as usize > n_prev) {
                return Err(Error::DanglingLink {
                    region: r.id,
                    prev_id: r.prev_id,
                    n_prev,
                });
            }
        }

        self.history.ingest(regions, frame);

        if self.history.len() >= 2 {
            self.create_new_tracks();
            self.update_existing_tracks();
        }

        self.history.rotate();

        debug!(
            frame,
            n_regions = regions.len(),
            n_tracks = self.tracks.len(),
            "tracker updated"
        );
        Ok(&self.tracks)
    }

    /// Follow the associations from slot 1 into slot 0 and create a track for every
    /// chain that just reached `min_track_frames` detections.
    fn create_new_tracks(&mut self) {
        let chain_len = self.config.min_track_frames - 1;

        for i in 0..self.history.slot(1).len() {
            let anchor = self.history.slot(1)[i];
            let next_id = anchor.region.next_id;
            if next_id == 0 || anchor.is_extrapolated {
                continue;
            }

            let time = anchor.time_motion + 1;
            self.history.slot_mut(0)[next_id as usize - 1].time_motion = time;
            if time != chain_len {
                continue;
            }

            let duplicate = self.tracks.iter().any(|t| {
                t.end.region.id == anchor.region.id
                    && t.end.region.x == anchor.region.x
                    && t.end.region.y == anchor.region.y
            });
            if duplicate {
                continue;
            }

            // walk the chain backwards from the anchor, then store it oldest first
            self.chain.clear();
            self.chain.push(anchor);
            for age in 2..=chain_len as usize {
                let newer = self.chain[self.chain.len() - 1];
                let older = self.history.slot(age)[newer.region.prev_id as usize - 1];
                self.chain.push(older);
            }
            self.chain.reverse();

            let track = Track::from_chain(
                self.next_track_id,
                &self.chain,
                self.config.record_region_ids,
            );
            debug!(
                track_id = track.id,
                frame_begin = track.frame_begin,
                x = track.end.region.x,
                y = track.end.region.y,
                "track created"
            );
            self.next_track_id += 1;
            self.tracks.push(track);
        }
    }

    fn update_existing_tracks(&mut self) {
        let TrackerConfig {
            r_extrapol,
            extrapol_order_max,
            min_extrapol_ratio_s,
            ..
        } = self.config;

        for track in self.tracks.iter_mut() {
            match track.state {
                TrackState::Lost => {
                    if let Some(j) =
                        find_matching_region(&self.history, track, r_extrapol, min_extrapol_ratio_s)
                    {
                        let region = claim(&mut self.history, j);
                        track.recover(region);
                        debug!(track_id = track.id, frame = region.frame, "track recovered");
                    }
                }
                TrackState::Updated => {
                    let next_id = self.history.slot(1)[track.end.region.id as usize - 1]
                        .region
                        .next_id;
                    if next_id != 0 {
                        track.extend(self.history.slot(0)[next_id as usize - 1]);
                    } else if let Some(j) =
                        find_matching_region(&self.history, track, r_extrapol, min_extrapol_ratio_s)
                    {
                        track.extend(claim(&mut self.history, j));
                    } else {
                        track.mark_lost();
                        debug!(track_id = track.id, "track lost");
                    }
                }
                TrackState::Unknown | TrackState::Finished => continue,
            }

            if track.state == TrackState::Lost {
                track.coast(extrapol_order_max);
                if track.is_finished() {
                    debug!(track_id = track.id, frame_end = track.frame_end, "track finished");
                }
            }
        }
    }
}

/// Index in slot 0 of the first free detected region lying within `r_extrapol` of
/// the track's predicted position with a compatible surface.
///
/// The first match in scan order wins, not the closest one.
fn find_matching_region(
    history: &History,
    track: &Track,
    r_extrapol: u32,
    min_extrapol_ratio_s: f32,
) -> Option<usize> {
    let predicted = track.motion.predict();
    history.slot(0).iter().position(|candidate| {
        candidate.region.prev_id == 0
            && !candidate.is_extrapolated
            && nalgebra::distance(&candidate.region.centroid(), &predicted) < r_extrapol as f32
            && surface_ratio(track.end.region.surface, candidate.region.surface)
                >= min_extrapol_ratio_s
    })
}

fn claim(history: &mut History, j: usize) -> TrackedRegion {
    let slot = &mut history.slot_mut(0)[j];
    slot.is_extrapolated = true;
    *slot
}
