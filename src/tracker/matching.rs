//! Rank-based k-nearest-neighbour association between consecutive frames.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{Error, Result, check_capacity, check_ratio};
use crate::features::{Region, surface_ratio};

/// Parameters of the rank-kNN matcher.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Number of ranks considered per previous-frame region.
    pub k: u32,
    /// Centroid distance (pixels) at and beyond which pairs are never ranked.
    pub max_dist: u32,
    /// Minimum `min(S_a, S_b) / max(S_a, S_b)` for an association.
    pub min_ratio_s: f32,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            k: 3,
            max_dist: 10,
            min_ratio_s: 0.125,
        }
    }
}

impl MatcherConfig {
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(Error::InvalidConfig("matcher k must be at least 1".into()));
        }
        check_ratio("min_ratio_s", self.min_ratio_s)
    }
}

/// Association workspace, allocated once for the run and reused every frame.
///
/// Row `i` of the matrices refers to the previous-frame region `i`, column `j` to
/// the current-frame region `j`.
#[derive(Debug, Clone)]
pub struct Matcher {
    distances: Array2<f32>,
    ranks: Array2<u32>,
    conflicts: Option<Vec<u32>>,
    n_prev: usize,
    n_cur: usize,
}

impl Matcher {
    /// Create a workspace for at most `capacity` regions per frame.
    pub fn new(capacity: usize) -> Self {
        Self {
            distances: Array2::zeros((capacity, capacity)),
            ranks: Array2::zeros((capacity, capacity)),
            conflicts: None,
            n_prev: 0,
            n_cur: 0,
        }
    }

    /// Also count, for every current region, how many previous regions ranked it
    /// first. The counters are diagnostic only.
    pub fn with_conflict_tracking(mut self) -> Self {
        self.conflicts = Some(vec![0; self.capacity()]);
        self
    }

    pub fn capacity(&self) -> usize {
        self.distances.nrows()
    }

    /// Sizes of the last matched frames, `(n_prev, n_cur)`.
    pub fn dims(&self) -> (usize, usize) {
        (self.n_prev, self.n_cur)
    }

    /// Squared centroid distance computed by the last call to [`Matcher::associate`].
    pub fn distance_squared(&self, i: usize, j: usize) -> f32 {
        self.distances[[i, j]]
    }

    /// Rank of the pair in the last call, 0 when unranked.
    pub fn rank(&self, i: usize, j: usize) -> u32 {
        self.ranks[[i, j]]
    }

    /// Per current-region rank-1 candidate counts of the last call.
    pub fn conflicts(&self) -> Option<&[u32]> {
        self.conflicts.as_deref().map(|c| &c[..self.n_cur])
    }

    /// Associate `prev` (frame t-1) with `cur` (frame t).
    ///
    /// Every `prev[i].next_id` and `cur[j].prev_id` is reset first, then set for each
    /// committed pair. Both arrays must be dense (ids `1..=n` in order). Returns the
    /// number of associations.
    pub fn associate(
        &mut self,
        prev: &mut [Region],
        cur: &mut [Region],
        config: &MatcherConfig,
    ) -> Result<usize> {
        config.validate()?;
        check_capacity("previous frame", prev.len(), self.capacity())?;
        check_capacity("current frame", cur.len(), self.capacity())?;

        prev.iter_mut().for_each(|r| r.next_id = 0);
        cur.iter_mut().for_each(|r| r.prev_id = 0);
        self.n_prev = prev.len();
        self.n_cur = cur.len();

        self.compute_distances(prev, cur);
        self.compute_ranks(config.k, config.max_dist);
        let n_assoc = self.resolve(prev, cur, config.k, config.min_ratio_s);

        trace!(
            n_prev = self.n_prev,
            n_cur = self.n_cur,
            n_assoc,
            "kNN association done"
        );
        Ok(n_assoc)
    }

    fn compute_distances(&mut self, prev: &[Region], cur: &[Region]) {
        for (i, a) in prev.iter().enumerate() {
            for (j, b) in cur.iter().enumerate() {
                self.distances[[i, j]] = a.distance_squared(b);
            }
        }
    }

    /// Give each previous region ranks `1..=k` over its closest current regions
    /// lying strictly within `max_dist`. Equal distances are ranked by column index.
    fn compute_ranks(&mut self, k: u32, max_dist: u32) {
        let max_dist_sq = max_dist as f32 * max_dist as f32;
        let (n_prev, n_cur) = (self.n_prev, self.n_cur);

        if let Some(conflicts) = self.conflicts.as_mut() {
            conflicts[..n_cur].fill(0);
        }

        let mut candidates = Vec::with_capacity(n_cur);
        for i in 0..n_prev {
            candidates.clear();
            candidates.extend((0..n_cur).filter(|&j| self.distances[[i, j]] < max_dist_sq));
            // stable: ties keep column order
            candidates.sort_by(|&a, &b| self.distances[[i, a]].total_cmp(&self.distances[[i, b]]));

            for j in 0..n_cur {
                self.ranks[[i, j]] = 0;
            }
            for (rank, &j) in (1..=k).zip(candidates.iter()) {
                self.ranks[[i, j]] = rank;
            }

            if let (Some(conflicts), Some(&first)) = (self.conflicts.as_mut(), candidates.first()) {
                conflicts[first] += 1;
            }
        }
    }

    /// Greedy one-to-one resolution in previous-region order.
    ///
    /// A previous region gives up its candidate at the current rank when a later
    /// previous region holds the same rank on it, is strictly closer and passes the
    /// size test; it also moves on when its own size test fails. It stays unmatched
    /// when the candidate at its current rank is already taken.
    fn resolve(&self, prev: &mut [Region], cur: &mut [Region], k: u32, min_ratio_s: f32) -> usize {
        let mut n_assoc = 0;

        for i in 0..prev.len() {
            for rank in 1..=k {
                let Some(j) =
                    (0..cur.len()).find(|&j| cur[j].prev_id == 0 && self.ranks[[i, j]] == rank)
                else {
                    break;
                };

                let dist_ij = self.distances[[i, j]];
                let closer_competitor = (i + 1..prev.len()).any(|l| {
                    self.ranks[[l, j]] == rank
                        && self.distances[[l, j]] < dist_ij
                        && surface_ratio(prev[l].surface, cur[j].surface) >= min_ratio_s
                });
                if closer_competitor {
                    continue;
                }

                if surface_ratio(prev[i].surface, cur[j].surface) >= min_ratio_s {
                    prev[i].next_id = cur[j].id;
                    cur[j].prev_id = prev[i].id;
                    n_assoc += 1;
                    break;
                }
            }
        }

        n_assoc
    }
}
