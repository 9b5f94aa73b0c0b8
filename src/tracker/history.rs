use std::fmt;

use crate::features::{Region, TrackedRegion};

/// Bounded ring of the most recent frames' regions.
///
/// Logical slot 0 is the frame being processed, slot `k` is `k` frames older.
/// Rotation only moves the write index; the per-frame buffers are allocated once
/// and reused. Only the [`Tracker`](crate::tracker::Tracker) builds and feeds a
/// history; callers get read access through [`Tracker::history`](crate::tracker::Tracker::history).
pub struct History {
    frames: Vec<Vec<TrackedRegion>>,
    head: usize,
    len: usize,
    max_regions: usize,
}

impl History {
    /// # Panics
    ///
    /// If `capacity < 2`. The tracker derives the capacity from a validated
    /// configuration, which guarantees at least 3.
    pub(crate) fn new(capacity: usize, max_regions: usize) -> Self {
        assert!(capacity >= 2, "history needs at least two frames");
        Self {
            frames: (0..capacity)
                .map(|_| Vec::with_capacity(max_regions))
                .collect(),
            head: 0,
            len: 0,
            max_regions,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.frames.len()
    }

    /// Number of frames holding data, slot 0 included once ingested.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn max_regions(&self) -> usize {
        self.max_regions
    }

    #[inline]
    fn physical(&self, slot: usize) -> usize {
        debug_assert!(slot < self.capacity());
        (self.head + slot) % self.capacity()
    }

    /// Regions of the frame `slot` frames older than the current one.
    ///
    /// # Panics
    ///
    /// In debug builds, if `slot >= capacity()`.
    pub fn slot(&self, slot: usize) -> &[TrackedRegion] {
        &self.frames[self.physical(slot)]
    }

    pub(crate) fn slot_mut(&mut self, slot: usize) -> &mut [TrackedRegion] {
        let p = self.physical(slot);
        &mut self.frames[p]
    }

    /// Copy the current frame's regions into slot 0 and rebuild the forward links
    /// of slot 1 from their backward links.
    ///
    /// # Panics
    ///
    /// If a `prev_id` does not name a region of slot 1. The matcher only ever sets
    /// ids of the previous frame.
    pub(crate) fn ingest(&mut self, regions: &[Region], frame: u32) {
        let had_previous = self.len > 0;

        let p = self.physical(0);
        let current = &mut self.frames[p];
        current.clear();
        current.extend(regions.iter().map(|r| TrackedRegion::observed(r, frame)));

        if had_previous {
            let previous = self.slot_mut(1);
            for (j, r) in regions.iter().enumerate() {
                if r.prev_id != 0 {
                    previous[r.prev_id as usize - 1].region.next_id = j as u32 + 1;
                }
            }
        }

        if self.len < self.capacity() {
            self.len += 1;
        }
    }

    /// Age every slot by one frame: slot 0 becomes slot 1, the oldest slot is
    /// evicted and reused as an empty slot 0.
    pub(crate) fn rotate(&mut self) {
        self.head = (self.head + self.capacity() - 1) % self.capacity();
        let p = self.physical(0);
        self.frames[p].clear();
    }

    pub(crate) fn clear(&mut self) {
        self.frames.iter_mut().for_each(Vec::clear);
        self.head = 0;
        self.len = 0;
    }
}

impl fmt::Debug for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries((0..self.len).map(|s| self.slot(s).len()))
            .finish()
    }
}
