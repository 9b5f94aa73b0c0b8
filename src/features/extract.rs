//! Label image to region features.

use ndarray::{ArrayView2, Axis};
use rayon::prelude::*;
use tracing::trace;

use crate::error::{Error, Result};
use crate::features::region::Region;

/// Exact integer moments of one label, private to a row partition until merged.
#[derive(Debug, Clone, Copy)]
struct LabelStats {
    surface: u64,
    sum_x: u64,
    sum_y: u64,
    xmin: u32,
    xmax: u32,
    ymin: u32,
    ymax: u32,
}

impl Default for LabelStats {
    fn default() -> Self {
        Self {
            surface: 0,
            sum_x: 0,
            sum_y: 0,
            xmin: u32::MAX,
            xmax: 0,
            ymin: u32::MAX,
            ymax: 0,
        }
    }
}

impl LabelStats {
    /// Accumulate the run of pixels `[x0, x1]` on row `y`.
    #[inline]
    fn add_run(&mut self, y: u32, x0: u32, x1: u32) {
        let len = (x1 - x0 + 1) as u64;
        self.surface += len;
        self.sum_x += (x0 as u64 + x1 as u64) * len / 2;
        self.sum_y += y as u64 * len;
        self.xmin = self.xmin.min(x0);
        self.xmax = self.xmax.max(x1);
        self.ymin = self.ymin.min(y);
        self.ymax = self.ymax.max(y);
    }

    #[inline]
    fn merge(&mut self, other: &LabelStats) {
        if other.surface == 0 {
            return;
        }
        self.surface += other.surface;
        self.sum_x += other.sum_x;
        self.sum_y += other.sum_y;
        self.xmin = self.xmin.min(other.xmin);
        self.xmax = self.xmax.max(other.xmax);
        self.ymin = self.ymin.min(other.ymin);
        self.ymax = self.ymax.max(other.ymax);
    }

    fn to_region(&self, slot: usize) -> Region {
        if self.surface == 0 {
            return Region::default();
        }
        let s = self.surface as f64;
        Region::new(
            slot as u32 + 1,
            [self.xmin, self.xmax, self.ymin, self.ymax],
            self.surface as u32,
            (self.sum_x as f64 / s) as f32,
            (self.sum_y as f64 / s) as f32,
        )
    }
}

/// Extract the features of labels `1..=n_labels`, one row partition per rayon
/// worker.
///
/// The returned array has exactly `n_labels` slots, slot `l - 1` describing label
/// `l`. Labels that never appear in the image come back with `id == 0`.
///
/// Coordinates (bounding boxes, centroids and the position reported by
/// [`Error::LabelOutOfRange`]) are relative to the origin of `labels`. To process a
/// window `[i0..i1] x [j0..j1]` of a larger image, pass the sliced view and add
/// `(j0, i0)` to the `x` / `y` values of the result.
pub fn extract(labels: ArrayView2<'_, u32>, n_labels: usize) -> Result<Vec<Region>> {
    extract_partitioned(labels, n_labels, rayon::current_num_threads())
}

/// Same as [`extract`] with an explicit number of row partitions.
///
/// Partitions only accumulate integers, so the result does not depend on
/// `partitions`.
pub fn extract_partitioned(
    labels: ArrayView2<'_, u32>,
    n_labels: usize,
    partitions: usize,
) -> Result<Vec<Region>> {
    let rows = labels.nrows();
    let partitions = partitions.clamp(1, rows.max(1));
    let rows_per_part = rows.div_ceil(partitions).max(1);

    let blocks: Vec<(usize, ArrayView2<'_, u32>)> = labels
        .axis_chunks_iter(Axis(0), rows_per_part)
        .enumerate()
        .map(|(p, block)| (p * rows_per_part, block))
        .collect();

    let partials = blocks
        .into_par_iter()
        .map(|(row0, block)| accumulate(block, row0, n_labels))
        .collect::<Result<Vec<_>>>()?;

    let mut totals = vec![LabelStats::default(); n_labels];
    for partial in &partials {
        for (total, stats) in totals.iter_mut().zip(partial) {
            total.merge(stats);
        }
    }

    trace!(n_labels, partitions = partials.len(), "features extracted");

    Ok(totals
        .iter()
        .enumerate()
        .map(|(slot, stats)| stats.to_region(slot))
        .collect())
}

fn accumulate(
    block: ArrayView2<'_, u32>,
    row0: usize,
    n_labels: usize,
) -> Result<Vec<LabelStats>> {
    let mut stats = vec![LabelStats::default(); n_labels];

    for (di, row) in block.rows().into_iter().enumerate() {
        let y = row0 + di;
        let width = row.len();
        let mut x = 0;
        while x < width {
            let label = row[x];
            if label == 0 {
                x += 1;
                continue;
            }

            // run of identical labels [x, end)
            let mut end = x + 1;
            while end < width && row[end] == label {
                end += 1;
            }

            let slot = stats
                .get_mut(label as usize - 1)
                .ok_or(Error::LabelOutOfRange {
                    label,
                    row: y,
                    col: x,
                    n_labels,
                })?;
            slot.add_run(y as u32, x as u32, (end - 1) as u32);

            x = end;
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::LabelImage;
    use ndarray::s;

    fn sample() -> LabelImage {
        #[rustfmt::skip]
        let rows = vec![
            0, 1, 1, 0, 0, 0, 0,
            0, 1, 1, 0, 2, 2, 0,
            0, 0, 0, 0, 2, 0, 0,
            3, 0, 0, 0, 2, 0, 0,
            3, 3, 0, 0, 0, 0, 4,
            0, 0, 0, 0, 0, 0, 4,
        ];
        LabelImage::from_rows(6, 7, rows).unwrap()
    }

    #[test]
    fn test_extract_features() {
        let img = sample();
        let regions = extract(img.view(), 4).unwrap();
        assert_eq!(regions.len(), 4);

        let total: u32 = regions.iter().filter(|r| r.id != 0).map(|r| r.surface).sum();
        assert_eq!(total as usize, img.count_foreground());

        let r1 = regions[0];
        assert_eq!(r1.id, 1);
        assert_eq!(r1.surface, 4);
        assert_eq!(r1.bbox(), [1, 2, 0, 1]);
        assert_eq!((r1.x, r1.y), (1.5, 0.5));

        let r2 = regions[1];
        assert_eq!(r2.surface, 4);
        assert_eq!(r2.bbox(), [4, 5, 1, 3]);
        assert_eq!(r2.x, 17.0 / 4.0);
        assert_eq!(r2.y, 7.0 / 4.0);

        let r4 = regions[3];
        assert_eq!(r4.bbox(), [6, 6, 4, 5]);
        assert_eq!(r4.prev_id, 0);
        assert_eq!(r4.next_id, 0);
    }

    #[test]
    fn test_bounding_boxes_enclose_pixels() {
        let img = sample();
        let regions = extract(img.view(), 4).unwrap();
        for ((row, col), &label) in img.view().indexed_iter() {
            if label == 0 {
                continue;
            }
            let r = &regions[label as usize - 1];
            assert!(r.xmin as usize <= col && col <= r.xmax as usize);
            assert!(r.ymin as usize <= row && row <= r.ymax as usize);
        }
    }

    #[test]
    fn test_partition_count_does_not_change_result() {
        let mut labels = Vec::with_capacity(37 * 29);
        for i in 0..37u32 {
            for j in 0..29u32 {
                let v = (i * 7 + j * 3) % 11;
                labels.push(if v < 6 { v % 5 + 1 } else { 0 });
            }
        }
        let img = LabelImage::from_rows(37, 29, labels).unwrap();

        let single = extract_partitioned(img.view(), 5, 1).unwrap();
        for parts in [2, 3, 8, 37, 100] {
            assert_eq!(extract_partitioned(img.view(), 5, parts).unwrap(), single);
        }
    }

    #[test]
    fn test_window_coordinates_are_relative() {
        let img = sample();
        let window = img.view().slice_move(s![2.., 3..]);
        let regions = extract(window, 4).unwrap();

        // labels 1 and 3 lie outside the window
        assert_eq!(regions[0].id, 0);
        assert_eq!(regions[2].id, 0);

        let r2 = regions[1];
        assert_eq!(r2.surface, 2);
        assert_eq!(r2.bbox(), [1, 1, 0, 1]);
        assert_eq!((r2.x, r2.y), (1.0, 0.5));

        let r4 = regions[3];
        assert_eq!(r4.bbox(), [3, 3, 2, 3]);
    }

    #[test]
    fn test_missing_label_is_discarded() {
        let img = LabelImage::from_rows(2, 2, vec![1, 0, 0, 3]).unwrap();
        let regions = extract(img.view(), 3).unwrap();
        assert_eq!(regions[0].id, 1);
        assert_eq!(regions[1].id, 0);
        assert_eq!(regions[1].surface, 0);
        assert_eq!(regions[2].id, 3);
    }

    #[test]
    fn test_label_out_of_range() {
        let img = LabelImage::from_rows(1, 3, vec![1, 0, 5]).unwrap();
        let err = extract(img.view(), 2).unwrap_err();
        assert!(matches!(err, Error::LabelOutOfRange { label: 5, row: 0, col: 2, .. }));
    }

    #[test]
    fn test_empty_image() {
        let img = LabelImage::new(4, 4);
        assert!(extract(img.view(), 0).unwrap().is_empty());
    }
}
