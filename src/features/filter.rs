//! Surface filtering and compaction of region arrays.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::features::label_image::LabelImage;
use crate::features::region::Region;

/// Accepted surface range, both bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceFilter {
    pub min: u32,
    pub max: u32,
}

impl Default for SurfaceFilter {
    fn default() -> Self {
        Self {
            min: 50,
            max: 100_000,
        }
    }
}

impl SurfaceFilter {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn accepts(&self, surface: u32) -> bool {
        self.min <= surface && surface <= self.max
    }

    pub fn validate(&self) -> Result<()> {
        if self.min > self.max {
            return Err(Error::InvalidConfig(format!(
                "surface filter min ({}) is greater than max ({})",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// What [`filter_surface`] does with the label image.
///
/// Filtering may write into the very image it reads from; that case is spelled out
/// as [`Relabel::InPlace`] instead of being inferred from buffer identity.
pub enum Relabel<'a> {
    /// Only the region array is filtered.
    None,
    /// Rewrite `labels` itself: discarded regions are cleared and survivors are
    /// renumbered densely.
    InPlace(&'a mut LabelImage),
    /// Write the dense relabeling of `source` into `target`; every other pixel of
    /// `target` is cleared.
    Into {
        source: &'a LabelImage,
        target: &'a mut LabelImage,
    },
}

/// Discard regions whose surface falls outside `bounds`.
///
/// Discarded regions get `id = 0`. Survivors keep their id in the array while the
/// label image, if any, is renumbered to a dense `1..=m` sequence in array order.
/// Returns `m`, the number of surviving regions.
pub fn filter_surface(
    regions: &mut [Region],
    bounds: SurfaceFilter,
    relabel: Relabel<'_>,
) -> Result<usize> {
    match relabel {
        Relabel::None => Ok(filter_regions(regions, bounds, |_, _| {})),
        Relabel::InPlace(labels) => Ok(filter_regions(regions, bounds, |region, new_label| {
            rewrite_bbox(labels, region, new_label.unwrap_or(0));
        })),
        Relabel::Into { source, target } => {
            if source.shape() != target.shape() {
                return Err(Error::ShapeMismatch {
                    expected: source.shape(),
                    got: target.shape(),
                });
            }
            target.clear();
            Ok(filter_regions(regions, bounds, |region, new_label| {
                if let Some(new_label) = new_label {
                    copy_bbox(source, target, region, new_label);
                }
            }))
        }
    }
}

fn filter_regions<F>(regions: &mut [Region], bounds: SurfaceFilter, mut on_region: F) -> usize
where
    F: FnMut(&Region, Option<u32>),
{
    let mut next_label = 1;
    for region in regions.iter_mut().filter(|r| r.is_valid()) {
        if bounds.accepts(region.surface) {
            on_region(&*region, Some(next_label));
            next_label += 1;
        } else {
            on_region(&*region, None);
            region.id = 0;
        }
    }
    (next_label - 1) as usize
}

// Survivors are renumbered in increasing id order to a label never above their own,
// so rewriting in place never collides with a region that is still to be visited.
fn rewrite_bbox(labels: &mut LabelImage, region: &Region, new_label: u32) {
    let mut view = labels.view_mut();
    for y in region.ymin..=region.ymax {
        for x in region.xmin..=region.xmax {
            let px = &mut view[[y as usize, x as usize]];
            if *px == region.id {
                *px = new_label;
            }
        }
    }
}

fn copy_bbox(source: &LabelImage, target: &mut LabelImage, region: &Region, new_label: u32) {
    let src = source.view();
    let mut dst = target.view_mut();
    for y in region.ymin..=region.ymax {
        for x in region.xmin..=region.xmax {
            let idx = [y as usize, x as usize];
            if src[idx] == region.id {
                dst[idx] = new_label;
            }
        }
    }
}

/// Compact the surviving regions of `src` into a dense array.
///
/// Survivors keep their relative order and are renumbered `1..=m`. Association
/// links are not carried over.
pub fn shrink(src: &[Region]) -> Vec<Region> {
    let mut dst = Vec::new();
    shrink_into(src, &mut dst);
    dst
}

/// Same as [`shrink`], writing into `dst` (cleared first) to reuse its allocation.
pub fn shrink_into(src: &[Region], dst: &mut Vec<Region>) {
    dst.clear();
    dst.extend(
        src.iter()
            .filter(|r| r.is_valid())
            .enumerate()
            .map(|(n, r)| Region::new(n as u32 + 1, r.bbox(), r.surface, r.x, r.y)),
    );
}

/// Clear the bounding box of every measured region in `labels`.
pub fn zero_init_labels(regions: &[Region], labels: &mut LabelImage) {
    let mut view = labels.view_mut();
    for r in regions.iter().filter(|r| r.surface > 0) {
        for y in r.ymin..=r.ymax {
            for x in r.xmin..=r.xmax {
                view[[y as usize, x as usize]] = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::extract;

    // surfaces: 1 -> 4, 2 -> 1, 3 -> 6, 4 -> 2
    fn sample() -> LabelImage {
        #[rustfmt::skip]
        let rows = vec![
            1, 1, 0, 2, 0,
            1, 1, 0, 0, 0,
            0, 0, 3, 3, 3,
            4, 0, 3, 3, 3,
            4, 0, 0, 0, 0,
        ];
        LabelImage::from_rows(5, 5, rows).unwrap()
    }

    #[test]
    fn test_filter_without_relabel() {
        let img = sample();
        let mut regions = extract(img.view(), 4).unwrap();
        let m = filter_surface(&mut regions, SurfaceFilter::new(2, 5), Relabel::None).unwrap();

        assert_eq!(m, 2);
        let ids: Vec<u32> = regions.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 0, 0, 4]);
    }

    #[test]
    fn test_filter_into_other_image() {
        let img = sample();
        let mut out = LabelImage::new(5, 5);
        out.view_mut().fill(9);
        let mut regions = extract(img.view(), 4).unwrap();
        let m = filter_surface(
            &mut regions,
            SurfaceFilter::new(2, 5),
            Relabel::Into {
                source: &img,
                target: &mut out,
            },
        )
        .unwrap();

        assert_eq!(m, 2);
        #[rustfmt::skip]
        let expected = vec![
            1, 1, 0, 0, 0,
            1, 1, 0, 0, 0,
            0, 0, 0, 0, 0,
            2, 0, 0, 0, 0,
            2, 0, 0, 0, 0,
        ];
        assert_eq!(out, LabelImage::from_rows(5, 5, expected).unwrap());
        // the input is untouched
        assert_eq!(img, sample());
    }

    #[test]
    fn test_filter_in_place() {
        let mut img = sample();
        let mut regions = extract(img.view(), 4).unwrap();
        let m = filter_surface(&mut regions, SurfaceFilter::new(2, 10), Relabel::InPlace(&mut img))
            .unwrap();

        assert_eq!(m, 3);
        #[rustfmt::skip]
        let expected = vec![
            1, 1, 0, 0, 0,
            1, 1, 0, 0, 0,
            0, 0, 2, 2, 2,
            3, 0, 2, 2, 2,
            3, 0, 0, 0, 0,
        ];
        assert_eq!(img, LabelImage::from_rows(5, 5, expected).unwrap());
    }

    #[test]
    fn test_filter_shape_mismatch() {
        let img = sample();
        let mut out = LabelImage::new(3, 5);
        let mut regions = extract(img.view(), 4).unwrap();
        let err = filter_surface(
            &mut regions,
            SurfaceFilter::default(),
            Relabel::Into {
                source: &img,
                target: &mut out,
            },
        )
        .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_shrink_after_filter() {
        let img = sample();
        let mut regions = extract(img.view(), 4).unwrap();
        let source = regions.clone();
        let m = filter_surface(&mut regions, SurfaceFilter::new(2, 5), Relabel::None).unwrap();
        let dense = shrink(&regions);

        assert_eq!(dense.len(), m);
        assert_eq!(dense[0].id, 1);
        assert_eq!(dense[1].id, 2);
        assert_eq!(dense[0].bbox(), source[0].bbox());
        assert_eq!(dense[1].bbox(), source[3].bbox());
        assert_eq!((dense[1].x, dense[1].y, dense[1].surface), (source[3].x, source[3].y, 2));
    }

    #[test]
    fn test_filter_and_shrink_are_idempotent() {
        let img = sample();
        let mut regions = extract(img.view(), 4).unwrap();
        let bounds = SurfaceFilter::new(2, 5);
        filter_surface(&mut regions, bounds, Relabel::None).unwrap();
        let once = shrink(&regions);

        let mut again = once.clone();
        let m = filter_surface(&mut again, bounds, Relabel::None).unwrap();
        assert_eq!(m, once.len());
        assert_eq!(shrink(&again), once);
    }

    #[test]
    fn test_shrink_drops_links() {
        let mut r = Region::new(1, [0, 0, 0, 0], 1, 0.0, 0.0);
        r.prev_id = 3;
        r.next_id = 4;
        let dense = shrink(&[Region::default(), r]);
        assert_eq!(dense.len(), 1);
        assert_eq!((dense[0].prev_id, dense[0].next_id), (0, 0));
    }

    #[test]
    fn test_shrink_into_reuses_buffer() {
        let img = sample();
        let mut regions = extract(img.view(), 4).unwrap();
        filter_surface(&mut regions, SurfaceFilter::new(2, 5), Relabel::None).unwrap();

        let mut dense = Vec::with_capacity(16);
        dense.push(Region::new(9, [0, 0, 0, 0], 1, 0.0, 0.0));
        let ptr = dense.as_ptr();
        shrink_into(&regions, &mut dense);

        assert_eq!(dense, shrink(&regions));
        assert_eq!(dense.as_ptr(), ptr);
    }

    #[test]
    fn test_zero_init_labels() {
        let mut img = sample();
        let regions = extract(img.view(), 4).unwrap();
        zero_init_labels(&regions[2..3], &mut img);

        assert_eq!(img.get(2, 2), Some(0));
        assert_eq!(img.get(3, 4), Some(0));
        assert_eq!(img.get(0, 0), Some(1));
        assert_eq!(img.count_foreground(), 7);
    }

    #[test]
    fn test_surface_filter_validation() {
        assert!(SurfaceFilter::new(10, 5).validate().is_err());
        assert!(SurfaceFilter::default().validate().is_ok());
    }
}
