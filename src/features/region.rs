/// Features of one connected component in a single frame.
///
/// Coordinates are inclusive pixel positions, `x` along columns and `y` along rows.
/// An `id` of 0 marks a discarded or unused slot; any region with a non-zero `id`
/// has a non-zero `surface`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Region {
    /// Identifier within the frame, starting at 1.
    pub id: u32,
    /// Minimum x of the bounding box.
    pub xmin: u32,
    /// Maximum x of the bounding box.
    pub xmax: u32,
    /// Minimum y of the bounding box.
    pub ymin: u32,
    /// Maximum y of the bounding box.
    pub ymax: u32,
    /// Number of pixels in the component.
    pub surface: u32,
    /// Centroid x coordinate.
    pub x: f32,
    /// Centroid y coordinate.
    pub y: f32,
    /// Id of the associated region in the previous frame, 0 if none.
    pub prev_id: u32,
    /// Id of the associated region in the next frame, 0 if none.
    pub next_id: u32,
}

impl Region {
    /// Create an unassociated region from its measured features.
    #[inline]
    pub fn new(id: u32, bbox: [u32; 4], surface: u32, x: f32, y: f32) -> Self {
        let [xmin, xmax, ymin, ymax] = bbox;
        Self {
            id,
            xmin,
            xmax,
            ymin,
            ymax,
            surface,
            x,
            y,
            prev_id: 0,
            next_id: 0,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.id != 0
    }

    /// Bounding box as `[xmin, xmax, ymin, ymax]`.
    #[inline]
    pub fn bbox(&self) -> [u32; 4] {
        [self.xmin, self.xmax, self.ymin, self.ymax]
    }

    #[inline]
    pub fn centroid(&self) -> nalgebra::Point2<f32> {
        nalgebra::Point2::new(self.x, self.y)
    }

    /// Squared Euclidean distance between two centroids.
    #[inline]
    pub fn distance_squared(&self, other: &Region) -> f32 {
        nalgebra::distance_squared(&self.centroid(), &other.centroid())
    }
}

/// Size similarity of two surfaces: `min(a, b) / max(a, b)`.
#[inline]
pub fn surface_ratio(a: u32, b: u32) -> f32 {
    if a < b {
        a as f32 / b as f32
    } else {
        b as f32 / a as f32
    }
}

/// A region stamped with the temporal metadata the tracker needs.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackedRegion {
    pub region: Region,
    /// Absolute frame number the region was observed in.
    pub frame: u32,
    /// Length of the run of consecutive associations ending at this region.
    pub time_motion: u32,
    /// Set once a track claimed this region through extrapolation.
    pub is_extrapolated: bool,
}

impl TrackedRegion {
    /// Light copy of a detected region: the forward link is cleared, it is
    /// recomputed once the next frame has been matched.
    #[inline]
    pub fn observed(region: &Region, frame: u32) -> Self {
        Self {
            region: Region {
                next_id: 0,
                ..*region
            },
            frame,
            time_motion: 0,
            is_extrapolated: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_ratio_is_symmetric() {
        assert_eq!(surface_ratio(10, 40), 0.25);
        assert_eq!(surface_ratio(40, 10), 0.25);
        assert_eq!(surface_ratio(7, 7), 1.0);
    }

    #[test]
    fn test_distance_squared() {
        let a = Region::new(1, [0, 0, 0, 0], 1, 1.0, 2.0);
        let b = Region::new(2, [0, 0, 0, 0], 1, 4.0, 6.0);
        assert_eq!(a.distance_squared(&b), 25.0);
    }

    #[test]
    fn test_observed_clears_forward_link() {
        let mut r = Region::new(3, [1, 2, 3, 4], 6, 1.5, 3.5);
        r.prev_id = 2;
        r.next_id = 5;

        let t = TrackedRegion::observed(&r, 42);
        assert_eq!(t.frame, 42);
        assert_eq!(t.region.prev_id, 2);
        assert_eq!(t.region.next_id, 0);
        assert_eq!(t.time_motion, 0);
        assert!(!t.is_extrapolated);
    }
}
