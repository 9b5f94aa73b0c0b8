//! Constant-velocity extrapolation used to bridge missed detections.

use nalgebra::{Point2, Vector2};

/// Extrapolation state of a track.
///
/// The velocity is a plain one-step finite difference between the newest detected
/// position and the previous (possibly extrapolated) one; it is not smoothed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionModel {
    /// Last known or extrapolated position.
    pub last: Point2<f32>,
    /// Position one step before `last`.
    pub before_last: Point2<f32>,
    /// Estimated displacement per frame.
    pub velocity: Vector2<f32>,
    /// Number of consecutive frames extrapolated without a detection.
    pub order: u32,
}

impl MotionModel {
    /// Start from the two newest positions of a freshly created track. The
    /// velocity is estimated by the first [`MotionModel::update`].
    pub fn initiate(before_last: Point2<f32>, last: Point2<f32>) -> Self {
        Self {
            last,
            before_last,
            velocity: Vector2::zeros(),
            order: 0,
        }
    }

    /// Position expected in the frame following `last`.
    #[inline]
    pub fn predict(&self) -> Point2<f32> {
        self.last + self.velocity
    }

    /// Correct with a detected position.
    pub fn update(&mut self, position: Point2<f32>) {
        self.velocity = position - self.last;
        self.before_last = self.last;
        self.last = position;
    }

    /// Move the prediction one frame forward without a detection.
    pub fn extrapolate(&mut self) {
        self.before_last = self.last;
        self.last += self.velocity;
    }
}
