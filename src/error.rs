//! Error types shared by the feature extractor, the matcher and the tracker.

use thiserror::Error;

/// Errors raised when a precondition of the tracking core is violated.
///
/// None of these are expected at runtime with a correctly sized configuration:
/// an empty frame, a frame without associations or a run without tracks are all
/// valid states and never surface as errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A configuration field is outside of its accepted domain.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A surface ratio threshold is outside of `[0, 1]`.
    #[error("`{name}` must lie in [0, 1], got {value}")]
    RatioOutOfRange { name: &'static str, value: f32 },

    /// More regions were handed over than the buffers were sized for.
    #[error("{what}: {got} regions exceed the declared capacity of {capacity}")]
    CapacityExceeded {
        what: &'static str,
        got: usize,
        capacity: usize,
    },

    /// A pixel carries a label greater than the declared number of labels.
    #[error("label {label} at (row {row}, col {col}) exceeds the declared label count {n_labels}")]
    LabelOutOfRange {
        label: u32,
        row: usize,
        col: usize,
        n_labels: usize,
    },

    /// A region links back to a region the previous frame does not have.
    #[error("region {region} links to previous region {prev_id}, previous frame has {n_prev}")]
    DanglingLink {
        region: u32,
        prev_id: u32,
        n_prev: usize,
    },

    /// Two label images that must share a shape do not.
    #[error("label image shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },
}

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn check_ratio(name: &'static str, value: f32) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::RatioOutOfRange { name, value })
    }
}

pub(crate) fn check_capacity(what: &'static str, got: usize, capacity: usize) -> Result<()> {
    if got > capacity {
        Err(Error::CapacityExceeded {
            what,
            got,
            capacity,
        })
    } else {
        Ok(())
    }
}
