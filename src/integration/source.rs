//! Trait for connected-component labeling backends.

use ndarray::ArrayView2;

use crate::features::LabelImage;

/// Trait for connected-component labeling backends.
///
/// Implement this trait to feed a [`MotionPipeline`](super::MotionPipeline) from any
/// labeling algorithm (LSL, union-find, a GPU kernel, ...).
///
/// # Example
///
/// ```ignore
/// use motion_track::{LabelImage, LabelSource};
/// use ndarray::ArrayView2;
///
/// struct MyLabeler;
///
/// impl LabelSource for MyLabeler {
///     type Error = std::convert::Infallible;
///
///     fn label(&mut self, mask: ArrayView2<'_, u8>, labels: &mut LabelImage) -> Result<u32, Self::Error> {
///         // Write labels 1..=n over the foreground pixels of `mask`
///         Ok(0)
///     }
/// }
/// ```
pub trait LabelSource {
    /// Error type for labeling failures.
    type Error: std::error::Error + 'static;

    /// Label the foreground (non-zero) pixels of `mask` into `labels`.
    ///
    /// `labels` has the shape of `mask` and is all background on entry. Labels must
    /// be written as a dense `1..=n` sequence; the return value is `n`.
    fn label(&mut self, mask: ArrayView2<'_, u8>, labels: &mut LabelImage)
    -> Result<u32, Self::Error>;
}

impl<S: LabelSource + ?Sized> LabelSource for &mut S {
    type Error = S::Error;

    fn label(
        &mut self,
        mask: ArrayView2<'_, u8>,
        labels: &mut LabelImage,
    ) -> Result<u32, Self::Error> {
        (**self).label(mask, labels)
    }
}
