use ndarray::{Array2, ArrayView2, ArrayViewMut2};

/// Owned image of connected-component labels.
///
/// Pixel `(row, col)` holds 0 for background or a positive component label. Rows
/// map to region `y` coordinates and columns to `x` coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelImage {
    pixels: Array2<u32>,
}

impl LabelImage {
    /// Create an all-background image.
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            pixels: Array2::zeros((height, width)),
        }
    }

    pub fn from_array(pixels: Array2<u32>) -> Self {
        Self { pixels }
    }

    /// Build an image from row-major label values.
    ///
    /// Returns `None` when `labels.len() != height * width`.
    pub fn from_rows(height: usize, width: usize, labels: Vec<u32>) -> Option<Self> {
        Array2::from_shape_vec((height, width), labels)
            .ok()
            .map(Self::from_array)
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.pixels.nrows()
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.pixels.ncols()
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        self.pixels.dim()
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<u32> {
        self.pixels.get((row, col)).copied()
    }

    pub fn view(&self) -> ArrayView2<'_, u32> {
        self.pixels.view()
    }

    pub fn view_mut(&mut self) -> ArrayViewMut2<'_, u32> {
        self.pixels.view_mut()
    }

    pub fn into_inner(self) -> Array2<u32> {
        self.pixels
    }

    /// Reset every pixel to background.
    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// Number of non-background pixels.
    pub fn count_foreground(&self) -> usize {
        self.pixels.iter().filter(|&&l| l != 0).count()
    }

    /// Largest label present, 0 for an empty image.
    pub fn max_label(&self) -> u32 {
        self.pixels.iter().copied().max().unwrap_or(0)
    }
}

impl From<Array2<u32>> for LabelImage {
    fn from(pixels: Array2<u32>) -> Self {
        Self::from_array(pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows() {
        let img = LabelImage::from_rows(2, 3, vec![0, 1, 1, 2, 0, 0]).unwrap();
        assert_eq!(img.shape(), (2, 3));
        assert_eq!(img.get(1, 0), Some(2));
        assert_eq!(img.get(2, 0), None);
        assert_eq!(img.count_foreground(), 3);
        assert_eq!(img.max_label(), 2);
    }

    #[test]
    fn test_from_rows_rejects_bad_length() {
        assert!(LabelImage::from_rows(2, 2, vec![0; 3]).is_none());
    }
}
