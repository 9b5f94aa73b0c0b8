//! Connected-component analysis (CCA).
//!
//! Turns the label image produced by an upstream labeling stage into per-region
//! features (bounding box, surface, centroid), filters them by surface and compacts
//! the survivors into a dense array ready for matching.

mod extract;
mod filter;
mod label_image;
mod region;

pub use extract::{extract, extract_partitioned};
pub use filter::{Relabel, SurfaceFilter, filter_surface, shrink, shrink_into, zero_init_labels};
pub use label_image::LabelImage;
pub use region::{Region, TrackedRegion, surface_ratio};
