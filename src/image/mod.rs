//! Band loading and mask saving utilities.

mod load;
mod save;

pub use load::{has_png_extension, list_bands, load_band, load_bands, Band, BandStack};
pub use save::{save_mask, sigmoid, threshold_mask};

/// Probability at or above which a pixel is marked as cloud.
pub const DEFAULT_THRESHOLD: f32 = 0.2820;

/// Scale applied to an 8-bit sample to bring it into [0, 1].
const SAMPLE_SCALE: f32 = 255.0;
