//! Mask saving utilities.

use std::path::Path;

use image::{GrayImage, ImageFormat};

use crate::error::{Error, Result};

/// Logistic sigmoid.
#[inline]
#[must_use]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Turn raw logits into binary mask samples.
///
/// A logit whose sigmoid reaches `threshold` becomes 1, anything else 0. With
/// `normalize` the ones are scaled to 255 so the mask is visible as an image.
#[must_use]
pub fn threshold_mask(logits: &[f32], threshold: f32, normalize: bool) -> Vec<u8> {
    logits
        .iter()
        .map(|&x| to_sample(sigmoid(x), threshold, normalize))
        .collect()
}

#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_sample(probability: f32, threshold: f32, normalize: bool) -> u8 {
    let mut value: f32 = if probability >= threshold { 1.0 } else { 0.0 };
    if normalize {
        value *= 255.0;
    }
    // Safe: clamped to [0, 255] range before casting
    value.clamp(0.0, 255.0) as u8
}

/// Threshold the logits and write them as a grayscale PNG.
///
/// Only the first `width * height` logits are used.
///
/// # Errors
///
/// Returns an error if there are fewer logits than pixels or the image cannot
/// be written.
pub fn save_mask<P: AsRef<Path>>(
    logits: &[f32],
    width: u32,
    height: u32,
    path: P,
    threshold: f32,
    normalize: bool,
) -> Result<()> {
    let path = path.as_ref();
    let pixels = width as usize * height as usize;

    let mask = logits
        .get(..pixels)
        .and_then(|plane| {
            GrayImage::from_raw(width, height, threshold_mask(plane, threshold, normalize))
        })
        .ok_or_else(|| Error::ShapeMismatch {
            expected: format!("{pixels} logits for a {width}x{height} mask"),
            actual: format!("{} logits", logits.len()),
        })?;

    mask.save_with_format(path, ImageFormat::Png)
        .map_err(|source| Error::ImageSave {
            path: path.to_path_buf(),
            source,
        })?;

    tracing::info!("Saved PNG to: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::DEFAULT_THRESHOLD;
    use tempfile::tempdir;

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!(sigmoid(20.0) > 0.999);
        assert!(sigmoid(-20.0) < 0.001);
    }

    #[test]
    fn test_threshold_boundary() {
        // sigmoid(-0.935) ~= 0.2819, sigmoid(-0.93) ~= 0.2829
        let mask = threshold_mask(&[-0.935, -0.93, -5.0, 5.0], DEFAULT_THRESHOLD, true);
        assert_eq!(mask, [0, 255, 0, 255]);
    }

    #[test]
    fn test_threshold_without_normalize() {
        let mask = threshold_mask(&[-10.0, 10.0], DEFAULT_THRESHOLD, false);
        assert_eq!(mask, [0, 1]);
    }

    #[test]
    fn test_threshold_extremes() {
        assert_eq!(threshold_mask(&[0.0], 0.0, true), [255]);
        assert_eq!(threshold_mask(&[f32::INFINITY], 1.0, true), [255]);
        assert_eq!(threshold_mask(&[f32::NEG_INFINITY], DEFAULT_THRESHOLD, true), [0]);
    }

    #[test]
    fn test_save_mask_writes_grayscale_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("output.png");
        let logits = [3.0, -3.0, -3.0, 3.0, 9.0, 9.0];

        save_mask(&logits, 2, 2, &path, DEFAULT_THRESHOLD, true).unwrap();

        let img = image::open(&path).unwrap();
        assert_eq!(img.color(), image::ColorType::L8);
        assert_eq!(img.into_luma8().into_raw(), vec![255, 0, 0, 255]);
    }

    #[test]
    fn test_save_mask_too_few_logits() {
        let dir = tempdir().unwrap();
        let err = save_mask(&[1.0; 3], 2, 2, dir.path().join("m.png"), 0.5, true).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
        assert!(err.to_string().contains("4 logits for a 2x2 mask"));
        assert!(err.to_string().contains("got 3 logits"));
    }
}
