//! Main pipeline: load bands, run the model, write the mask.

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::image::{self, BandStack, DEFAULT_THRESHOLD};
use crate::model::{Model, ModelOptions, SATUNET_INPUT_SHAPE};

/// Configuration for the segmentation pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    /// Folder holding one PNG per band.
    pub input_dir: PathBuf,

    /// Path to the ONNX model.
    pub model_path: PathBuf,

    /// Where the mask PNG is written.
    pub output_path: PathBuf,

    /// Sigmoid probability at or above which a pixel is set.
    pub threshold: f32,

    /// Scale set pixels to 255 instead of 1.
    pub normalize: bool,

    /// Intra-op threads for the inference session.
    pub intra_threads: usize,

    /// Expected model input shape (N, C, H, W).
    pub input_shape: [usize; 4],

    /// File name prefixes giving the band order. None sorts by name.
    pub band_order: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("processed"),
            model_path: PathBuf::from("models/SatUNet.onnx"),
            output_path: PathBuf::from("output.png"),
            threshold: DEFAULT_THRESHOLD,
            normalize: true,
            intra_threads: 1,
            input_shape: SATUNET_INPUT_SHAPE,
            band_order: None,
        }
    }
}

impl Config {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(Error::InvalidParameter {
                name: "threshold".to_string(),
                reason: "must be between 0.0 and 1.0".to_string(),
            });
        }

        if self.intra_threads == 0 {
            return Err(Error::InvalidParameter {
                name: "intra_threads".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        if self.input_shape.contains(&0) {
            return Err(Error::InvalidParameter {
                name: "input_shape".to_string(),
                reason: "dimensions must be greater than 0".to_string(),
            });
        }

        if let Some(order) = &self.band_order {
            if order.is_empty() || order.iter().any(String::is_empty) {
                return Err(Error::InvalidParameter {
                    name: "band_order".to_string(),
                    reason: "prefixes must be non-empty".to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Outcome of a pipeline run.
#[derive(Debug, Clone)]
pub struct Summary {
    /// Names of the bands in the order they were packed.
    pub bands: Vec<String>,
    /// Shape of the model output.
    pub output_shape: Vec<usize>,
    /// Path of the written mask.
    pub output_path: PathBuf,
}

/// Check that the stack holds one plane per input channel, each of the
/// input's height and width.
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] naming the first band that does not fit.
pub fn check_band_layout(stack: &BandStack, input_shape: [usize; 4]) -> Result<()> {
    let [_, channels, height, width] = input_shape;

    if stack.len() != channels {
        return Err(Error::ShapeMismatch {
            expected: format!("{channels} bands"),
            actual: format!("{} bands", stack.len()),
        });
    }

    for (name, band_width, band_height) in &stack.bands {
        if (*band_width as usize, *band_height as usize) != (width, height) {
            return Err(Error::ShapeMismatch {
                expected: format!("{width}x{height} band"),
                actual: format!("{name} is {band_width}x{band_height}"),
            });
        }
    }

    Ok(())
}

/// Segmentation pipeline bound to a loaded model.
pub struct Pipeline {
    config: Config,
    model: Model,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the model cannot be
    /// loaded.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        tracing::info!("Initializing pipeline with config: {config:?}");

        let options = ModelOptions {
            intra_threads: config.intra_threads,
            input_shape: config.input_shape,
        };
        tracing::info!("Loading model {}...", config.model_path.display());
        let model = Model::load(&config.model_path, &options)?;

        Ok(Self { config, model })
    }

    /// The configuration this pipeline runs with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Segment the scene in the input folder and write the mask.
    ///
    /// # Errors
    ///
    /// Returns an error if loading, inference or saving fails.
    pub fn run(&mut self) -> Result<Summary> {
        let stack = image::load_bands(&self.config.input_dir, self.config.band_order.as_deref())?;
        tracing::debug!("Packed {} bands into {} values", stack.len(), stack.data.len());
        check_band_layout(&stack, self.config.input_shape)?;

        let output = self.model.infer(&stack.data)?;

        image::save_mask(
            &output.data,
            output.width()?,
            output.height()?,
            &self.config.output_path,
            self.config.threshold,
            self.config.normalize,
        )?;

        Ok(Summary {
            bands: stack.bands.into_iter().map(|(name, _, _)| name).collect(),
            output_shape: output.shape,
            output_path: self.config.output_path.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::image::{GrayImage, Luma};
    use std::path::Path;
    use tempfile::tempdir;

    fn write_bands(dir: &Path, sizes: &[(u32, u32)]) {
        for (i, &(width, height)) in sizes.iter().enumerate() {
            GrayImage::from_pixel(width, height, Luma([128]))
                .save(dir.join(format!("band_{i}.png")))
                .unwrap();
        }
    }

    #[test]
    fn test_band_layout_accepts_matching_planes() {
        let dir = tempdir().unwrap();
        write_bands(dir.path(), &[(8, 6); 4]);

        let stack = image::load_bands(dir.path(), None).unwrap();
        assert!(check_band_layout(&stack, [1, 4, 6, 8]).is_ok());
    }

    #[test]
    fn test_band_layout_rejects_split_planes() {
        // Eight half-height bands hold exactly as many samples as four full ones.
        let dir = tempdir().unwrap();
        write_bands(dir.path(), &[(8, 3); 8]);

        let stack = image::load_bands(dir.path(), None).unwrap();
        assert_eq!(stack.data.len(), 4 * 6 * 8);

        let err = check_band_layout(&stack, [1, 4, 6, 8]).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
        assert!(err.to_string().contains("4 bands"));
    }

    #[test]
    fn test_band_layout_rejects_mismatched_size() {
        let dir = tempdir().unwrap();
        write_bands(dir.path(), &[(8, 6), (8, 6), (8, 3), (8, 6)]);

        let stack = image::load_bands(dir.path(), None).unwrap();
        let err = check_band_layout(&stack, [1, 4, 6, 8]).unwrap_err();

        assert!(matches!(err, Error::ShapeMismatch { .. }));
        assert!(err.to_string().contains("band_2.png is 8x3"));
    }

    #[test]
    fn test_band_layout_rejects_empty_stack() {
        let err = check_band_layout(&BandStack::default(), SATUNET_INPUT_SHAPE).unwrap_err();
        assert!(err.to_string().contains("0 bands"));
    }

    #[test]
    fn test_new_with_missing_model() {
        let dir = tempdir().unwrap();
        let config = Config {
            model_path: dir.path().join("dummy_path.onnx"),
            ..Config::default()
        };
        assert!(matches!(
            Pipeline::new(config),
            Err(Error::ModelLoad { .. })
        ));
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.input_dir, PathBuf::from("processed"));
        assert_eq!(config.model_path, PathBuf::from("models/SatUNet.onnx"));
        assert_eq!(config.output_path, PathBuf::from("output.png"));
        assert!((config.threshold - 0.2820).abs() < f32::EPSILON);
        assert_eq!(config.intra_threads, 1);
        assert_eq!(config.input_shape, [1, 4, 384, 384]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_threshold() {
        for threshold in [-0.1, 1.5, f32::NAN] {
            let config = Config {
                threshold,
                ..Config::default()
            };
            assert!(matches!(
                config.validate(),
                Err(Error::InvalidParameter { ref name, .. }) if name == "threshold"
            ));
        }
    }

    #[test]
    fn test_invalid_threads() {
        let config = Config {
            intra_threads: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_input_shape() {
        let config = Config {
            input_shape: [1, 0, 384, 384],
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_band_order() {
        let config = Config {
            band_order: Some(vec!["red".to_string(), String::new()]),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            band_order: Some(Vec::new()),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_config_rejected_before_model_load() {
        let config = Config {
            threshold: 2.0,
            model_path: PathBuf::from("does/not/exist.onnx"),
            ..Config::default()
        };
        assert!(matches!(
            Pipeline::new(config),
            Err(Error::InvalidParameter { .. })
        ));
    }
}
