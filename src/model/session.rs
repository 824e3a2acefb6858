//! Inference session wrapper for the segmentation model.

use std::fmt;
use std::path::{Path, PathBuf};

use ndarray::Array4;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, ValueType};

use crate::error::{Error, Result};

use super::SATUNET_INPUT_SHAPE;

/// Session settings.
#[derive(Debug, Clone)]
pub struct ModelOptions {
    /// Threads used inside a single operator.
    pub intra_threads: usize,
    /// Shape the model input must resolve to (N, C, H, W).
    pub input_shape: [usize; 4],
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            intra_threads: 1,
            input_shape: SATUNET_INPUT_SHAPE,
        }
    }
}

/// Raw output tensor of the model.
#[derive(Debug, Clone)]
pub struct ModelOutput {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl ModelOutput {
    /// Width of the output plane (last dimension).
    ///
    /// # Errors
    ///
    /// Returns an error if the output has fewer than two dimensions.
    pub fn width(&self) -> Result<u32> {
        self.plane_dim(1)
    }

    /// Height of the output plane (second-to-last dimension).
    ///
    /// # Errors
    ///
    /// Returns an error if the output has fewer than two dimensions.
    pub fn height(&self) -> Result<u32> {
        self.plane_dim(2)
    }

    fn plane_dim(&self, from_end: usize) -> Result<u32> {
        let mismatch = || Error::ShapeMismatch {
            expected: "at least 2D output".to_string(),
            actual: format!("{:?}", self.shape),
        };
        if self.shape.len() < 2 {
            return Err(mismatch());
        }
        let dim = self.shape[self.shape.len() - from_end];
        u32::try_from(dim).map_err(|_| mismatch())
    }
}

impl fmt::Display for ModelOutput {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let dims: Vec<String> = self.shape.iter().map(ToString::to_string).collect();
        write!(f, "[{}]", dims.join(", "))
    }
}

/// Check that a flat buffer of `len` values fills an input of `shape`.
///
/// # Errors
///
/// Returns [`Error::InputSize`] if the lengths differ.
pub fn check_input_len(shape: [usize; 4], len: usize) -> Result<()> {
    let expected: usize = shape.iter().product();
    if len != expected {
        return Err(Error::InputSize {
            expected,
            actual: len,
        });
    }
    Ok(())
}

/// Check a declared model input shape against the expected one.
///
/// A dynamic batch dimension (`-1`) is treated as a batch of one.
///
/// # Errors
///
/// Returns [`Error::InvalidInputShape`] if the shapes differ.
pub fn resolve_input_shape(declared: &[i64], expected: [usize; 4]) -> Result<[usize; 4]> {
    let mut resolved = declared.to_vec();
    if resolved.first() == Some(&-1) {
        resolved[0] = 1;
    }

    let expected_dims: Vec<i64> = expected
        .iter()
        .map(|&d| i64::try_from(d).unwrap_or(i64::MAX))
        .collect();

    if resolved != expected_dims {
        return Err(Error::InvalidInputShape {
            expected: expected_dims,
            actual: declared.to_vec(),
        });
    }

    Ok(expected)
}

/// A loaded segmentation model.
pub struct Model {
    session: Session,
    path: PathBuf,
    input_name: String,
    output_name: String,
    input_shape: [usize; 4],
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Model {}: input_name: {}, output_name: {}",
            self.path.display(),
            self.input_name,
            self.output_name
        )
    }
}

impl Model {
    /// Load an ONNX model and check its input against `options.input_shape`.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be loaded, lacks an input or
    /// output, or declares an unexpected input shape.
    pub fn load<P: AsRef<Path>>(path: P, options: &ModelOptions) -> Result<Self> {
        let path = path.as_ref();
        let load_err = |source| Error::ModelLoad {
            path: path.to_path_buf(),
            source,
        };

        let session = Session::builder()
            .map_err(load_err)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(load_err)?
            .with_intra_threads(options.intra_threads)
            .map_err(load_err)?
            .commit_from_file(path)
            .map_err(load_err)?;

        let input = session.inputs.first().ok_or_else(|| Error::ShapeMismatch {
            expected: "one model input".to_string(),
            actual: "no input".to_string(),
        })?;
        let output = session.outputs.first().ok_or_else(|| Error::ShapeMismatch {
            expected: "one model output".to_string(),
            actual: "no output".to_string(),
        })?;

        let declared: Vec<i64> = match &input.input_type {
            ValueType::Tensor { shape, .. } => shape.iter().copied().collect(),
            other => {
                return Err(Error::ShapeMismatch {
                    expected: "tensor input".to_string(),
                    actual: format!("{other:?}"),
                })
            }
        };
        let input_shape = resolve_input_shape(&declared, options.input_shape)?;

        let input_name = input.name.clone();
        let output_name = output.name.clone();

        let model = Self {
            session,
            path: path.to_path_buf(),
            input_name,
            output_name,
            input_shape,
        };
        tracing::debug!("{model}");

        Ok(model)
    }

    /// Number of values the input tensor holds.
    #[must_use]
    pub fn input_len(&self) -> usize {
        self.input_shape.iter().product()
    }

    /// Run the model on a flat NCHW buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer does not match the input shape or
    /// inference fails.
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    pub fn infer(&mut self, data: &[f32]) -> Result<ModelOutput> {
        check_input_len(self.input_shape, data.len())?;

        let [n, c, h, w] = self.input_shape;
        let array = Array4::from_shape_vec((n, c, h, w), data.to_vec()).map_err(|err| {
            Error::ShapeMismatch {
                expected: format!("{:?}", self.input_shape),
                actual: err.to_string(),
            }
        })?;
        let input_value = Tensor::from_array(array).map_err(|source| Error::Inference { source })?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input_value])
            .map_err(|source| Error::Inference { source })?;

        let output = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| Error::ShapeMismatch {
                expected: format!("output {}", self.output_name),
                actual: "no output".to_string(),
            })?;

        let (shape_info, values) = output
            .try_extract_tensor::<f32>()
            .map_err(|source| Error::Inference { source })?;

        // Safe: tensor dimensions are always non-negative and within bounds
        let shape: Vec<usize> = shape_info.iter().map(|&d| d as usize).collect();

        let result = ModelOutput {
            shape,
            data: values.to_vec(),
        };
        tracing::info!("Output tensor shape: {result}");

        Ok(result)
    }
}
