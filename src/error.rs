//! Custom error types for satseg.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the satseg library.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to load or decode a band image.
    #[error("failed to load image from {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Failed to encode or write the mask image.
    #[error("failed to save image to {path}: {source}")]
    ImageSave {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The input folder could not be listed.
    #[error("cannot open directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to load an ONNX model.
    #[error("failed to load ONNX model {path}: {source}")]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: ort::Error,
    },

    /// The model does not declare the expected tensor input.
    #[error("invalid input shape: expected {expected:?}, model declares {actual:?}")]
    InvalidInputShape { expected: Vec<i64>, actual: Vec<i64> },

    /// The packed band buffer does not fill the input tensor.
    #[error("input buffer holds {actual} values, model expects {expected}")]
    InputSize { expected: usize, actual: usize },

    /// Model inference failed.
    #[error("model inference failed: {source}")]
    Inference {
        #[source]
        source: ort::Error,
    },

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Shape mismatch in tensor operations.
    #[error("tensor shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },
}

/// Result type alias for satseg operations.
pub type Result<T> = std::result::Result<T, Error>;
