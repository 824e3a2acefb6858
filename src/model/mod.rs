//! ONNX model loading and inference.

mod session;

pub use session::{check_input_len, resolve_input_shape, Model, ModelOptions, ModelOutput};

/// Input shape of the four-band cloud segmentation UNet (N, C, H, W).
pub const SATUNET_INPUT_SHAPE: [usize; 4] = [1, 4, 384, 384];
