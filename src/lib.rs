//! # satseg
//!
//! Cloud segmentation for four-band satellite scenes.
//!
//! Each spectral band of a scene is stored as its own single-channel PNG. The
//! bands are packed into one NCHW tensor, passed through a pre-trained ONNX
//! UNet, and the logits are thresholded into a black/white PNG mask.
//!
//! ## Example
//!
//! ```no_run
//! use satseg::{Config, Pipeline};
//!
//! # fn main() -> satseg::Result<()> {
//! let config = Config {
//!     input_dir: "scene_011_104".into(),
//!     ..Config::default()
//! };
//! let mut pipeline = Pipeline::new(config)?;
//!
//! let summary = pipeline.run()?;
//! println!("mask written to {}", summary.output_path.display());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod image;
pub mod model;
pub mod pipeline;

pub use error::{Error, Result};
pub use pipeline::{Config, Pipeline, Summary};
