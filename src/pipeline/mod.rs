//! Band-to-mask segmentation pipeline.

mod segment;

pub use segment::{check_band_layout, Config, Pipeline, Summary};
