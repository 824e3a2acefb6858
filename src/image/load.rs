//! Band loading utilities.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::SAMPLE_SCALE;

/// A single decoded band: one float plane with its dimensions.
#[derive(Debug, Clone)]
pub struct Band {
    /// File name the band was loaded from.
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Row-major samples in [0, 1].
    pub data: Vec<f32>,
}

/// All bands of a scene, concatenated plane after plane.
#[derive(Debug, Clone, Default)]
pub struct BandStack {
    /// Flat buffer holding every plane in load order.
    pub data: Vec<f32>,
    /// Name and dimensions of each plane, in load order.
    pub bands: Vec<(String, u32, u32)>,
}

impl BandStack {
    /// Number of bands in the stack.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bands.len()
    }

    /// Whether no band was loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    fn push(&mut self, band: Band) {
        self.data.extend_from_slice(&band.data);
        self.bands.push((band.name, band.width, band.height));
    }
}

/// Whether the file name ends in `.png` (case-sensitive).
pub fn has_png_extension<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .file_name()
        .is_some_and(|name| name.as_encoded_bytes().ends_with(b".png"))
}

/// Load a PNG band as a float plane.
///
/// The file is decoded to 8-bit RGBA and the first channel of every pixel is
/// kept, scaled into [0, 1]. Single-band PNGs are expanded to RGBA by the
/// decoder, so this is the gray value of the band.
///
/// # Errors
///
/// Returns an error if the file cannot be read or decoded.
pub fn load_band<P: AsRef<Path>>(path: P) -> Result<Band> {
    let path = path.as_ref();

    let rgba = image::open(path)
        .map_err(|source| Error::ImageLoad {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgba8();

    tracing::debug!("{}: {} RGBA bytes", path.display(), rgba.as_raw().len());

    let (width, height) = rgba.dimensions();
    let data = rgba
        .pixels()
        .map(|pixel| f32::from(pixel[0]) / SAMPLE_SCALE)
        .collect();

    let name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

    Ok(Band {
        name,
        width,
        height,
        data,
    })
}

/// List the PNG bands in a folder.
///
/// Without a band order the files are sorted by name. With one, each file is
/// ranked by the first prefix its name starts with; files matching no prefix
/// come last, sorted by name.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn list_bands<P: AsRef<Path>>(dir: P, order: Option<&[String]>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let read_dir_err = |source| Error::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_dir_err)? {
        let entry = entry.map_err(read_dir_err)?;
        let path = entry.path();
        if path.is_file() && has_png_extension(&path) {
            paths.push(path);
        }
    }

    let file_name = |p: &PathBuf| {
        p.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    };

    match order {
        Some(prefixes) => paths.sort_by_cached_key(|p| {
            let name = file_name(p);
            let rank = prefixes
                .iter()
                .position(|prefix| name.starts_with(prefix.as_str()))
                .unwrap_or(prefixes.len());
            (rank, name)
        }),
        None => paths.sort_by_cached_key(file_name),
    }

    Ok(paths)
}

/// Load every PNG band in a folder into one flat buffer.
///
/// # Errors
///
/// Returns an error if the directory cannot be read or a band fails to load.
pub fn load_bands<P: AsRef<Path>>(dir: P, order: Option<&[String]>) -> Result<BandStack> {
    let mut stack = BandStack::default();

    for path in list_bands(dir, order)? {
        let band = load_band(&path)?;
        tracing::info!("Loaded {} ({}x{})", band.name, band.width, band.height);
        stack.push(band);
    }

    Ok(stack)
}
