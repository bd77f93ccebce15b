//! Thumbnail and full-image asset generation for tours.
//!
//! [`ImageProcessor`] keeps the tour pipeline independent from the codec
//! stack; [`ImageCrateProcessor`] is the production implementation on top of
//! the `image` crate.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::fs;
use std::io::BufWriter;
use std::path::Path;
use thiserror::Error;

pub const THUMBNAIL_QUALITY: u8 = 85;

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image processing failed: {0}")]
    Processing(String),
}

pub trait ImageProcessor {
    /// Writes a JPEG at `dest` whose longest side is at most `max_side`.
    fn thumbnail(&self, source: &Path, dest: &Path, max_side: u32) -> Result<(), ImagingError>;

    /// Copies the original bytes to `dest`.
    fn full_copy(&self, source: &Path, dest: &Path) -> Result<(), ImagingError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateProcessor;

impl ImageCrateProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl ImageProcessor for ImageCrateProcessor {
    fn thumbnail(&self, source: &Path, dest: &Path, max_side: u32) -> Result<(), ImagingError> {
        let img = load_image(source)?;
        let resized = if img.width() > max_side || img.height() > max_side {
            img.resize(max_side, max_side, FilterType::Lanczos3)
        } else {
            img
        };
        save_jpeg(&resized, dest)
    }

    fn full_copy(&self, source: &Path, dest: &Path) -> Result<(), ImagingError> {
        fs::copy(source, dest)?;
        Ok(())
    }
}

fn load_image(path: &Path) -> Result<DynamicImage, ImagingError> {
    ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| {
            ImagingError::Processing(format!("failed to decode {}: {e}", path.display()))
        })
}

fn save_jpeg(img: &DynamicImage, dest: &Path) -> Result<(), ImagingError> {
    let writer = BufWriter::new(fs::File::create(dest)?);
    let encoder = JpegEncoder::new_with_quality(writer, THUMBNAIL_QUALITY);
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(encoder)
        .map_err(|e| ImagingError::Processing(format!("failed to encode {}: {e}", dest.display())))
}
