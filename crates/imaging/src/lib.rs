use std::fs;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;

#[derive(Debug, thiserror::Error)]
pub enum ImagingError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),
}

pub type Result<T> = std::result::Result<T, ImagingError>;

/// Output constraints for a derived preview.
#[derive(Debug, Clone, Copy)]
pub struct ThumbnailSpec {
    /// Size of the longer edge, in pixels.
    pub max_dim: u32,
    /// JPEG quality factor, 0-100.
    pub quality: u8,
}

impl Default for ThumbnailSpec {
    fn default() -> Self {
        Self {
            max_dim: 150,
            quality: 60,
        }
    }
}

/// Scale `(width, height)` so the longer edge becomes `max_dim`.
/// Landscape and square sources constrain width, portrait sources height.
pub fn fit_within((width, height): (u32, u32), max_dim: u32) -> (u32, u32) {
    if width >= height {
        let scaled = (height as f64 * max_dim as f64 / width as f64).round() as u32;
        (max_dim, scaled.max(1))
    } else {
        let scaled = (width as f64 * max_dim as f64 / height as f64).round() as u32;
        (scaled.max(1), max_dim)
    }
}

/// Write a resized JPEG preview of `source` into `dest_dir`, named `{stem}.jpg`.
///
/// The destination directory is created if absent. Returns the written file
/// name; the caller decides how it becomes a public path.
pub fn write_thumbnail(
    source: &Path,
    dest_dir: &Path,
    stem: &str,
    spec: &ThumbnailSpec,
) -> Result<String> {
    let img = image::open(source).map_err(|e| ImagingError::Decode(e.to_string()))?;
    let (width, height) = fit_within((img.width(), img.height()), spec.max_dim);
    let resized = img.resize_exact(width, height, FilterType::Lanczos3).to_rgb8();

    fs::create_dir_all(dest_dir)?;
    let file_name = format!("{stem}.jpg");
    let file = fs::File::create(dest_dir.join(&file_name))?;
    let mut encoder = JpegEncoder::new_with_quality(BufWriter::new(file), spec.quality);
    encoder
        .encode_image(&resized)
        .map_err(|e| ImagingError::Encode(e.to_string()))?;

    Ok(file_name)
}

/// Write a flat gray placeholder preview, used when a record has no thumbnail.
pub fn write_placeholder(dest: &Path, dim: u32) -> Result<()> {
    let img = image::RgbImage::from_pixel(dim, dim, image::Rgb([200, 200, 200]));

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::File::create(dest)?;
    let mut encoder = JpegEncoder::new_with_quality(BufWriter::new(file), 80);
    encoder
        .encode_image(&img)
        .map_err(|e| ImagingError::Encode(e.to_string()))?;

    Ok(())
}

/// Re-encode an in-memory image as JPEG at the given quality.
pub fn reencode_preview(bytes: &[u8], quality: u8) -> Result<Vec<u8>> {
    let img = image::load_from_memory(bytes).map_err(|e| ImagingError::Decode(e.to_string()))?;
    let rgb = img.to_rgb8();

    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality);
    encoder
        .encode_image(&rgb)
        .map_err(|e| ImagingError::Encode(e.to_string()))?;

    Ok(out)
}
