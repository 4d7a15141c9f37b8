//! Image format normalization.
//!
//! HEIC/HEIF files (which arrive with an empty declared MIME type or a
//! telltale extension) are converted to JPEG before anything else touches
//! them; every other file passes through unchanged. The transform is
//! pure and idempotent: a failed conversion skips the file, never the
//! batch.

use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};
use thiserror::Error;
use tracing::debug;

/// Errors from format normalization (the conversion-error kind).
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("failed to decode HEIC data: {0}")]
    Heif(#[from] libheif_rs::HeifError),

    #[error("HEIC image has no interleaved pixel data")]
    MissingPlane,

    #[error("failed to encode JPEG: {0}")]
    Encode(#[source] image::ImageError),

    #[error("failed to generate preview: {0}")]
    Preview(#[source] image::ImageError),
}

/// A file after normalization: name, MIME, and bytes ready for the
/// vision model and the blob store.
#[derive(Debug, Clone)]
pub struct NormalizedFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Whether a file must be routed through HEIC conversion: its declared
/// MIME type is empty (browsers and MIME tables alike punt on HEIC) or
/// its name carries a HEIC/HEIF extension.
pub fn needs_conversion(name: &str, declared_mime: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    declared_mime.is_empty() || lower.ends_with(".heic") || lower.ends_with(".heif")
}

/// Normalize one file: convert HEIC/HEIF to JPEG at `jpeg_quality`,
/// pass everything else through unchanged.
pub fn normalize(
    name: &str,
    declared_mime: &str,
    bytes: Vec<u8>,
    jpeg_quality: u8,
) -> Result<NormalizedFile, NormalizeError> {
    if !needs_conversion(name, declared_mime) {
        return Ok(NormalizedFile {
            name: name.to_string(),
            mime: declared_mime.to_string(),
            bytes,
        });
    }

    debug!(%name, "Converting HEIC image to JPEG");
    let jpeg = convert_heic_to_jpeg(&bytes, jpeg_quality)?;
    Ok(NormalizedFile {
        name: jpeg_file_name(name),
        mime: "image/jpeg".to_string(),
        bytes: jpeg,
    })
}

/// Decode a HEIC/HEIF blob and re-encode it as JPEG.
fn convert_heic_to_jpeg(bytes: &[u8], quality: u8) -> Result<Vec<u8>, NormalizeError> {
    let lib_heif = LibHeif::new();
    let context = HeifContext::read_from_bytes(bytes)?;
    let handle = context.primary_image_handle()?;
    let decoded = lib_heif.decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)?;

    let width = decoded.width();
    let height = decoded.height();
    let planes = decoded.planes();
    let plane = planes.interleaved.ok_or(NormalizeError::MissingPlane)?;

    // The decoded rows may be padded; copy them out stride-aware.
    let row_bytes = width as usize * 3;
    let mut raw = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * plane.stride;
        raw.extend_from_slice(&plane.data[start..start + row_bytes]);
    }

    let rgb = RgbImage::from_raw(width, height, raw).ok_or(NormalizeError::MissingPlane)?;

    let mut jpeg = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut jpeg, quality);
    rgb.write_with_encoder(encoder)
        .map_err(NormalizeError::Encode)?;
    Ok(jpeg)
}

/// Swap the extension for .jpg after conversion.
fn jpeg_file_name(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => format!("{}.jpg", stem),
        _ => format!("{}.jpg", name),
    }
}
