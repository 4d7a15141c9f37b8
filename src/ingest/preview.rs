//! Preview thumbnail generation for pending files.

use image::codecs::jpeg::JpegEncoder;

use super::normalize::NormalizeError;

/// Quality for preview thumbnails; they are display-only.
const PREVIEW_QUALITY: u8 = 80;

/// Generate a JPEG thumbnail whose longest edge is at most `edge` pixels.
pub fn thumbnail(bytes: &[u8], edge: u32) -> Result<Vec<u8>, NormalizeError> {
    let img = image::load_from_memory(bytes).map_err(NormalizeError::Preview)?;
    let thumb = img.thumbnail(edge, edge);

    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, PREVIEW_QUALITY);
    thumb
        .write_with_encoder(encoder)
        .map_err(NormalizeError::Preview)?;
    Ok(out)
}
