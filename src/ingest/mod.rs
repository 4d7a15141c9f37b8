//! File ingestion: normalization and preview generation.
//!
//! Turning a selected file into a pending batch entry happens here:
//!
//! 1. **Normalize**: HEIC/HEIF is converted to JPEG, everything else
//!    passes through
//! 2. **Preview**: a thumbnail is generated from the normalized bytes
//! 3. The result becomes a [`PendingFile`] ready for the selection store
//!
//! A failure at either step skips that file (the conversion-error kind);
//! the rest of the batch is unaffected.

pub mod normalize;
pub mod preview;

use crate::config::ProcessingSettings;
use crate::domain::PendingFile;

// Re-export key types
pub use normalize::{needs_conversion, normalize, NormalizeError, NormalizedFile};
pub use preview::thumbnail;

/// Guess the declared MIME type from the file extension. HEIC/HEIF and
/// unknown extensions report empty, mirroring how browsers declare them.
pub fn guess_mime(name: &str) -> &'static str {
    let lower = name.to_ascii_lowercase();
    match lower.rsplit_once('.').map(|(_, ext)| ext) {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "",
    }
}

/// Build a pending entry from raw file bytes: normalize, then attach a
/// preview thumbnail.
pub fn prepare(
    name: &str,
    bytes: Vec<u8>,
    settings: &ProcessingSettings,
) -> Result<PendingFile, NormalizeError> {
    let declared_mime = guess_mime(name);
    let normalized = normalize(name, declared_mime, bytes, settings.jpeg_quality)?;
    let preview = thumbnail(&normalized.bytes, settings.preview_edge)?;
    Ok(PendingFile::new(
        normalized.name,
        normalized.mime,
        normalized.bytes,
        preview,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_mime() {
        assert_eq!(guess_mime("scan.JPG"), "image/jpeg");
        assert_eq!(guess_mime("scan.png"), "image/png");
        assert_eq!(guess_mime("IMG_0042.HEIC"), "");
        assert_eq!(guess_mime("noext"), "");
    }

    #[test]
    fn test_prepare_jpeg_keeps_mime() {
        use image::codecs::jpeg::JpegEncoder;
        use image::{DynamicImage, RgbImage};

        let img = DynamicImage::ImageRgb8(RgbImage::new(32, 32));
        let mut bytes = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut bytes, 90);
        img.write_with_encoder(encoder).unwrap();

        let settings = ProcessingSettings::default();
        let pending = prepare("scan.jpg", bytes, &settings).unwrap();
        assert_eq!(pending.mime, "image/jpeg");
        assert_eq!(pending.name, "scan.jpg");
        assert!(!pending.preview.is_empty());
    }
}
