//! Shrink images until they fit under a byte ceiling.
//!
//! The image is scaled so its longer side is at most [`MAX_DIMENSION`]
//! (never upscaled), then re-encoded as JPEG starting at
//! [`INITIAL_QUALITY`] and stepping down by [`QUALITY_STEP`] until the output
//! fits or [`QUALITY_FLOOR`] has been tried.

use crate::ImageError;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::RgbImage;
use tracing::debug;

/// Longest side, in pixels, of a normalized image.
pub const MAX_DIMENSION: u32 = 1024;
pub const INITIAL_QUALITY: u8 = 80;
pub const QUALITY_STEP: u8 = 10;
pub const QUALITY_FLOOR: u8 = 10;

/// Ceiling for a single image attachment before normalization kicks in.
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Output of [`normalize`].
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    /// JPEG bytes.
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// JPEG quality the bytes were encoded at.
    pub quality: u8,
}

/// Whether `buffer` is within `max_bytes`.
pub fn validate_size(buffer: &[u8], max_bytes: usize) -> bool {
    buffer.len() <= max_bytes
}

/// Target dimensions with the longer side capped at `max_side`, preserving
/// aspect ratio. Never returns a dimension larger than the input or smaller
/// than 1.
pub fn target_dimensions(width: u32, height: u32, max_side: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_side || longest == 0 {
        return (width, height);
    }
    let scale = f64::from(max_side) / f64::from(longest);
    let w = ((f64::from(width) * scale).round() as u32).clamp(1, width);
    let h = ((f64::from(height) * scale).round() as u32).clamp(1, height);
    (w, h)
}

/// Re-encode `buffer` as a JPEG no larger than `max_bytes`.
///
/// Fails with [`ImageError::Decode`] if the bytes are not a readable image
/// and with [`ImageError::Compression`] if even the quality floor is too big.
pub fn normalize(buffer: &[u8], max_bytes: usize) -> Result<NormalizedImage, ImageError> {
    let img = image::load_from_memory(buffer).map_err(|e| ImageError::Decode(e.to_string()))?;
    let (width, height) = (img.width(), img.height());
    let (target_w, target_h) = target_dimensions(width, height, MAX_DIMENSION);

    let resized: RgbImage = if (target_w, target_h) == (width, height) {
        img.to_rgb8()
    } else {
        img.resize_exact(target_w, target_h, FilterType::Lanczos3)
            .to_rgb8()
    };

    let mut smallest = usize::MAX;
    let mut quality = INITIAL_QUALITY;
    loop {
        let bytes = encode_jpeg(&resized, quality)?;
        debug!(
            "normalize: {}x{} -> {}x{} at q{}: {} bytes (limit {})",
            width,
            height,
            target_w,
            target_h,
            quality,
            bytes.len(),
            max_bytes
        );
        if bytes.len() <= max_bytes {
            return Ok(NormalizedImage {
                bytes,
                width: target_w,
                height: target_h,
                quality,
            });
        }
        smallest = smallest.min(bytes.len());
        if quality <= QUALITY_FLOOR {
            break;
        }
        quality = quality.saturating_sub(QUALITY_STEP).max(QUALITY_FLOOR);
    }

    Err(ImageError::Compression {
        max_bytes,
        smallest,
        floor: QUALITY_FLOOR,
    })
}

fn encode_jpeg(img: &RgbImage, quality: u8) -> Result<Vec<u8>, ImageError> {
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode_image(img)
        .map_err(|e| ImageError::Encode(e.to_string()))?;
    Ok(out)
}
