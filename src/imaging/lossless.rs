//! Lossless suitability detection.
//!
//! Decides whether a re-encode should preserve pixels exactly. The signal is
//! the source's encoded density (bits per pixel) combined with whether the
//! source container was itself lossless:
//!
//! | Source | Rule |
//! |---|---|
//! | PNG | lossless below 8 bpp |
//! | WebP with a `VP8L` chunk | lossless below 8 bpp |
//! | JPEG | never lossless |
//! | anything else | lossless below 3 bpp |
//!
//! WebP is the only container where the answer depends on the bitstream, so
//! its RIFF chunk list is walked from the peeked header.

use super::params::SourceFormat;
use image::ImageFormat;

/// Density below which a natively lossless source stays lossless.
const NATIVE_LOSSLESS_MAX_BPP: f64 = 8.0;

/// Density below which any non-JPEG source is assumed to be flat artwork.
const FLAT_IMAGE_MAX_BPP: f64 = 3.0;

/// Outcome of walking a WebP header's chunk list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebpKind {
    /// Found a `VP8L` chunk.
    Lossless,
    /// Found a `VP8 ` chunk.
    Lossy,
    /// Not a RIFF/WEBP header, or the header ran out before either chunk.
    Undetermined,
}

/// Classify a WebP file from its leading bytes.
///
/// Verifies the `RIFF....WEBP` signature, then walks `(tag, little-endian
/// length)` chunk headers until a bitstream chunk is found. Chunk payloads are
/// padded to an even length as RIFF requires. Extended files (`VP8X`) carry
/// their bitstream chunk after metadata chunks, which is why this walks rather
/// than inspecting only the first tag.
pub fn webp_kind(header: &[u8]) -> WebpKind {
    if header.len() < 12 || &header[0..4] != b"RIFF" || &header[8..12] != b"WEBP" {
        return WebpKind::Undetermined;
    }

    let mut offset = 12usize;
    while let Some(chunk) = offset
        .checked_add(8)
        .and_then(|end| header.get(offset..end))
    {
        match &chunk[0..4] {
            b"VP8L" => return WebpKind::Lossless,
            b"VP8 " => return WebpKind::Lossy,
            _ => {}
        }

        let len = u32::from_le_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]) as usize;
        let padded = len + (len & 1);
        offset = match offset.checked_add(8 + padded) {
            Some(next) => next,
            None => break,
        };
    }

    WebpKind::Undetermined
}

/// Encoded density of the source in bits per pixel.
///
/// Returns `None` for an empty image.
pub fn bits_per_pixel(original_bytes: u64, dimensions: (u32, u32)) -> Option<f64> {
    let pixels = u64::from(dimensions.0) * u64::from(dimensions.1);
    if pixels == 0 {
        return None;
    }
    Some((original_bytes * 8) as f64 / pixels as f64)
}

/// Should a source with these properties be re-encoded losslessly?
///
/// # Arguments
/// * `format` - Format detected while decoding the source
/// * `original_bytes` - Encoded size of the source
/// * `dimensions` - Source dimensions before any resize
/// * `header` - Leading bytes of the source (up to 512)
pub fn should_encode_lossless(
    format: SourceFormat,
    original_bytes: u64,
    dimensions: (u32, u32),
    header: &[u8],
) -> bool {
    let Some(bpp) = bits_per_pixel(original_bytes, dimensions) else {
        return false;
    };

    let native_lossless = match format {
        SourceFormat::Image(ImageFormat::Jpeg) => return false,
        SourceFormat::Image(ImageFormat::Png) => true,
        SourceFormat::Image(ImageFormat::WebP) => webp_kind(header) == WebpKind::Lossless,
        _ => false,
    };

    (native_lossless && bpp < NATIVE_LOSSLESS_MAX_BPP) || bpp < FLAT_IMAGE_MAX_BPP
}
