//! The resize/encode decision pipeline.
//!
//! ```text
//! peek header ─► decode (counting bytes) ─► skip? ─► fit ─► pad square?
//!     ─► lossless? ─► quality ─► codec ─► regression guard ─► bytes
//! ```
//!
//! The pipeline never writes anywhere. It either hands back encoded bytes or
//! tells the caller to serve the original ([`Resized::Unchanged`]), which
//! happens when:
//!
//! - the source is already in the output format and no larger than requested;
//! - a same-format re-encode came out no smaller than the source.

use super::calculations::{center_offset, quality_by_size};
use super::codec::Codec;
use super::decode::{Decoded, decode_source};
use super::error::ImagingError;
use super::lossless::should_encode_lossless;
use super::params::{OutputFormat, Quality, SourceFormat};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use std::io::{Read, Seek, SeekFrom};
use tracing::debug;

/// How many leading bytes are kept for container inspection.
pub const HEADER_PEEK_LEN: usize = 512;

/// Background of the square canvas: opaque black.
const SQUARE_BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Output format and quality bounds, read once per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodePolicy {
    pub format: OutputFormat,
    pub min_quality: Quality,
    pub max_quality: Quality,
}

impl Default for EncodePolicy {
    fn default() -> Self {
        Self {
            format: OutputFormat::Webp,
            min_quality: Quality::new(60),
            max_quality: Quality::new(90),
        }
    }
}

/// How one artwork request gets encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingDecision {
    pub lossless: bool,
    pub quality: Quality,
    pub codec: Codec,
}

impl EncodingDecision {
    /// Decide codec and quality for a source.
    ///
    /// `dimensions` are the source's, before any resize. Lossless encodes always
    /// run at maximum quality; lossy quality scales with the requested size,
    /// capped by the source's own edge.
    pub fn decide(
        policy: &EncodePolicy,
        source_format: SourceFormat,
        original_bytes: u64,
        dimensions: (u32, u32),
        header: &[u8],
        size: u32,
    ) -> Self {
        let lossless = should_encode_lossless(source_format, original_bytes, dimensions, header);
        let codec = policy.format.codecs().select(lossless);
        let quality = if lossless {
            Quality::MAX
        } else {
            let original_size = dimensions.0.max(dimensions.1);
            quality_by_size(
                size,
                size.min(original_size),
                policy.min_quality,
                policy.max_quality,
            )
        };
        Self {
            lossless,
            quality,
            codec,
        }
    }
}

/// Result of a successful pipeline run.
#[derive(Debug)]
pub enum Resized {
    /// Serve the original bytes.
    Unchanged { original_size: u32 },
    Encoded {
        bytes: Vec<u8>,
        original_size: u32,
        decision: EncodingDecision,
    },
}

impl Resized {
    /// Largest edge of the source image.
    pub fn original_size(&self) -> u32 {
        match self {
            Resized::Unchanged { original_size } | Resized::Encoded { original_size, .. } => {
                *original_size
            }
        }
    }
}

/// Resize `source` to fit a `size` × `size` box and re-encode it per `policy`.
///
/// The stream is read from its current position. `size == 0` means the native
/// size and always yields [`Resized::Unchanged`].
///
/// On an encoder failure the returned [`ImagingError::Encode`] still carries
/// the partial buffer and the source's largest edge.
pub fn resize_image<R: Read + Seek>(
    mut source: R,
    size: u32,
    square: bool,
    policy: &EncodePolicy,
) -> Result<Resized, ImagingError> {
    let header = peek_header(&mut source)?;

    let Decoded {
        image: original,
        format,
        bytes_read: original_bytes,
    } = decode_source(source, &header)?;

    let dimensions = original.dimensions();
    let original_size = dimensions.0.max(dimensions.1);
    let same_format = policy.format.matches(format);

    if size == 0 || (same_format && original_size <= size) {
        return Ok(Resized::Unchanged { original_size });
    }

    let mut resized = if original_size <= size {
        original
    } else {
        original.resize(size, size, FilterType::Lanczos3)
    };

    if square && dimensions.0 != dimensions.1 {
        resized = pad_to_square(&resized, size);
    }

    let decision =
        EncodingDecision::decide(policy, format, original_bytes, dimensions, &header, size);
    debug!(
        source_format = ?format,
        original_bytes,
        original_size,
        size,
        square,
        lossless = decision.lossless,
        quality = decision.quality.value(),
        codec = %decision.codec,
        "Encoding artwork"
    );

    let mut bytes = Vec::new();
    let encoded = decision.codec.encode(&resized, decision.quality, &mut bytes);

    if same_format && bytes.len() as u64 >= original_bytes {
        debug!(
            encoded = bytes.len(),
            original_bytes, "Re-encode not smaller than original, discarding"
        );
        return Ok(Resized::Unchanged { original_size });
    }

    match encoded {
        Ok(()) => Ok(Resized::Encoded {
            bytes,
            original_size,
            decision,
        }),
        Err(source) => Err(ImagingError::Encode {
            codec: decision.codec,
            source,
            partial: bytes,
            original_size,
        }),
    }
}

/// Read up to [`HEADER_PEEK_LEN`] bytes, then rewind to where the stream was.
fn peek_header<R: Read + Seek>(source: &mut R) -> Result<Vec<u8>, ImagingError> {
    let start = source.stream_position()?;
    let mut header = Vec::with_capacity(HEADER_PEEK_LEN);
    source
        .by_ref()
        .take(HEADER_PEEK_LEN as u64)
        .read_to_end(&mut header)?;
    source.seek(SeekFrom::Start(start))?;
    Ok(header)
}

/// Center `img` on an opaque `side` × `side` canvas.
fn pad_to_square(img: &DynamicImage, side: u32) -> DynamicImage {
    let mut canvas = RgbaImage::from_pixel(side, side, SQUARE_BACKGROUND);
    let (x, y) = center_offset(side, img.dimensions());
    imageops::overlay(&mut canvas, &img.to_rgba8(), x, y);
    DynamicImage::ImageRgba8(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{binary_noise_image, encode_as, gradient_image, level_noise_image};
    use image::ImageFormat;
    use std::io::Cursor;

    fn policy(format: OutputFormat) -> EncodePolicy {
        EncodePolicy {
            format,
            min_quality: Quality::new(50),
            max_quality: Quality::new(90),
        }
    }

    fn run(bytes: Vec<u8>, size: u32, square: bool, format: OutputFormat) -> Resized {
        resize_image(Cursor::new(bytes), size, square, &policy(format)).unwrap()
    }

    fn decode(bytes: &[u8]) -> DynamicImage {
        image::load_from_memory(bytes).unwrap()
    }

    // =========================================================================
    // Skip conditions
    // =========================================================================

    #[test]
    fn same_format_not_larger_than_request_is_unchanged() {
        let png = encode_as(&gradient_image(500, 500), ImageFormat::Png);
        let result = run(png, 800, false, OutputFormat::Png);
        assert!(matches!(result, Resized::Unchanged { original_size: 500 }));
    }

    #[test]
    fn same_format_equal_to_request_is_unchanged() {
        let jpeg = encode_as(&gradient_image(300, 200), ImageFormat::Jpeg);
        let result = run(jpeg, 300, true, OutputFormat::Jpeg);
        assert!(matches!(result, Resized::Unchanged { original_size: 300 }));
    }

    #[test]
    fn zero_size_is_unchanged() {
        let jpeg = encode_as(&gradient_image(64, 64), ImageFormat::Jpeg);
        let result = run(jpeg, 0, false, OutputFormat::Webp);
        assert!(matches!(result, Resized::Unchanged { original_size: 64 }));
    }

    #[test]
    fn same_format_regression_is_unchanged() {
        // Two-level noise compresses to ~1-2 bpp as PNG; Lanczos resampling
        // turns it into full-range grays that cannot compress that well.
        let png = encode_as(&binary_noise_image(500, 500, 7), ImageFormat::Png);
        let result = run(png, 450, false, OutputFormat::Png);
        assert!(matches!(result, Resized::Unchanged { original_size: 500 }));
    }

    // =========================================================================
    // Resizing
    // =========================================================================

    #[test]
    fn large_jpeg_to_lossy_webp_at_max_quality() {
        let jpeg = encode_as(&gradient_image(800, 600), ImageFormat::Jpeg);
        let result = run(jpeg, 300, false, OutputFormat::Webp);

        let Resized::Encoded {
            bytes,
            original_size,
            decision,
        } = result
        else {
            panic!("expected an encoded result");
        };
        assert_eq!(original_size, 800);
        assert_eq!(decision.codec, Codec::WebpLossy);
        assert!(!decision.lossless);
        // bound = min(300, 800) = 300 → request at bound → max quality
        assert_eq!(decision.quality, Quality::new(90));

        let out = decode(&bytes);
        assert_eq!((out.width(), out.height()), (300, 225));
    }

    #[test]
    fn smaller_source_is_converted_without_resizing() {
        let png = encode_as(&gradient_image(200, 120), ImageFormat::Png);
        let result = run(png, 400, false, OutputFormat::Webp);

        let Resized::Encoded {
            bytes, decision, ..
        } = result
        else {
            panic!("expected an encoded result");
        };
        // Gradient PNG is well under 8 bpp → lossless
        assert!(decision.lossless);
        assert_eq!(decision.codec, Codec::WebpLossless);
        let out = decode(&bytes);
        assert_eq!((out.width(), out.height()), (200, 120));
    }

    #[test]
    fn portrait_fits_within_box() {
        let jpeg = encode_as(&gradient_image(300, 600), ImageFormat::Jpeg);
        let Resized::Encoded { bytes, .. } = run(jpeg, 200, false, OutputFormat::Jpeg) else {
            panic!("expected an encoded result");
        };
        let out = decode(&bytes);
        assert_eq!((out.width(), out.height()), (100, 200));
    }

    // =========================================================================
    // Square padding
    // =========================================================================

    #[test]
    fn square_request_pads_non_square_source() {
        let jpeg = encode_as(&gradient_image(400, 300), ImageFormat::Jpeg);
        let Resized::Encoded { bytes, .. } = run(jpeg, 200, true, OutputFormat::Png) else {
            panic!("expected an encoded result");
        };
        let out = decode(&bytes);
        assert_eq!((out.width(), out.height()), (200, 200));
    }

    #[test]
    fn square_padding_is_opaque_black() {
        let padded = pad_to_square(&gradient_image(100, 50), 100).to_rgba8();
        assert_eq!(padded.dimensions(), (100, 100));
        assert_eq!(*padded.get_pixel(50, 0), SQUARE_BACKGROUND);
        assert_eq!(*padded.get_pixel(50, 99), SQUARE_BACKGROUND);
        assert_ne!(*padded.get_pixel(50, 50), SQUARE_BACKGROUND);
    }

    #[test]
    fn square_request_on_square_source_is_not_padded() {
        let jpeg = encode_as(&gradient_image(400, 400), ImageFormat::Jpeg);
        let Resized::Encoded { bytes, .. } = run(jpeg, 100, true, OutputFormat::Webp) else {
            panic!("expected an encoded result");
        };
        let out = decode(&bytes);
        assert_eq!((out.width(), out.height()), (100, 100));
    }

    #[test]
    fn small_source_is_centered_on_requested_canvas() {
        let png = encode_as(&gradient_image(120, 80), ImageFormat::Png);
        let Resized::Encoded { bytes, .. } = run(png, 300, true, OutputFormat::Webp) else {
            panic!("expected an encoded result");
        };
        let out = decode(&bytes);
        assert_eq!((out.width(), out.height()), (300, 300));
    }

    // =========================================================================
    // AVIF and lossless WebP sources
    // =========================================================================

    fn encode_with(codec: Codec, img: &DynamicImage) -> Vec<u8> {
        let mut out = Vec::new();
        codec.encode(img, Quality::new(80), &mut out).unwrap();
        out
    }

    #[test]
    fn avif_within_request_is_unchanged_for_avif_output() {
        let avif = encode_with(Codec::Avif, &gradient_image(64, 64));
        let result = run(avif, 800, false, OutputFormat::Avif);
        assert!(matches!(result, Resized::Unchanged { original_size: 64 }));
    }

    #[test]
    fn large_avif_is_downscaled() {
        let avif = encode_with(Codec::Avif, &gradient_image(64, 48));
        let Resized::Encoded {
            bytes,
            original_size,
            decision,
        } = run(avif, 32, false, OutputFormat::Webp)
        else {
            panic!("expected an encoded result");
        };
        assert_eq!(original_size, 64);
        assert!(matches!(decision.codec, Codec::WebpLossless | Codec::WebpLossy));
        let out = decode(&bytes);
        assert_eq!((out.width(), out.height()), (32, 24));
    }

    /// A lossless WebP denser than 3 bpp but below 8 bpp, so only the VP8L
    /// bitstream makes it a lossless candidate.
    fn mid_density_lossless_webp() -> Vec<u8> {
        let pixels = 128.0 * 128.0;
        [4u8, 8, 16, 32, 64]
            .into_iter()
            .map(|levels| {
                encode_with(
                    Codec::WebpLossless,
                    &level_noise_image(128, 128, levels, 11),
                )
            })
            .find(|webp| (3.5..7.5).contains(&(webp.len() as f64 * 8.0 / pixels)))
            .expect("no noise level lands between 3.5 and 7.5 bpp")
    }

    #[test]
    fn lossless_webp_source_stays_lossless() {
        let webp = mid_density_lossless_webp();
        let Resized::Encoded { decision, .. } = run(webp, 64, false, OutputFormat::Jpeg) else {
            panic!("expected an encoded result");
        };
        assert!(decision.lossless);
        assert_eq!(decision.codec, Codec::WebpLossless);
        assert_eq!(decision.quality, Quality::MAX);
    }

    #[test]
    fn vp8_header_at_same_density_is_lossy() {
        let webp = mid_density_lossless_webp();
        let header = &webp[..webp.len().min(HEADER_PEEK_LEN)];
        let tag = header
            .windows(4)
            .position(|w| w == b"VP8L")
            .expect("lossless encode has a VP8L chunk");
        let mut lossy_header = header.to_vec();
        lossy_header[tag..tag + 4].copy_from_slice(b"VP8 ");

        let policy = policy(OutputFormat::Jpeg);
        let decide = |h: &[u8]| {
            EncodingDecision::decide(
                &policy,
                ImageFormat::WebP.into(),
                webp.len() as u64,
                (128, 128),
                h,
                64,
            )
        };
        assert!(decide(header).lossless);
        assert!(!decide(&lossy_header).lossless);
    }

    // =========================================================================
    // Decisions
    // =========================================================================

    #[test]
    fn decision_uses_source_edge_as_quality_bound() {
        let policy = policy(OutputFormat::Avif);
        let decide = |size| {
            let jpeg = ImageFormat::Jpeg.into();
            EncodingDecision::decide(&policy, jpeg, 500_000, (1000, 800), &[], size)
        };

        // bound = min(2000, 1000) = 1000, request beyond it
        let d = decide(2000);
        assert_eq!(d.codec, Codec::Avif);
        assert_eq!(d.quality, Quality::new(90));

        // bound = min(650, 1000) = 650, request at the bound
        assert_eq!(decide(650).quality, Quality::new(90));

        // small thumbnail
        assert_eq!(decide(250).quality, Quality::new(50));
    }

    #[test]
    fn lossless_decision_runs_at_max_quality() {
        let policy = policy(OutputFormat::Jpeg);
        let png = ImageFormat::Png.into();
        let d = EncodingDecision::decide(&policy, png, 1_000, (100, 100), &[], 50);
        assert!(d.lossless);
        assert_eq!(d.quality, Quality::MAX);
        assert_eq!(d.codec, Codec::WebpLossless);
    }

    // =========================================================================
    // Failures
    // =========================================================================

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = resize_image(
            Cursor::new(b"definitely not an image".to_vec()),
            300,
            false,
            &policy(OutputFormat::Webp),
        )
        .unwrap_err();
        assert!(matches!(err, ImagingError::Decode(_)));
        assert_eq!(err.original_size(), None);
    }

    #[test]
    fn truncated_image_fails_to_decode() {
        let mut png = encode_as(&gradient_image(64, 64), ImageFormat::Png);
        png.truncate(png.len() / 2);
        let err = resize_image(Cursor::new(png), 32, false, &policy(OutputFormat::Webp))
            .unwrap_err();
        assert!(matches!(err, ImagingError::Decode(_)));
    }

    #[cfg(not(feature = "jxl"))]
    #[test]
    fn unavailable_codec_reports_encode_error_with_original_size() {
        let jpeg = encode_as(&gradient_image(120, 90), ImageFormat::Jpeg);
        let err = resize_image(Cursor::new(jpeg), 60, false, &policy(OutputFormat::Jxl))
            .unwrap_err();
        assert!(matches!(err, ImagingError::Encode { codec: Codec::Jxl, .. }));
        assert_eq!(err.original_size(), Some(120));
    }

    // =========================================================================
    // Stream handling
    // =========================================================================

    #[test]
    fn reads_from_current_stream_position() {
        let jpeg = encode_as(&gradient_image(200, 100), ImageFormat::Jpeg);
        let mut padded = vec![0xAA; 37];
        padded.extend_from_slice(&jpeg);
        let mut cursor = Cursor::new(padded);
        cursor.seek(SeekFrom::Start(37)).unwrap();

        let result = resize_image(cursor, 50, false, &policy(OutputFormat::Webp)).unwrap();
        assert_eq!(result.original_size(), 200);
    }

    #[test]
    fn peek_rewinds_stream() {
        let mut cursor = Cursor::new(vec![9u8; 2000]);
        let header = peek_header(&mut cursor).unwrap();
        assert_eq!(header.len(), HEADER_PEEK_LEN);
        assert_eq!(cursor.position(), 0);

        let mut short = Cursor::new(vec![1u8; 10]);
        assert_eq!(peek_header(&mut short).unwrap().len(), 10);
        assert_eq!(short.position(), 0);
    }
}
