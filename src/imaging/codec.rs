//! Output codecs and the format → codec table.
//!
//! ## Crate mapping
//!
//! | Codec | Crate / function |
//! |---|---|
//! | PNG | `image::codecs::png::PngEncoder` |
//! | JPEG | `image::codecs::jpeg::JpegEncoder` (alpha dropped) |
//! | WebP lossless | `image::codecs::webp::WebPEncoder::new_lossless` (pure Rust) |
//! | WebP lossy | `webp` crate (libwebp) |
//! | AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) |
//! | JPEG XL | `jpegxl-rs` (libjxl), behind the `jxl` feature |
//!
//! Each [`OutputFormat`] maps to one lossless and one lossy codec in
//! [`OutputFormat::codecs`]. Formats without a useful mode of one kind borrow
//! another codec for it, so the table is the single place that policy lives.

use super::error::CodecError;
use super::params::{OutputFormat, Quality};
use image::DynamicImage;
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use std::borrow::Cow;
use std::fmt;

/// rav1e speed preset: 6 keeps per-request encodes in the sub-second range
/// for cover-sized images.
const AVIF_SPEED: u8 = 6;

/// A concrete encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    Png,
    Jpeg,
    WebpLossless,
    WebpLossy,
    Avif,
    JxlLossless,
    Jxl,
}

/// Lossless and lossy codec for one output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecPair {
    pub lossless: Codec,
    pub lossy: Codec,
}

impl CodecPair {
    pub fn select(self, lossless: bool) -> Codec {
        if lossless { self.lossless } else { self.lossy }
    }
}

impl OutputFormat {
    pub fn codecs(self) -> CodecPair {
        use Codec::*;
        let (lossless, lossy) = match self {
            OutputFormat::Webp => (WebpLossless, WebpLossy),
            OutputFormat::Jxl => (JxlLossless, Jxl),
            // Lossless AVIF is larger than lossless WebP for flat artwork.
            OutputFormat::Avif => (WebpLossless, Avif),
            // PNG has no lossy mode.
            OutputFormat::Png => (Png, Jpeg),
            // JPEG has no lossless mode.
            OutputFormat::Jpeg => (WebpLossless, Jpeg),
        };
        CodecPair { lossless, lossy }
    }
}

impl Codec {
    pub fn name(self) -> &'static str {
        match self {
            Codec::Png => "png",
            Codec::Jpeg => "jpeg",
            Codec::WebpLossless => "webp-lossless",
            Codec::WebpLossy => "webp",
            Codec::Avif => "avif",
            Codec::JxlLossless => "jxl-lossless",
            Codec::Jxl => "jxl",
        }
    }

    /// Encode `img` into `out`.
    ///
    /// `quality` is ignored by lossless codecs. On failure `out` keeps whatever
    /// the encoder managed to write.
    pub fn encode(
        self,
        img: &DynamicImage,
        quality: Quality,
        out: &mut Vec<u8>,
    ) -> Result<(), CodecError> {
        match self {
            Codec::Png => Ok(img.write_with_encoder(PngEncoder::new(&mut *out))?),
            Codec::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut *out, quality_u8(quality));
                Ok(to_rgb8(img).write_with_encoder(encoder)?)
            }
            Codec::WebpLossless => {
                Ok(to_rgba8(img).write_with_encoder(WebPEncoder::new_lossless(&mut *out))?)
            }
            Codec::WebpLossy => encode_webp_lossy(img, quality, out),
            Codec::Avif => {
                let encoder =
                    AvifEncoder::new_with_speed_quality(&mut *out, AVIF_SPEED, quality_u8(quality));
                Ok(to_rgba8(img).write_with_encoder(encoder)?)
            }
            Codec::JxlLossless => encode_jxl(img, Quality::MAX, true, out),
            Codec::Jxl => encode_jxl(img, quality, false, out),
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn quality_u8(quality: Quality) -> u8 {
    quality.value().min(100) as u8
}

fn to_rgba8(img: &DynamicImage) -> Cow<'_, DynamicImage> {
    match img {
        DynamicImage::ImageRgba8(_) => Cow::Borrowed(img),
        _ => Cow::Owned(DynamicImage::ImageRgba8(img.to_rgba8())),
    }
}

fn to_rgb8(img: &DynamicImage) -> Cow<'_, DynamicImage> {
    match img {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_) => Cow::Borrowed(img),
        _ => Cow::Owned(DynamicImage::ImageRgb8(img.to_rgb8())),
    }
}

fn encode_webp_lossy(
    img: &DynamicImage,
    quality: Quality,
    out: &mut Vec<u8>,
) -> Result<(), CodecError> {
    let rgba = img.to_rgba8();
    let encoder = webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height());
    let encoded = encoder
        .encode_simple(false, quality.value() as f32)
        .map_err(|e| CodecError::Webp(format!("{e:?}")))?;
    out.extend_from_slice(&encoded);
    Ok(())
}

#[cfg(feature = "jxl")]
fn encode_jxl(
    img: &DynamicImage,
    quality: Quality,
    lossless: bool,
    out: &mut Vec<u8>,
) -> Result<(), CodecError> {
    use jpegxl_rs::encode::{EncoderResult, EncoderSpeed};

    let rgba = img.to_rgba8();
    let mut encoder = jpegxl_rs::encoder_builder()
        .has_alpha(true)
        .lossless(lossless)
        .uses_original_profile(lossless)
        .quality(super::calculations::jxl_distance(quality))
        .speed(EncoderSpeed::Squirrel)
        .build()
        .map_err(|e| CodecError::Jxl(e.to_string()))?;
    let encoded: EncoderResult<u8> = encoder
        .encode::<u8, u8>(rgba.as_raw(), rgba.width(), rgba.height())
        .map_err(|e| CodecError::Jxl(e.to_string()))?;
    out.extend_from_slice(&encoded.data);
    Ok(())
}

#[cfg(not(feature = "jxl"))]
fn encode_jxl(
    _img: &DynamicImage,
    _quality: Quality,
    _lossless: bool,
    _out: &mut Vec<u8>,
) -> Result<(), CodecError> {
    Err(CodecError::Unsupported)
}
