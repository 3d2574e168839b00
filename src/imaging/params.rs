//! Parameter types for artwork encoding.
//!
//! - [`Quality`]: Encoder quality (1–100). Clamped on construction.
//! - [`OutputFormat`]: The closed set of container formats a server can be
//!   configured to emit. Parses from and prints as its lowercase name, which
//!   is also the suffix used in cache keys.
//! - [`SourceFormat`]: The container a source was detected as. JPEG XL has no
//!   `image::ImageFormat` variant and gets its own.

use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Quality setting for image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Quality(pub u32);

impl Quality {
    pub const MAX: Quality = Quality(100);

    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Output container format for resized artwork.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Webp,
    Jxl,
    Avif,
    Png,
    Jpeg,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 5] = [
        OutputFormat::Webp,
        OutputFormat::Jxl,
        OutputFormat::Avif,
        OutputFormat::Png,
        OutputFormat::Jpeg,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Webp => "webp",
            OutputFormat::Jxl => "jxl",
            OutputFormat::Avif => "avif",
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpeg",
        }
    }

    /// Whether a decoded source format is the same container as this output.
    pub fn matches(self, source: SourceFormat) -> bool {
        use SourceFormat::{Image, Jxl};
        matches!(
            (self, source),
            (OutputFormat::Webp, Image(ImageFormat::WebP))
                | (OutputFormat::Avif, Image(ImageFormat::Avif))
                | (OutputFormat::Png, Image(ImageFormat::Png))
                | (OutputFormat::Jpeg, Image(ImageFormat::Jpeg))
                | (OutputFormat::Jxl, Jxl)
        )
    }
}

/// Detected container of a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Image(ImageFormat),
    Jxl,
}

impl From<ImageFormat> for SourceFormat {
    fn from(format: ImageFormat) -> Self {
        SourceFormat::Image(format)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown output format '{0}' (expected one of: webp, jxl, avif, png, jpeg)")]
pub struct UnknownFormat(pub String);

impl FromStr for OutputFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        match lower.as_str() {
            "jpg" => Ok(OutputFormat::Jpeg),
            other => OutputFormat::ALL
                .into_iter()
                .find(|f| f.as_str() == other)
                .ok_or_else(|| UnknownFormat(s.to_string())),
        }
    }
}
