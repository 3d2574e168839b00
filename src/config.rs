//! Configuration module.
//!
//! Loads and validates the encoding policy for resized artwork from a TOML
//! file. Every key is optional; missing keys take the defaults below.
//!
//! ```toml
//! [artwork]
//! format = "webp"     # webp | jxl | avif | png | jpeg
//! min_quality = 60    # quality for small thumbnails (1-100)
//! max_quality = 90    # quality when no real downscale happens (1-100)
//! ```
//!
//! Unknown keys are rejected to catch typos early.
//!
//! The loaded [`ArtworkConfig`] is an immutable value. Callers hand it to the
//! facade or convert it with [`ArtworkConfig::policy`]; nothing reads
//! configuration from global state.

use crate::imaging::{EncodePolicy, OutputFormat, Quality};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Output format and quality bounds for resized artwork.
    pub artwork: ArtworkConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.artwork.validate()
    }
}

/// Encoding policy for resized artwork.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArtworkConfig {
    /// Container format served for resized artwork.
    pub format: OutputFormat,
    /// Quality used for small thumbnails.
    pub min_quality: u32,
    /// Quality used when the request is at or above the source size.
    pub max_quality: u32,
}

impl Default for ArtworkConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Webp,
            min_quality: 60,
            max_quality: 90,
        }
    }
}

impl ArtworkConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("min_quality", self.min_quality),
            ("max_quality", self.max_quality),
        ] {
            if !(1..=100).contains(&value) {
                return Err(ConfigError::Validation(format!(
                    "artwork.{name} must be 1-100, got {value}"
                )));
            }
        }
        if self.min_quality > self.max_quality {
            return Err(ConfigError::Validation(format!(
                "artwork.min_quality ({}) must not exceed artwork.max_quality ({})",
                self.min_quality, self.max_quality
            )));
        }
        Ok(())
    }

    pub fn policy(&self) -> EncodePolicy {
        EncodePolicy {
            format: self.format,
            min_quality: Quality::new(self.min_quality),
            max_quality: Quality::new(self.max_quality),
        }
    }
}

/// Load and validate a config file.
///
/// A missing file yields the defaults. A file that exists must parse and
/// validate.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate config from a TOML string.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock config file.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# artwork-resize configuration
# ============================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

[artwork]
# Container format for resized artwork: webp, jxl, avif, png or jpeg.
#
# Sources that look like flat or lossless artwork are re-encoded losslessly.
# Formats without a lossless mode (avif, jpeg) use lossless WebP for those;
# png uses JPEG for lossy output. jxl needs the `jxl` build feature, without
# it the original artwork is served unchanged.
format = "webp"

# Quality for requests smaller than 300px.
min_quality = 60

# Quality for requests at or above the source's own size.
max_quality = 90
"##
}
