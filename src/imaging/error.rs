use super::codec::Codec;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode image: {0}")]
    Decode(String),
    /// The encoder failed part way. `partial` holds whatever it wrote before
    /// failing; callers serving artwork should discard it.
    #[error("{codec} encode failed: {source}")]
    Encode {
        codec: Codec,
        #[source]
        source: CodecError,
        partial: Vec<u8>,
        original_size: u32,
    },
}

impl ImagingError {
    /// Largest edge of the source, when decoding got far enough to know it.
    pub fn original_size(&self) -> Option<u32> {
        match self {
            ImagingError::Encode { original_size, .. } => Some(*original_size),
            _ => None,
        }
    }
}

/// Failure inside a single codec.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error("libwebp: {0}")]
    Webp(String),
    #[error("libjxl: {0}")]
    Jxl(String),
    #[error("not available in this build")]
    Unsupported,
}
