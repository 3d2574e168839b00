//! Image processing for resized artwork.
//!
//! | Step | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader`; AVIF via `avif-parse` + `rav1d`; JPEG XL via `jpegxl-rs` |
//! | **Resize** | `DynamicImage::resize` with `Lanczos3` |
//! | **Square pad** | `image::imageops::overlay` on an opaque canvas |
//! | **Encode** | see [`codec`] |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for quality and placement math (unit testable)
//! - **Lossless**: Source density and WebP bitstream inspection
//! - **Decode**: Source sniffing and decoding, counting the bytes read
//! - **Parameters**: [`Quality`], [`OutputFormat`] and [`SourceFormat`]
//! - **Codec**: The format → codec table and the encoders behind it
//! - **Pipeline**: [`resize_image`], which combines all of the above

mod calculations;
pub mod codec;
mod counting;
mod decode;
mod error;
pub mod lossless;
mod params;
pub mod pipeline;

pub use calculations::{jxl_distance, quality_by_size};
pub use codec::{Codec, CodecPair};
pub use counting::CountingReader;
pub use error::{CodecError, ImagingError};
pub use lossless::should_encode_lossless;
pub use params::{OutputFormat, Quality, SourceFormat, UnknownFormat};
pub use pipeline::{EncodePolicy, EncodingDecision, Resized, resize_image};
