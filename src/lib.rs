//! # Artwork Resize
//!
//! Adaptive resizing and re-encoding of cover artwork for a music server.
//! Given an artwork id, a target size and a square flag, the crate produces
//! a downscaled image in the configured output format, with a cache key and
//! a timestamp so the result can be stored by any artwork cache.
//!
//! # Request Flow
//!
//! ```text
//! ResizedArtwork::new   store.get(id, 0, cancel)  →  snapshot key + mtime
//! ResizedArtwork::key   "{key}.{size}.square" | "{key}.{size}.{format}"
//! ResizedArtwork::reader(cancel)
//!     store.get(id, 0, cancel) → resize_image → encoded bytes   ("{id}@{size}")
//!                              ↘ unchanged/error → store.get(id, 0, cancel) again
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`reader`] | The [`reader::ResizedArtwork`] facade: cache keys, timestamps, fallback to the original |
//! | [`imaging`] | Decode, resize, square padding, lossless detection, quality scaling and encoding |
//! | [`store`] | [`store::ArtworkStore`] trait plus file-backed and in-memory stores |
//! | [`artwork`] | [`artwork::ArtworkId`], the `al-`/`ar-`/`mf-`/`pl-` identity |
//! | [`config`] | `[artwork]` TOML config: output format and quality bounds |
//!
//! # Design Decisions
//!
//! ## Never Worse Than the Original
//!
//! A request is answered with the original bytes whenever resizing cannot
//! help: the source is already in the output format and fits the request, a
//! same-format re-encode came out larger, or decoding/encoding failed. The
//! caller always gets an image; only a store failure is an error.
//!
//! ## Cancellation at the Store Boundary
//!
//! Every fetch carries the request's `CancellationToken`. A cancelled request
//! stops at its next fetch with [`store::StoreError::Cancelled`]; decoding and
//! encoding are synchronous and run to completion once started.
//!
//! ## Lossless When the Source Is Flat
//!
//! Logos, line art and screenshots are usually shipped as PNG or lossless
//! WebP at a few bits per pixel. Re-encoding them lossily adds artifacts and
//! often bytes, so sources below the density thresholds in
//! [`imaging::lossless`] are encoded losslessly.
//!
//! ## Quality Follows Size
//!
//! Small thumbnails tolerate aggressive compression; large views do not.
//! [`imaging::quality_by_size`] interpolates between the configured bounds.

pub mod artwork;
pub mod config;
pub mod imaging;
pub mod reader;
pub mod store;

#[cfg(test)]
pub(crate) mod test_helpers;
