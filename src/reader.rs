//! Resized artwork as a cacheable artifact.
//!
//! [`ResizedArtwork`] wraps one request (artwork id, size, square flag) and
//! exposes what an artwork cache needs: a stable key, a freshness timestamp
//! and a lazily produced byte stream. Construction only asks the store for the
//! original's key and timestamp; the resize itself happens in
//! [`Artifact::reader`].
//!
//! Failures inside the pipeline are never surfaced. The caller gets the
//! original bytes instead, and only a store failure on that fallback fetch is
//! reported.
//!
//! Both construction and [`Artifact::reader`] take the request's
//! [`CancellationToken`] and pass it to every store fetch. Cancelling stops
//! the request at its next fetch; a decode or encode already under way runs
//! to completion.

use crate::artwork::ArtworkId;
use crate::config::ArtworkConfig;
use crate::imaging::{Resized, resize_image};
use crate::store::{ArtworkSource, ArtworkStore, StoreError};
use std::io::Cursor;
use std::sync::Arc;
use std::time::SystemTime;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

/// A named, time-stamped, lazily read artifact.
pub trait Artifact {
    fn key(&self) -> String;
    fn last_updated(&self) -> SystemTime;
    fn reader(&self, cancel: &CancellationToken) -> Result<ArtifactStream, StoreError>;
}

/// The bytes produced by an [`Artifact`].
pub struct ArtifactStream {
    pub stream: Box<dyn ArtworkSource>,
    /// `"{artwork id}@{size}"` for resized output, `None` when the original is
    /// served. Meant for logs and metrics, not as a cache key.
    pub source: Option<String>,
}

impl ArtifactStream {
    pub fn is_resized(&self) -> bool {
        self.source.is_some()
    }
}

impl std::fmt::Debug for ArtifactStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactStream")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// One resize request against an [`ArtworkStore`].
pub struct ResizedArtwork {
    store: Arc<dyn ArtworkStore>,
    config: ArtworkConfig,
    art_id: ArtworkId,
    size: u32,
    square: bool,
    original_key: String,
    last_updated: SystemTime,
}

impl ResizedArtwork {
    /// Look up the original and snapshot its key and timestamp.
    ///
    /// Fails with the store's error when the original cannot be found or
    /// `cancel` has fired.
    pub fn new(
        store: Arc<dyn ArtworkStore>,
        config: ArtworkConfig,
        art_id: ArtworkId,
        size: u32,
        square: bool,
        cancel: &CancellationToken,
    ) -> Result<Self, StoreError> {
        let original = store.get(&art_id, 0, false, cancel)?;
        Ok(Self {
            store,
            config,
            art_id,
            size,
            square,
            original_key: original.key,
            last_updated: original.last_updated,
        })
    }
}

impl Artifact for ResizedArtwork {
    fn key(&self) -> String {
        if self.square {
            format!("{}.{}.square", self.original_key, self.size)
        } else {
            format!("{}.{}.{}", self.original_key, self.size, self.config.format)
        }
    }

    fn last_updated(&self) -> SystemTime {
        self.last_updated
    }

    fn reader(&self, cancel: &CancellationToken) -> Result<ArtifactStream, StoreError> {
        let original = self.store.get(&self.art_id, 0, false, cancel)?;

        match resize_image(original.stream, self.size, self.square, &self.config.policy()) {
            Ok(Resized::Encoded {
                bytes,
                original_size,
                decision,
            }) => {
                trace!(
                    art_id = %self.art_id,
                    original = original_size,
                    size = self.size,
                    square = self.square,
                    codec = %decision.codec,
                    quality = decision.quality.value(),
                    "Resizing artwork"
                );
                return Ok(ArtifactStream {
                    stream: Box::new(Cursor::new(bytes)),
                    source: Some(format!("{}@{}", self.art_id, self.size)),
                });
            }
            Ok(Resized::Unchanged { original_size }) => {
                trace!(
                    art_id = %self.art_id,
                    original = original_size,
                    size = self.size,
                    square = self.square,
                    "Image smaller than requested size"
                );
            }
            Err(err) => {
                warn!(
                    art_id = %self.art_id,
                    original = ?err.original_size(),
                    size = self.size,
                    square = self.square,
                    format = %self.config.format,
                    error = %err,
                    "Could not resize image. Will return image as is"
                );
            }
        }

        // The first stream was consumed by the decoder.
        let original = self.store.get(&self.art_id, 0, false, cancel)?;
        Ok(ArtifactStream {
            stream: original.stream,
            source: None,
        })
    }
}
