//! Original-artwork providers.
//!
//! The resize facade never reads files or caches itself. It asks an
//! [`ArtworkStore`] for the original bytes, that original's cache key and its
//! modification time. Two stores ship with the crate:
//!
//! - [`FileArtworkStore`] serves registered files. Keys are content-addressed
//!   (SHA-256 of the file), so touching a file without changing it keeps its key.
//! - [`MemoryArtworkStore`] serves bytes the embedder already holds.
//!
//! Both hold originals only: a request for a non-zero size or a square crop is
//! answered with the original bytes.
//!
//! Every fetch carries the caller's [`CancellationToken`]. A cancelled token
//! fails the fetch with [`StoreError::Cancelled`] before any bytes are read.

use crate::artwork::ArtworkId;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Read, Seek};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("artwork not found: {0}")]
    NotFound(ArtworkId),
    #[error("fetch of {0} was cancelled")]
    Cancelled(ArtworkId),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A stream of encoded image bytes that can be read and rewound.
pub trait ArtworkSource: Read + Seek + Send {}

impl<T: Read + Seek + Send> ArtworkSource for T {}

/// An original artwork as handed out by a store.
pub struct OriginalArtwork {
    pub stream: Box<dyn ArtworkSource>,
    /// The store's cache key for this artwork.
    pub key: String,
    pub last_updated: SystemTime,
}

impl std::fmt::Debug for OriginalArtwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OriginalArtwork")
            .field("key", &self.key)
            .field("last_updated", &self.last_updated)
            .finish_non_exhaustive()
    }
}

/// Source of original artwork bytes.
///
/// Implementations must be safe to call from many requests at once. The
/// cancellation token is honoured here; once the bytes are handed out,
/// resizing runs to completion.
pub trait ArtworkStore: Send + Sync {
    /// Fetch artwork. `size == 0` asks for the native size.
    fn get(
        &self,
        id: &ArtworkId,
        size: u32,
        square: bool,
        cancel: &CancellationToken,
    ) -> Result<OriginalArtwork, StoreError>;
}

/// Fail with [`StoreError::Cancelled`] once `cancel` has fired.
pub fn ensure_not_cancelled(cancel: &CancellationToken, id: &ArtworkId) -> Result<(), StoreError> {
    if cancel.is_cancelled() {
        return Err(StoreError::Cancelled(id.clone()));
    }
    Ok(())
}

// =============================================================================
// File store
// =============================================================================

/// Serves artwork from files registered by id.
#[derive(Debug, Default, Clone)]
pub struct FileArtworkStore {
    files: HashMap<ArtworkId, PathBuf>,
}

impl FileArtworkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: ArtworkId, path: impl Into<PathBuf>) {
        self.files.insert(id, path.into());
    }

    pub fn with(mut self, id: ArtworkId, path: impl Into<PathBuf>) -> Self {
        self.register(id, path);
        self
    }
}

impl ArtworkStore for FileArtworkStore {
    fn get(
        &self,
        id: &ArtworkId,
        _size: u32,
        _square: bool,
        cancel: &CancellationToken,
    ) -> Result<OriginalArtwork, StoreError> {
        ensure_not_cancelled(cancel, id)?;
        let path = self
            .files
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let bytes = fs::read(path)?;
        let last_updated = fs::metadata(path)?.modified()?;
        Ok(OriginalArtwork {
            key: format!("{}.{}", id, hash_bytes(&bytes)),
            stream: Box::new(Cursor::new(bytes)),
            last_updated,
        })
    }
}

/// SHA-256 of a byte slice, returned as a hex string.
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

// =============================================================================
// Memory store
// =============================================================================

#[derive(Debug, Clone)]
struct MemoryEntry {
    bytes: Arc<[u8]>,
    key: String,
    last_updated: SystemTime,
}

/// Serves artwork held in memory. Cloning an entry's stream does not copy
/// its bytes.
#[derive(Debug, Default, Clone)]
pub struct MemoryArtworkStore {
    entries: HashMap<ArtworkId, MemoryEntry>,
}

impl MemoryArtworkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        id: ArtworkId,
        bytes: impl Into<Vec<u8>>,
        key: impl Into<String>,
        last_updated: SystemTime,
    ) {
        self.entries.insert(
            id,
            MemoryEntry {
                bytes: Arc::from(bytes.into()),
                key: key.into(),
                last_updated,
            },
        );
    }

    pub fn remove(&mut self, id: &ArtworkId) -> bool {
        self.entries.remove(id).is_some()
    }
}

impl ArtworkStore for MemoryArtworkStore {
    fn get(
        &self,
        id: &ArtworkId,
        _size: u32,
        _square: bool,
        cancel: &CancellationToken,
    ) -> Result<OriginalArtwork, StoreError> {
        ensure_not_cancelled(cancel, id)?;
        let entry = self
            .entries
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        Ok(OriginalArtwork {
            stream: Box::new(Cursor::new(Arc::clone(&entry.bytes))),
            key: entry.key.clone(),
            last_updated: entry.last_updated,
        })
    }
}
