//! Artwork identities.
//!
//! An [`ArtworkId`] names a piece of artwork by what it belongs to and that
//! owner's id. Its string form, `"{prefix}-{id}"`, is what shows up in logs
//! and in the `"{id}@{size}"` discriminator of resized artwork.
//!
//! | Kind | Prefix |
//! |---|---|
//! | Album | `al` |
//! | Artist | `ar` |
//! | Media file | `mf` |
//! | Playlist | `pl` |

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtworkKind {
    Album,
    Artist,
    MediaFile,
    Playlist,
}

impl ArtworkKind {
    pub fn prefix(self) -> &'static str {
        match self {
            ArtworkKind::Album => "al",
            ArtworkKind::Artist => "ar",
            ArtworkKind::MediaFile => "mf",
            ArtworkKind::Playlist => "pl",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        [
            ArtworkKind::Album,
            ArtworkKind::Artist,
            ArtworkKind::MediaFile,
            ArtworkKind::Playlist,
        ]
        .into_iter()
        .find(|k| k.prefix() == prefix)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtworkId {
    pub kind: ArtworkKind,
    pub id: String,
}

impl ArtworkId {
    pub fn new(kind: ArtworkKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn album(id: impl Into<String>) -> Self {
        Self::new(ArtworkKind::Album, id)
    }

    pub fn artist(id: impl Into<String>) -> Self {
        Self::new(ArtworkKind::Artist, id)
    }

    pub fn media_file(id: impl Into<String>) -> Self {
        Self::new(ArtworkKind::MediaFile, id)
    }

    pub fn playlist(id: impl Into<String>) -> Self {
        Self::new(ArtworkKind::Playlist, id)
    }
}

impl fmt::Display for ArtworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind.prefix(), self.id)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ArtworkIdError {
    #[error("artwork id '{0}' has no kind prefix")]
    MissingSeparator(String),
    #[error("unknown artwork kind '{0}'")]
    UnknownKind(String),
    #[error("artwork id '{0}' is empty after its prefix")]
    EmptyId(String),
}

impl FromStr for ArtworkId {
    type Err = ArtworkIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, id) = s
            .split_once('-')
            .ok_or_else(|| ArtworkIdError::MissingSeparator(s.to_string()))?;
        let kind = ArtworkKind::from_prefix(prefix)
            .ok_or_else(|| ArtworkIdError::UnknownKind(prefix.to_string()))?;
        if id.is_empty() {
            return Err(ArtworkIdError::EmptyId(s.to_string()));
        }
        Ok(Self::new(kind, id))
    }
}
