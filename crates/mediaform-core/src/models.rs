//! Domain models for uploaded sources.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Kind of media an uploaded source holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Parse the declared upload type ("image" or "video")
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }

    /// Infer the kind from a stored file extension
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "webp" | "gif" => Some(MediaKind::Image),
            "mp4" => Some(MediaKind::Video),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercase hex SHA-256 of a source's bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn of(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        ContentHash(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable record of an uploaded original.
///
/// The `id` doubles as the storage filename (`{uuid}.{ext}`); the content hash
/// is what transformation caching keys on, so identical bytes uploaded twice
/// share cached artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceAsset {
    pub id: String,
    pub kind: MediaKind,
    pub size_bytes: u64,
    pub content_hash: ContentHash,
}

impl SourceAsset {
    pub fn new(id: impl Into<String>, kind: MediaKind, data: &[u8]) -> Self {
        Self {
            id: id.into(),
            kind,
            size_bytes: data.len() as u64,
            content_hash: ContentHash::of(data),
        }
    }
}

/// Lowercase extension after the last '.' of a filename or id
pub fn extension_of(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Cache key for one transformation of one source.
///
/// Derived from the source content hash and the pipeline's canonical
/// encoding, so the asset id and request parameter order never leak into it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipelineKey(String);

impl PipelineKey {
    pub fn derive(source: &ContentHash, canonical_pipeline: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(source.as_str().as_bytes());
        hasher.update(b"\n");
        hasher.update(canonical_pipeline.as_bytes());
        PipelineKey(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PipelineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encoded output of one pipeline execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub bytes: Bytes,
    pub mime_type: &'static str,
}

impl Artifact {
    pub fn new(bytes: impl Into<Bytes>, mime_type: &'static str) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type,
        }
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }
}
