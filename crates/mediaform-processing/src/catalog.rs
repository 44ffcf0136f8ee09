//! Registry of uploaded originals.
//!
//! Bytes live in storage; the catalog remembers each asset's identity and,
//! once a transform has probed it, its dimensions, so cache hits never touch
//! storage.

use crate::media_io::MediaProbe;
use bytes::Bytes;
use mediaform_core::models::extension_of;
use mediaform_core::{AppError, MediaKind, SourceAsset};
use mediaform_storage::{generate_storage_key, Storage, StorageError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct CatalogEntry {
    asset: SourceAsset,
    probe: Option<MediaProbe>,
}

pub struct SourceCatalog {
    storage: Arc<dyn Storage>,
    entries: RwLock<HashMap<String, CatalogEntry>>,
}

impl SourceCatalog {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Store a new original under a fresh `{uuid}.{ext}` id
    pub async fn register(
        &self,
        kind: MediaKind,
        extension: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<SourceAsset, AppError> {
        let id = format!("{}.{}", uuid::Uuid::new_v4(), extension.to_lowercase());
        let asset = SourceAsset::new(id.clone(), kind, &data);

        self.storage
            .upload(&id, content_type, data.to_vec())
            .await
            .map_err(storage_error)?;

        self.entries.write().await.insert(
            id,
            CatalogEntry {
                asset: asset.clone(),
                probe: None,
            },
        );

        tracing::info!(
            id = %asset.id,
            kind = %asset.kind,
            size_bytes = asset.size_bytes,
            content_hash = %asset.content_hash,
            "Source registered"
        );
        Ok(asset)
    }

    /// Look up an asset, re-registering it from storage when the catalog
    /// has never seen it (e.g. after a restart). Returns the bytes too when
    /// they had to be read.
    pub async fn resolve(
        &self,
        id: &str,
    ) -> Result<(SourceAsset, Option<MediaProbe>, Option<Bytes>), AppError> {
        if let Some(entry) = self.entries.read().await.get(id) {
            return Ok((entry.asset.clone(), entry.probe.clone(), None));
        }

        let kind = extension_of(id)
            .and_then(|ext| MediaKind::from_extension(&ext))
            .ok_or_else(|| not_found(id))?;
        let data = self.read(id).await?;
        let asset = SourceAsset::new(id, kind, &data);

        let mut entries = self.entries.write().await;
        let entry = entries.entry(id.to_string()).or_insert_with(|| {
            tracing::info!(id = %id, kind = %kind, "Source re-registered from storage");
            CatalogEntry { asset, probe: None }
        });
        Ok((entry.asset.clone(), entry.probe.clone(), Some(data)))
    }

    /// Read an asset's original bytes
    pub async fn read(&self, id: &str) -> Result<Bytes, AppError> {
        match self.storage.download(&generate_storage_key(id)).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(StorageError::NotFound(_) | StorageError::InvalidKey(_)) => Err(not_found(id)),
            Err(e) => Err(storage_error(e)),
        }
    }

    /// Remember a successful probe so later requests skip it
    pub async fn record_probe(&self, id: &str, probe: MediaProbe) {
        if let Some(entry) = self.entries.write().await.get_mut(id) {
            entry.probe = Some(probe);
        }
    }

    /// Round-trip to the storage backend without touching any asset
    pub async fn probe_storage(&self) -> Result<(), AppError> {
        self.storage
            .exists(&generate_storage_key("health-check"))
            .await
            .map(drop)
            .map_err(storage_error)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("File '{}' not found", id))
}

fn storage_error(err: StorageError) -> AppError {
    AppError::Storage(err.to_string())
}
