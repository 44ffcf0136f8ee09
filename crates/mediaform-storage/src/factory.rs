use crate::{LocalStorage, Storage, StorageResult};
use mediaform_core::Config;
use std::sync::Arc;

/// Create the storage backend for originals from configuration
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    let storage = LocalStorage::new(&config.local_storage_path).await?;
    tracing::info!(
        path = %config.local_storage_path,
        backend = ?storage.backend_type(),
        "Storage backend initialized"
    );
    Ok(Arc::new(storage))
}
