//! Application state shared by every handler

use mediaform_cache::ArtifactCache;
use mediaform_core::{Config, MediaKind};
use mediaform_processing::{MediaIo, MediaValidator, SourceCatalog, TransformEngine};
use mediaform_storage::Storage;
use std::sync::Arc;
use tokio::sync::Semaphore;

pub struct AppState {
    pub config: Config,
    pub catalog: Arc<SourceCatalog>,
    pub cache: ArtifactCache,
    pub engine: TransformEngine,
    /// Worker pool gate: one permit per transform running on the blocking pool
    pub transform_permits: Arc<Semaphore>,
    pub image_validator: MediaValidator,
    pub video_validator: MediaValidator,
}

impl AppState {
    pub fn new(config: Config, storage: Arc<dyn Storage>) -> Self {
        let engine = TransformEngine::new(MediaIo::new(
            config.ffmpeg_path.clone(),
            config.ffprobe_path.clone(),
        ));

        Self {
            catalog: Arc::new(SourceCatalog::new(storage)),
            cache: ArtifactCache::new(config.cache_max_bytes, config.cache_max_entries),
            engine,
            transform_permits: Arc::new(Semaphore::new(config.max_concurrent_transforms)),
            image_validator: MediaValidator::for_kind(MediaKind::Image, &config),
            video_validator: MediaValidator::for_kind(MediaKind::Video, &config),
            config,
        }
    }

    pub fn validator(&self, kind: MediaKind) -> &MediaValidator {
        match kind {
            MediaKind::Image => &self.image_validator,
            MediaKind::Video => &self.video_validator,
        }
    }

    /// Public URL a client fetches an asset (and its transforms) from
    pub fn file_url(&self, id: &str) -> String {
        format!(
            "{}/files/{}",
            self.config.base.public_base_url.trim_end_matches('/'),
            id
        )
    }
}
