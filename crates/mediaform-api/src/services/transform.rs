//! Request-to-artifact flow: resolve the source, probe it, compile the
//! pipeline and serve the artifact through the cache.

use crate::state::AppState;
use bytes::Bytes;
use mediaform_cache::CacheStatus;
use mediaform_core::{AppError, Artifact, PipelineKey, SourceAsset};
use mediaform_processing::{compile, Deadline, MediaProbe, Pipeline, RequestOptions};
use std::sync::Arc;
use std::time::Instant;

/// A served artifact and how the cache produced it
#[derive(Debug, Clone)]
pub struct TransformOutcome {
    pub artifact: Arc<Artifact>,
    pub key: PipelineKey,
    pub status: CacheStatus,
}

/// Serve `options` applied to the asset `id`.
///
/// Parameter and crop errors are raised here, before the cache is consulted,
/// so they never occupy an in-flight slot.
#[tracing::instrument(skip_all, fields(id = %id))]
pub async fn transform(
    state: &Arc<AppState>,
    id: &str,
    options: &RequestOptions,
) -> Result<TransformOutcome, AppError> {
    let (asset, probe, mut source) = state.catalog.resolve(id).await?;

    let probe = match probe {
        Some(probe) => probe,
        None => {
            let (probe, data) = probe_source(state, &asset, source.take()).await?;
            state.catalog.record_probe(&asset.id, probe.clone()).await;
            source = Some(data);
            probe
        }
    };

    let compiled = compile(options, &probe, &asset.content_hash)?;
    let key = compiled.key;

    let compute = {
        let state = Arc::clone(state);
        let id = asset.id.clone();
        let pipeline = compiled.pipeline;
        move || execute(state, id, source, probe, pipeline)
    };

    let (artifact, status) = state.cache.get_or_compute(&key, compute).await?;

    tracing::debug!(
        key = %key,
        cache = status.as_str(),
        size_bytes = artifact.byte_len(),
        "Artifact served"
    );

    Ok(TransformOutcome {
        artifact,
        key,
        status,
    })
}

async fn probe_source(
    state: &Arc<AppState>,
    asset: &SourceAsset,
    source: Option<Bytes>,
) -> Result<(MediaProbe, Bytes), AppError> {
    let data = match source {
        Some(data) => data,
        None => state.catalog.read(&asset.id).await?,
    };

    let io = state.engine.media_io().clone();
    let kind = asset.kind;
    tokio::task::spawn_blocking(move || io.probe(kind, &data).map(|probe| (probe, data)))
        .await
        .map_err(|e| AppError::Internal(format!("probe task failed: {}", e)))?
}

/// The cache's compute step. Runs as its own task; waits for a worker
/// permit, then transforms on the blocking pool within the configured budget.
async fn execute(
    state: Arc<AppState>,
    id: String,
    source: Option<Bytes>,
    probe: MediaProbe,
    pipeline: Pipeline,
) -> Result<Artifact, AppError> {
    let source = match source {
        Some(data) => data,
        None => state.catalog.read(&id).await?,
    };

    let permit = Arc::clone(&state.transform_permits)
        .acquire_owned()
        .await
        .map_err(|_| AppError::Internal("transform worker pool is closed".to_string()))?;

    let budget = state.config.transform_timeout;
    let budget_ms = u64::try_from(budget.as_millis()).unwrap_or(u64::MAX);
    let deadline = Deadline::after(budget);
    let engine = state.engine.clone();
    let start = Instant::now();

    // Held by the blocking task: released when the work stops, not when
    // the wait below gives up.
    let task = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        engine.execute(&source, &probe, &pipeline, deadline)
    });

    let result = match tokio::time::timeout(budget, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(AppError::Internal(format!("transform task failed: {}", e))),
        Err(_) => Err(AppError::Timeout { budget_ms }),
    };

    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
    match &result {
        Ok(artifact) => tracing::info!(
            id = %id,
            size_bytes = artifact.byte_len(),
            duration_ms,
            "Transform completed"
        ),
        Err(e) => tracing::warn!(id = %id, error = %e, duration_ms, "Transform failed"),
    }
    result
}
