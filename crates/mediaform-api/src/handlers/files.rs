use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::Response,
};
use mediaform_core::AppError;
use mediaform_processing::{RequestOptions, RECOGNIZED_PARAMS};

use crate::error::HttpAppError;
use crate::services::transform::transform;
use crate::state::AppState;

/// Serve an original or a transformed variant of it.
///
/// Recognised query parameters: `width`, `height`, `crop`, `format`,
/// `filter`, `brightness` and `overlay_text`. Others are ignored.
#[tracing::instrument(skip(state, query), fields(operation = "get_file"))]
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<Vec<(String, String)>>,
) -> Result<Response, HttpAppError> {
    let ignored: Vec<&str> = query
        .iter()
        .map(|(name, _)| name.as_str())
        .filter(|name| !RECOGNIZED_PARAMS.contains(name))
        .collect();
    if !ignored.is_empty() {
        tracing::debug!(ignored = ?ignored, "Ignoring unrecognised query parameters");
    }

    let options = RequestOptions::from_pairs(query)?;
    let outcome = transform(&state, &id, &options).await?;
    let artifact = outcome.artifact;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, artifact.mime_type)
        .header(header::CONTENT_LENGTH, artifact.byte_len())
        .header(header::CACHE_CONTROL, "public, max-age=31536000, immutable")
        .header(header::ETAG, format!("\"{}\"", outcome.key))
        .header("X-Cache", outcome.status.as_str())
        .body(Body::from(artifact.bytes.clone()))
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build response");
            AppError::Internal(e.to_string())
        })?;

    Ok(response)
}
