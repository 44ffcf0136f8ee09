use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use mediaform_core::{AppError, MediaKind};
use serde::Serialize;

use crate::error::HttpAppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub status: &'static str,
    pub id: String,
    pub url: String,
    pub kind: MediaKind,
    pub content_hash: String,
    pub size_bytes: u64,
}

struct FilePart {
    filename: String,
    content_type: Option<String>,
    data: Bytes,
}

/// Upload an original.
///
/// Multipart fields: `file` (the media) and `type` (`image` or `video`).
/// The file is checked against the size limit and extension allow-list of
/// the declared kind before it is stored.
#[tracing::instrument(skip_all, fields(operation = "upload"))]
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), HttpAppError> {
    let mut file: Option<FilePart> = None;
    let mut declared_type: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await?;
                file = Some(FilePart {
                    filename,
                    content_type,
                    data,
                });
            }
            Some("type") => {
                declared_type = Some(field.text().await?);
            }
            _ => {}
        }
    }

    let declared_type = declared_type.ok_or_else(|| {
        AppError::InvalidRequest("Missing 'type' field (expected image or video)".to_string())
    })?;
    let kind = MediaKind::parse(declared_type.trim()).ok_or_else(|| {
        AppError::InvalidRequest(format!(
            "Invalid type '{}' (expected image or video)",
            declared_type
        ))
    })?;
    let file = file.ok_or_else(|| AppError::InvalidRequest("Missing 'file' field".to_string()))?;

    let extension = state.validator(kind).validate_all(
        &file.filename,
        file.content_type.as_deref(),
        file.data.len(),
    )?;

    let content_type = file
        .content_type
        .filter(|ct| !ct.is_empty() && ct != "application/octet-stream")
        .unwrap_or_else(|| default_content_type(&extension).to_string());

    let asset = state
        .catalog
        .register(kind, &extension, &content_type, file.data)
        .await?;

    Ok((
        StatusCode::OK,
        Json(UploadResponse {
            status: "success",
            url: state.file_url(&asset.id),
            kind: asset.kind,
            content_hash: asset.content_hash.to_string(),
            size_bytes: asset.size_bytes,
            id: asset.id,
        }),
    ))
}

fn default_content_type(extension: &str) -> &'static str {
    match extension {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}
