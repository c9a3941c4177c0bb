use crate::error::{Error, Result, ValidationErrors};
use crate::handlers::request_meta;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::file::{File, FileVersion};
use crate::models::lock::FileLock;
use crate::state::AppState;
use axum::extract::{Extension, Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use uuid::Uuid;

/// Drains a multipart body into plain-text fields and, for the field named
/// "content", a temp file holding the uploaded bytes. Caller owns cleanup.
async fn consume_multipart(mut multipart: Multipart) -> Result<(HashMap<String, String>, Option<PathBuf>)> {
    use tokio::io::AsyncWriteExt;

    let mut fields = HashMap::new();
    let mut content_path = None;

    while let Some(mut field) = multipart.next_field().await.map_err(|e| {
        Error::Validation(ValidationErrors::Single {
            field: "body".to_string(),
            message: format!("invalid multipart body: {}", e),
        })
    })? {
        let Some(name) = field.name().map(|s| s.to_string()) else {
            continue;
        };

        if name == "content" {
            let tmp_path = std::env::temp_dir().join(format!("filevault-upload-{}", Uuid::now_v7()));
            let mut tmp = tokio::fs::File::create(&tmp_path).await?;
            while let Some(chunk) = field.chunk().await.map_err(|e| {
                Error::Validation(ValidationErrors::Single {
                    field: "content".to_string(),
                    message: format!("failed to read upload: {}", e),
                })
            })? {
                tmp.write_all(&chunk).await?;
            }
            tmp.flush().await?;
            content_path = Some(tmp_path);
        } else {
            let text = field.text().await.unwrap_or_default();
            fields.insert(name, text);
        }
    }

    Ok((fields, content_path))
}

pub async fn create_file(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(project_id): Path<Uuid>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<File>> {
    let (fields, content_path) = consume_multipart(multipart).await?;
    let content_path = content_path.ok_or_else(|| {
        Error::Validation(ValidationErrors::Single {
            field: "content".to_string(),
            message: "file content is required".to_string(),
        })
    })?;

    let name = fields.get("name").cloned().ok_or_else(|| {
        Error::Validation(ValidationErrors::Single {
            field: "name".to_string(),
            message: "name is required".to_string(),
        })
    })?;
    let path = fields.get("path").cloned().unwrap_or_else(|| "/".to_string());
    let mime_type = fields
        .get("mime_type")
        .cloned()
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let message = fields.get("message").cloned();

    let meta = request_meta(&headers);
    let result = state
        .lifecycle
        .create(project_id, &name, &path, &mime_type, &content_path, user.id, message.as_deref(), meta)
        .await;
    let _ = tokio::fs::remove_file(&content_path).await;

    Ok(Json(result?))
}

#[derive(Debug, Deserialize, Default)]
pub struct CheckoutRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub file: File,
    pub lock: FileLock,
}

pub async fn checkout(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(file_id): Path<Uuid>,
    headers: HeaderMap,
    body: Option<Json<CheckoutRequest>>,
) -> Result<Json<CheckoutResponse>> {
    let reason = body.and_then(|b| b.0.reason);
    let meta = request_meta(&headers);
    let (file, _blob_path, lock) = state.lifecycle.checkout(file_id, user.id, reason.as_deref(), meta).await?;
    Ok(Json(CheckoutResponse { file, lock }))
}

#[derive(Debug, Serialize)]
pub struct CheckinResponse {
    pub file: File,
    pub version: FileVersion,
}

pub async fn checkin(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(file_id): Path<Uuid>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<CheckinResponse>> {
    let (fields, content_path) = consume_multipart(multipart).await?;
    let content_path = content_path.ok_or_else(|| {
        Error::Validation(ValidationErrors::Single {
            field: "content".to_string(),
            message: "file content is required".to_string(),
        })
    })?;
    let message = fields.get("message").cloned();

    let meta = request_meta(&headers);
    let result = state.lifecycle.checkin(file_id, user.id, &content_path, message.as_deref(), meta).await;
    let _ = tokio::fs::remove_file(&content_path).await;

    let (file, version) = result?;
    Ok(Json(CheckinResponse { file, version }))
}

#[derive(Debug, Deserialize, Default)]
pub struct ReleaseLockQuery {
    #[serde(default)]
    pub force: bool,
}

pub async fn release_lock(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(file_id): Path<Uuid>,
    Query(query): Query<ReleaseLockQuery>,
    headers: HeaderMap,
) -> Result<StatusCode> {
    if query.force {
        if !user.admin {
            return Err(Error::AccessDenied("force release requires the admin claim".to_string()));
        }
        state.locks.force_release(file_id, user.id, request_meta(&headers)).await?;
    } else {
        state.locks.release(file_id, user.id).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_file(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(file_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<StatusCode> {
    let meta = request_meta(&headers);
    state.lifecycle.delete(file_id, user.id, meta).await?;
    Ok(StatusCode::NO_CONTENT)
}
