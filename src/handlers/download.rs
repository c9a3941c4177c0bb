use crate::error::{Error, Result};
use crate::handlers::request_meta;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::audit::{EventKind, NewAuditEntry, Outcome};
use crate::queries;
use crate::services::token_service::TokenPayload;
use crate::state::AppState;
use axum::extract::{Extension, Path, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize, Default)]
pub struct CreateDownloadTokenRequest {
    pub version_number: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct CreateDownloadTokenResponse {
    pub token: String,
    pub expires_in_seconds: u64,
}

pub async fn create_download_token(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(file_id): Path<Uuid>,
    headers: HeaderMap,
    body: Option<Json<CreateDownloadTokenRequest>>,
) -> Result<Json<CreateDownloadTokenResponse>> {
    let version_number = body.and_then(|b| b.0.version_number);

    let mut conn = state.pool.acquire().await?;
    let file = queries::files::get_file_by_id(&mut conn, file_id)
        .await?
        .ok_or(crate::error::Error::FileNotFound(file_id))?;

    let (resolved_version, content_hash) = match version_number {
        Some(v) => {
            let version = queries::files::get_version(&mut conn, file_id, v).await?;
            (v, version.content_hash)
        }
        None => (file.current_version, file.current_content_hash.clone()),
    };

    let ttl_seconds = state.config.token.expiry_seconds;
    let token = state
        .tokens
        .create_token(|token| TokenPayload {
            token,
            user_id: user.id,
            file_id,
            version_number: resolved_version,
            project_id: file.project_id,
            file_name: file.name.clone(),
            mime_type: file.mime_type.clone(),
            content_hash,
            created_at: Utc::now(),
            expires_at: Utc::now() + Duration::seconds(ttl_seconds as i64),
        })
        .await?;

    state
        .audit
        .success(
            EventKind::DownloadTokenCreated,
            Some(user.id),
            Some(file.project_id),
            Some(file_id),
            request_meta(&headers),
        )
        .await;

    Ok(Json(CreateDownloadTokenResponse { token, expires_in_seconds: ttl_seconds }))
}

pub async fn download(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> Result<Response> {
    let meta = request_meta(&headers);
    let payload = state.tokens.consume(&token, user.id, meta.clone()).await?;

    let bytes = match state.store.read(&payload.content_hash, Some(payload.project_id)).await {
        Ok(bytes) => bytes,
        Err(e @ Error::StorageInconsistent(_)) => {
            state
                .audit
                .record(NewAuditEntry {
                    event_kind: EventKind::FileDownload,
                    outcome: Outcome::Failure,
                    user_id: Some(user.id),
                    project_id: Some(payload.project_id),
                    file_id: Some(payload.file_id),
                    file_version_id: None,
                    meta,
                    details: serde_json::json!({ "error": e.to_string() }),
                })
                .await;
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    state
        .audit
        .success(EventKind::FileDownload, Some(user.id), Some(payload.project_id), Some(payload.file_id), meta)
        .await;

    let headers = [
        (header::CONTENT_TYPE, payload.mime_type),
        (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", payload.file_name)),
    ];
    Ok((headers, bytes).into_response())
}
