//! Channel-membership enforcement for project/file routes.
//!
//! Runs after `service_auth_middleware`, which has already resolved the
//! caller to an `AuthenticatedUser`. Resolves the hub channel a path's
//! `{project_id}` or `{file_id}` segment belongs to and denies the request
//! if the caller isn't a member of that channel. Routes with no project or
//! file id in their path (project creation, admin operations, token
//! download) have no channel to resolve and pass through untouched.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    error::{Error, Result},
    handlers::request_meta,
    middleware::auth::AuthenticatedUser,
    models::audit::EventKind,
    queries,
    state::AppState,
};

pub async fn access_control_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let Some(channel_id) = resolve_channel_id(&state, &request).await? else {
        return Ok(next.run(request).await);
    };

    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| Error::Internal("access control middleware ran before authentication".to_string()))?
        .clone();

    if !state.access.member_of(user.id, &channel_id).await {
        state
            .audit
            .denied(
                EventKind::AccessDenied,
                Some(user.id),
                None,
                None,
                request_meta(request.headers()),
                "caller is not a member of the project's hub channel",
            )
            .await;
        return Err(Error::AccessDenied("not a member of the project's hub channel".to_string()));
    }

    Ok(next.run(request).await)
}

/// Resolves the hub channel id guarding the resource named by the request
/// path, if any. `None` means the route has nothing to gate.
async fn resolve_channel_id(state: &AppState, request: &Request) -> Result<Option<String>> {
    let path = request.uri().path();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if let Some(pos) = segments.iter().position(|&s| s == "projects") {
        let Some(Ok(project_id)) = segments.get(pos + 1).map(|s| Uuid::parse_str(s)) else {
            return Ok(None);
        };
        let mut conn = state.pool.acquire().await?;
        let project = queries::projects::get_project_by_id(&mut conn, project_id)
            .await?
            .ok_or(Error::ProjectNotFound(project_id))?;
        return Ok(Some(project.hub_channel_id));
    }

    if let Some(pos) = segments.iter().position(|&s| s == "files") {
        let Some(Ok(file_id)) = segments.get(pos + 1).map(|s| Uuid::parse_str(s)) else {
            return Ok(None);
        };
        let mut conn = state.pool.acquire().await?;
        let file = queries::files::get_file_by_id(&mut conn, file_id)
            .await?
            .ok_or(Error::FileNotFound(file_id))?;
        let project = queries::projects::get_project_by_id(&mut conn, file.project_id)
            .await?
            .ok_or(Error::ProjectNotFound(file.project_id))?;
        return Ok(Some(project.hub_channel_id));
    }

    Ok(None)
}
