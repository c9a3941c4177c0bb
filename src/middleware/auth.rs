//! Service-token authentication middleware.
//!
//! Identity always originates from the chat platform: the bearer token is
//! a short-lived service JWT carrying a platform user/team pair, never a
//! local username/password. The first request for a given identity creates
//! its internal `User` row; every later request resolves the same row.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::Result,
    models::user::NewUser,
    queries,
    services::service_auth::authenticate_from_header,
    state::AppState,
};

use secrecy::ExposeSecret;

/// Authenticated caller, resolved from a verified service token and
/// inserted into request extensions for handler access.
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub platform_user_id: String,
    pub platform_team_id: String,
    pub admin: bool,
}

pub async fn service_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let auth_header = headers.get("authorization").and_then(|h| h.to_str().ok());
    let claims = authenticate_from_header(auth_header, state.config.service_auth.secret.expose_secret())?;

    let mut conn = state.pool.acquire().await?;
    let user = queries::users::get_or_create_user(
        &mut conn,
        &NewUser {
            platform_user_id: claims.sub.clone(),
            platform_team_id: claims.team.clone(),
            display_name: claims.sub.clone(),
            email: None,
            avatar_url: None,
        },
    )
    .await?;

    request.extensions_mut().insert(AuthenticatedUser {
        id: user.id,
        platform_user_id: user.platform_user_id,
        platform_team_id: user.platform_team_id,
        admin: claims.admin,
    });

    Ok(next.run(request).await)
}
