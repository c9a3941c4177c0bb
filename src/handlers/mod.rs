pub mod admin;
pub mod download;
pub mod files;
pub mod health;
pub mod projects;

use crate::models::audit::RequestMeta;
use axum::http::HeaderMap;

/// Builds a `RequestMeta` from the inbound headers for audit logging.
pub(crate) fn request_meta(headers: &HeaderMap) -> RequestMeta {
    RequestMeta {
        source_ip: headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.split(',').next().unwrap_or(s).trim().to_string()),
        user_agent: headers
            .get(axum::http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string()),
    }
}
