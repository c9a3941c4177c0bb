//! Admin-only operations: secure content erasure and its paper trail.
//! Every handler here requires the `admin` claim from the service token.

use crate::error::{Error, Result};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::deletion::{DeletionCertificate, DeletionRecord};
use crate::state::AppState;
use crate::validation;
use axum::extract::{Extension, Path, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

fn require_admin(user: &AuthenticatedUser) -> Result<()> {
    if user.admin {
        Ok(())
    } else {
        Err(Error::AccessDenied("this operation requires the admin claim".to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct SecureDeleteRequest {
    pub reason: String,
}

pub async fn secure_delete_content(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(content_hash): Path<String>,
    Json(body): Json<SecureDeleteRequest>,
) -> Result<Json<DeletionRecord>> {
    require_admin(&user)?;
    validation::validate_content_hash(&content_hash)?;
    validation::validate_reason(&body.reason, "reason", 1000)?;

    let record = state.deletion.secure_delete_content(&content_hash, user.id, &body.reason).await?;
    Ok(Json(record))
}

pub async fn generate_certificate(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(deletion_record_id): Path<Uuid>,
) -> Result<Json<DeletionCertificate>> {
    require_admin(&user)?;
    let certificate = state.deletion.generate_certificate(deletion_record_id).await?;
    Ok(Json(certificate))
}
