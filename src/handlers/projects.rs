use crate::error::{Error, Result};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::project::{NewProject, Project};
use crate::queries;
use crate::services::audit_log::ComplianceReport;
use crate::state::AppState;
use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub hub_channel_id: String,
}

/// Binds a hub channel to a new project; the channel becomes the project's
/// entire access-control boundary.
pub async fn create_project(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<CreateProjectRequest>,
) -> Result<Json<Project>> {
    let mut conn = state.pool.acquire().await?;
    let project = queries::projects::create_project(
        &mut conn,
        &NewProject {
            name: body.name,
            platform_team_id: user.platform_team_id,
            hub_channel_id: body.hub_channel_id,
            created_by: user.id,
        },
    )
    .await?;
    Ok(Json(project))
}

pub async fn get_project(State(state): State<AppState>, Path(project_id): Path<Uuid>) -> Result<Json<Project>> {
    let mut conn = state.pool.acquire().await?;
    let project = queries::projects::get_project_by_id(&mut conn, project_id)
        .await?
        .ok_or(Error::ProjectNotFound(project_id))?;
    Ok(Json(project))
}

#[derive(Debug, Deserialize)]
pub struct ComplianceReportQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

pub async fn compliance_report(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Query(query): Query<ComplianceReportQuery>,
) -> Result<Json<ComplianceReport>> {
    let report = state.audit.compliance_report(project_id, query.from, query.to).await?;
    Ok(Json(report))
}
