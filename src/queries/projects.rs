use crate::database::DbConn;
use crate::error::{Error, Result};
use crate::models::project::{NewProject, Project};
use uuid::Uuid;

pub async fn create_project(conn: &mut DbConn, new_project: &NewProject) -> Result<Project> {
    let existing = get_project_by_channel(conn, &new_project.hub_channel_id).await?;
    if existing.is_some() {
        return Err(Error::ProjectAlreadyExists(new_project.hub_channel_id.clone()));
    }

    let project = sqlx::query_as::<_, Project>(
        r#"
        INSERT INTO projects (id, name, platform_team_id, hub_channel_id, created_by, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, now(), now())
        RETURNING id, name, platform_team_id, hub_channel_id, created_by, created_at, updated_at
        "#,
    )
    .bind(Uuid::now_v7())
    .bind(&new_project.name)
    .bind(&new_project.platform_team_id)
    .bind(&new_project.hub_channel_id)
    .bind(new_project.created_by)
    .fetch_one(&mut *conn)
    .await?;
    Ok(project)
}

pub async fn get_project_by_id(conn: &mut DbConn, id: Uuid) -> Result<Option<Project>> {
    let project = sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(project)
}

pub async fn get_project_by_channel(conn: &mut DbConn, channel_id: &str) -> Result<Option<Project>> {
    let project = sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE hub_channel_id = $1")
        .bind(channel_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(project)
}

pub async fn delete_project(conn: &mut DbConn, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
