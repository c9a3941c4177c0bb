use crate::database::DbConn;
use crate::error::{Error, Result};
use crate::models::file::{File, FileVersion};
use sqlx::{PgConnection, Postgres, Transaction};
use uuid::Uuid;

pub async fn get_file_by_id(conn: &mut DbConn, id: Uuid) -> Result<Option<File>> {
    let file = sqlx::query_as::<_, File>("SELECT * FROM files WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(file)
}

pub async fn get_file_by_id_for_update(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> Result<Option<File>> {
    let file = sqlx::query_as::<_, File>("SELECT * FROM files WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(file)
}

pub async fn find_file_by_name_ci(
    conn: &mut DbConn,
    project_id: Uuid,
    name: &str,
) -> Result<Option<File>> {
    let file = sqlx::query_as::<_, File>(
        "SELECT * FROM files WHERE project_id = $1 AND lower(name) = lower($2)",
    )
    .bind(project_id)
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(file)
}

pub async fn list_files_for_project(conn: &mut DbConn, project_id: Uuid) -> Result<Vec<File>> {
    let files = sqlx::query_as::<_, File>("SELECT * FROM files WHERE project_id = $1 ORDER BY name")
        .bind(project_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(files)
}

/// Inserts a new file and its first version (#1) in the given transaction.
pub async fn insert_file_with_first_version(
    tx: &mut Transaction<'_, Postgres>,
    file_id: Uuid,
    project_id: Uuid,
    name: &str,
    path: &str,
    mime_type: &str,
    content_hash: &str,
    size_bytes: i64,
    created_by: Uuid,
    message: Option<&str>,
) -> Result<(File, FileVersion)> {
    let file = sqlx::query_as::<_, File>(
        r#"
        INSERT INTO files (id, project_id, name, path, mime_type, current_version,
            current_content_hash, size_bytes, hub_card_ref, created_by, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, 1, $6, $7, NULL, $8, now(), now())
        RETURNING *
        "#,
    )
    .bind(file_id)
    .bind(project_id)
    .bind(name)
    .bind(path)
    .bind(mime_type)
    .bind(content_hash)
    .bind(size_bytes)
    .bind(created_by)
    .fetch_one(&mut **tx)
    .await?;

    let version = insert_version(tx, file_id, 1, content_hash, size_bytes, created_by, message).await?;
    Ok((file, version))
}

pub async fn insert_version(
    tx: &mut Transaction<'_, Postgres>,
    file_id: Uuid,
    version_number: i32,
    content_hash: &str,
    size_bytes: i64,
    uploaded_by: Uuid,
    message: Option<&str>,
) -> Result<FileVersion> {
    let version = sqlx::query_as::<_, FileVersion>(
        r#"
        INSERT INTO file_versions (id, file_id, version_number, content_hash, size_bytes, uploaded_by, message, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, now())
        RETURNING *
        "#,
    )
    .bind(Uuid::now_v7())
    .bind(file_id)
    .bind(version_number)
    .bind(content_hash)
    .bind(size_bytes)
    .bind(uploaded_by)
    .bind(message)
    .fetch_one(&mut **tx)
    .await?;
    Ok(version)
}

pub async fn advance_current_version(
    tx: &mut Transaction<'_, Postgres>,
    file_id: Uuid,
    new_version: i32,
    content_hash: &str,
    size_bytes: i64,
) -> Result<File> {
    let file = sqlx::query_as::<_, File>(
        r#"
        UPDATE files SET current_version = $2, current_content_hash = $3, size_bytes = $4, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(file_id)
    .bind(new_version)
    .bind(content_hash)
    .bind(size_bytes)
    .fetch_one(&mut **tx)
    .await?;
    Ok(file)
}

pub async fn get_version(conn: &mut DbConn, file_id: Uuid, version_number: i32) -> Result<FileVersion> {
    let version = sqlx::query_as::<_, FileVersion>(
        "SELECT * FROM file_versions WHERE file_id = $1 AND version_number = $2",
    )
    .bind(file_id)
    .bind(version_number)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(Error::VersionNotFound(file_id, version_number))?;
    Ok(version)
}

pub async fn list_versions(conn: &mut DbConn, file_id: Uuid) -> Result<Vec<FileVersion>> {
    let versions = sqlx::query_as::<_, FileVersion>(
        "SELECT * FROM file_versions WHERE file_id = $1 ORDER BY version_number",
    )
    .bind(file_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(versions)
}

pub async fn count_versions_with_hash(conn: &mut DbConn, content_hash: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM file_versions WHERE content_hash = $1")
        .bind(content_hash)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

pub async fn delete_file_cascade(tx: &mut Transaction<'_, Postgres>, file_id: Uuid) -> Result<()> {
    crate::queries::references::delete_references_for_file(tx, file_id).await?;
    sqlx::query("DELETE FROM file_versions WHERE file_id = $1")
        .bind(file_id)
        .execute(&mut **tx)
        .await?;
    sqlx::query("DELETE FROM files WHERE id = $1")
        .bind(file_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn list_file_ids_for_project(conn: &mut PgConnection, project_id: Uuid) -> Result<Vec<Uuid>> {
    let ids: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM files WHERE project_id = $1")
        .bind(project_id)
        .fetch_all(conn)
        .await?;
    Ok(ids)
}

pub async fn distinct_content_hashes_for_project(
    conn: &mut PgConnection,
    project_id: Uuid,
) -> Result<Vec<String>> {
    let hashes: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT fv.content_hash FROM file_versions fv JOIN files f ON f.id = fv.file_id WHERE f.project_id = $1",
    )
    .bind(project_id)
    .fetch_all(conn)
    .await?;
    Ok(hashes)
}
