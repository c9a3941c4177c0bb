use crate::database::DbConn;
use crate::error::Result;
use crate::models::reference::{FileReference, NewFileReference};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

pub async fn create_reference(conn: &mut DbConn, new_ref: &NewFileReference) -> Result<FileReference> {
    let reference = sqlx::query_as::<_, FileReference>(
        r#"
        INSERT INTO file_references (id, file_id, source_project_id, shared_by, shared_version,
            target_channel_id, target_message_id, target_thread_id, shared_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now())
        RETURNING *
        "#,
    )
    .bind(Uuid::now_v7())
    .bind(new_ref.file_id)
    .bind(new_ref.source_project_id)
    .bind(new_ref.shared_by)
    .bind(new_ref.shared_version)
    .bind(&new_ref.target_channel_id)
    .bind(&new_ref.target_message_id)
    .bind(&new_ref.target_thread_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(reference)
}

pub async fn list_references_for_file(conn: &mut DbConn, file_id: Uuid) -> Result<Vec<FileReference>> {
    let refs = sqlx::query_as::<_, FileReference>(
        "SELECT * FROM file_references WHERE file_id = $1 ORDER BY shared_at",
    )
    .bind(file_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(refs)
}

pub async fn delete_references_for_file(
    tx: &mut Transaction<'_, Postgres>,
    file_id: Uuid,
) -> Result<()> {
    sqlx::query("DELETE FROM file_references WHERE file_id = $1")
        .bind(file_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
