use crate::database::DbConn;
use crate::error::Result;
use crate::models::deletion::{DeletionRecord, DeletionStatus};
use uuid::Uuid;

pub async fn insert_record(
    conn: &mut DbConn,
    content_hash: Option<&str>,
    requested_by: Uuid,
    reason: &str,
) -> Result<DeletionRecord> {
    let record = sqlx::query_as::<_, DeletionRecord>(
        r#"
        INSERT INTO deletion_records (id, content_hash, requested_by, reason, status, secure_wipe_used, requested_at)
        VALUES ($1, $2, $3, $4, 'IN_PROGRESS', false, now())
        RETURNING *
        "#,
    )
    .bind(Uuid::now_v7())
    .bind(content_hash)
    .bind(requested_by)
    .bind(reason)
    .fetch_one(&mut *conn)
    .await?;
    Ok(record)
}

pub async fn mark_completed(
    conn: &mut DbConn,
    id: Uuid,
    secure_wipe_used: bool,
    verification_hash: &str,
) -> Result<DeletionRecord> {
    let record = sqlx::query_as::<_, DeletionRecord>(
        r#"
        UPDATE deletion_records
        SET status = 'COMPLETED', secure_wipe_used = $2, verification_hash = $3, completed_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(secure_wipe_used)
    .bind(verification_hash)
    .fetch_one(&mut *conn)
    .await?;
    Ok(record)
}

pub async fn mark_failed(conn: &mut DbConn, id: Uuid) -> Result<DeletionRecord> {
    let record = sqlx::query_as::<_, DeletionRecord>(
        "UPDATE deletion_records SET status = 'FAILED' WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(record)
}

pub async fn mark_verified(conn: &mut DbConn, id: Uuid) -> Result<DeletionRecord> {
    let record = sqlx::query_as::<_, DeletionRecord>(
        "UPDATE deletion_records SET status = 'VERIFIED' WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(record)
}

pub async fn get_record(conn: &mut DbConn, id: Uuid) -> Result<Option<DeletionRecord>> {
    let record = sqlx::query_as::<_, DeletionRecord>("SELECT * FROM deletion_records WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(record)
}

pub async fn reset_for_retry(conn: &mut DbConn, id: Uuid) -> Result<DeletionRecord> {
    let record = sqlx::query_as::<_, DeletionRecord>(
        "UPDATE deletion_records SET status = 'PENDING' WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(record)
}

pub async fn list_by_status(
    conn: &mut DbConn,
    status: DeletionStatus,
) -> Result<Vec<DeletionRecord>> {
    let records = sqlx::query_as::<_, DeletionRecord>("SELECT * FROM deletion_records WHERE status = $1")
        .bind(status)
        .fetch_all(&mut *conn)
        .await?;
    Ok(records)
}
