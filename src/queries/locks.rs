use crate::database::DbConn;
use crate::error::Result;
use crate::models::lock::FileLock;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

pub async fn get_lock(conn: &mut DbConn, file_id: Uuid) -> Result<Option<FileLock>> {
    let lock = sqlx::query_as::<_, FileLock>("SELECT * FROM file_locks WHERE file_id = $1")
        .bind(file_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(lock)
}

pub async fn get_lock_for_update(
    tx: &mut Transaction<'_, Postgres>,
    file_id: Uuid,
) -> Result<Option<FileLock>> {
    let lock =
        sqlx::query_as::<_, FileLock>("SELECT * FROM file_locks WHERE file_id = $1 FOR UPDATE")
            .bind(file_id)
            .fetch_optional(&mut **tx)
            .await?;
    Ok(lock)
}

pub async fn delete_lock(tx: &mut Transaction<'_, Postgres>, file_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM file_locks WHERE file_id = $1")
        .bind(file_id)
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_lock_owned_by(
    conn: &mut DbConn,
    file_id: Uuid,
    owner_id: Uuid,
) -> Result<bool> {
    let result = sqlx::query("DELETE FROM file_locks WHERE file_id = $1 AND owner_id = $2")
        .bind(file_id)
        .bind(owner_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Races between distinct owners are resolved by the `file_id` primary key:
/// only one `INSERT` wins; the loser's transaction will hit a unique
/// violation and must re-read to see the winner's row.
pub async fn insert_lock(
    tx: &mut Transaction<'_, Postgres>,
    file_id: Uuid,
    owner_id: Uuid,
    expires_at: Option<chrono::DateTime<chrono::Utc>>,
    reason: Option<&str>,
) -> Result<FileLock> {
    let lock = sqlx::query_as::<_, FileLock>(
        r#"
        INSERT INTO file_locks (file_id, owner_id, acquired_at, expires_at, reason)
        VALUES ($1, $2, now(), $3, $4)
        RETURNING *
        "#,
    )
    .bind(file_id)
    .bind(owner_id)
    .bind(expires_at)
    .bind(reason)
    .fetch_one(&mut **tx)
    .await?;
    Ok(lock)
}

pub async fn refresh_lock(
    tx: &mut Transaction<'_, Postgres>,
    file_id: Uuid,
    owner_id: Uuid,
    expires_at: Option<chrono::DateTime<chrono::Utc>>,
    reason: Option<&str>,
) -> Result<FileLock> {
    let lock = sqlx::query_as::<_, FileLock>(
        r#"
        UPDATE file_locks SET acquired_at = now(), expires_at = $3, reason = $4
        WHERE file_id = $1 AND owner_id = $2
        RETURNING *
        "#,
    )
    .bind(file_id)
    .bind(owner_id)
    .bind(expires_at)
    .bind(reason)
    .fetch_one(&mut **tx)
    .await?;
    Ok(lock)
}

pub async fn extend_lock(
    conn: &mut DbConn,
    file_id: Uuid,
    owner_id: Uuid,
    expires_at: chrono::DateTime<chrono::Utc>,
) -> Result<Option<FileLock>> {
    let lock = sqlx::query_as::<_, FileLock>(
        "UPDATE file_locks SET expires_at = $3 WHERE file_id = $1 AND owner_id = $2 RETURNING *",
    )
    .bind(file_id)
    .bind(owner_id)
    .bind(expires_at)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(lock)
}

/// Bulk reap of every lock whose expiry has passed. Safe to race with
/// `upsert_lock`'s inline reap: both delete by the same predicate, so at
/// most one deletes any given row.
pub async fn reap_expired_locks(conn: &mut DbConn) -> Result<u64> {
    let result = sqlx::query("DELETE FROM file_locks WHERE expires_at IS NOT NULL AND expires_at < now()")
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}
