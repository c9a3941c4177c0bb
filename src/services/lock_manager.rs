//! Exclusive, expiring per-file locks (checkout state).

use crate::database::DbPool;
use crate::error::{Error, Result};
use crate::models::audit::{EventKind, RequestMeta};
use crate::models::lock::FileLock;
use crate::queries::locks;
use crate::services::audit_log::AuditLog;
use chrono::{Duration, Utc};
use uuid::Uuid;

#[derive(Clone)]
pub struct LockManager {
    pool: DbPool,
    expiry_hours: i64,
    audit: AuditLog,
}

impl LockManager {
    pub fn new(pool: DbPool, expiry_hours: i64, audit: AuditLog) -> Self {
        Self { pool, expiry_hours, audit }
    }

    pub async fn acquire(&self, file_id: Uuid, user_id: Uuid, reason: Option<&str>) -> Result<FileLock> {
        let mut tx = self.pool.begin().await?;
        let existing = locks::get_lock_for_update(&mut tx, file_id).await?;

        let expires_at = if self.expiry_hours <= 0 {
            Some(Utc::now())
        } else {
            Some(Utc::now() + Duration::hours(self.expiry_hours))
        };

        let lock = match existing {
            Some(lock) if lock.owner_id == user_id => {
                locks::refresh_lock(&mut tx, file_id, user_id, expires_at, reason).await?
            }
            Some(lock) if !lock.is_expired() => {
                return Err(Error::FileLocked {
                    file_id,
                    owner: lock.owner_id,
                    locked_at: lock.acquired_at,
                    expires_at: lock.expires_at,
                });
            }
            Some(_) => match locks::delete_lock(&mut tx, file_id).await.and(locks::insert_lock(&mut tx, file_id, user_id, expires_at, reason).await) {
                Ok(lock) => lock,
                Err(e) => return self.lost_insert_race(e, file_id).await,
            },
            None => match locks::insert_lock(&mut tx, file_id, user_id, expires_at, reason).await {
                Ok(lock) => lock,
                Err(e) => return self.lost_insert_race(e, file_id).await,
            },
        };

        tx.commit().await?;
        Ok(lock)
    }

    /// Two concurrent first-time `acquire` calls both pass the `FOR UPDATE`
    /// read (no row exists yet) and race on `insert_lock`'s primary key; the
    /// loser's transaction aborts with a unique violation. Drop it, re-read
    /// the winner's row on a fresh connection, and report it as `FileLocked`
    /// instead of surfacing the raw database error.
    async fn lost_insert_race(&self, err: Error, file_id: Uuid) -> Result<FileLock> {
        let is_unique_violation =
            matches!(&err, Error::Sqlx(e) if e.as_database_error().is_some_and(|d| d.is_unique_violation()));
        if !is_unique_violation {
            return Err(err);
        }

        let mut conn = self.pool.acquire().await?;
        let winner = locks::get_lock(&mut conn, file_id).await?.ok_or(err)?;
        Err(Error::FileLocked {
            file_id,
            owner: winner.owner_id,
            locked_at: winner.acquired_at,
            expires_at: winner.expires_at,
        })
    }

    pub async fn release(&self, file_id: Uuid, user_id: Uuid) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        let lock = locks::get_lock(&mut conn, file_id)
            .await?
            .ok_or(Error::LockNotFound(file_id))?;
        if lock.owner_id != user_id {
            return Err(Error::Unauthorized(format!(
                "user {} does not own the lock on file {}",
                user_id, file_id
            )));
        }
        locks::delete_lock_owned_by(&mut conn, file_id, user_id).await?;
        Ok(())
    }

    pub async fn force_release(&self, file_id: Uuid, actor: Uuid, meta: RequestMeta) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        locks::delete_lock(&mut tx, file_id).await?;
        tx.commit().await?;
        self.audit.success(EventKind::LockForceRelease, Some(actor), None, Some(file_id), meta).await;
        Ok(())
    }

    pub async fn extend(&self, file_id: Uuid, user_id: Uuid, hours: i64) -> Result<FileLock> {
        let mut conn = self.pool.acquire().await?;
        locks::extend_lock(&mut conn, file_id, user_id, Utc::now() + Duration::hours(hours))
            .await?
            .ok_or(Error::LockNotFound(file_id))
    }

    pub async fn is_locked(&self, file_id: Uuid) -> Result<bool> {
        Ok(self.current(file_id).await?.is_some())
    }

    /// Returns the lock on `file_id`, treating an expired lock as absent.
    pub async fn current(&self, file_id: Uuid) -> Result<Option<FileLock>> {
        let mut conn = self.pool.acquire().await?;
        Ok(locks::get_lock(&mut conn, file_id)
            .await?
            .filter(|l| !l.is_expired()))
    }

    pub async fn is_locked_by(&self, file_id: Uuid, user_id: Uuid) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Ok(locks::get_lock(&mut conn, file_id)
            .await?
            .is_some_and(|l| !l.is_expired() && l.owner_id == user_id))
    }

    pub async fn reap_expired(&self) -> Result<u64> {
        let mut conn = self.pool.acquire().await?;
        locks::reap_expired_locks(&mut conn).await
    }
}
