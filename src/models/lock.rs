use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Exclusive per-file lock. `file_id` is the primary key: at most one row
/// per file can ever exist.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FileLock {
    pub file_id: Uuid,
    pub owner_id: Uuid,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub reason: Option<String>,
}

impl FileLock {
    pub fn is_expired(&self) -> bool {
        self.expires_at.map(|e| e < Utc::now()).unwrap_or(false)
    }
}
