use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, sqlx::Type)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeletionStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Verified,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeletionRecord {
    pub id: Uuid,
    pub content_hash: Option<String>,
    pub requested_by: Uuid,
    pub reason: String,
    pub status: DeletionStatus,
    pub secure_wipe_used: bool,
    pub verification_hash: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletionCertificate {
    pub certificate_id: Uuid,
    pub deletion_record_id: Uuid,
    pub content_hash: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub wipe_method: String,
    pub verification_hash: Option<String>,
    pub requested_by: Uuid,
    pub reason: String,
    pub generated_at: DateTime<Utc>,
}
