use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct File {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub path: String,
    pub mime_type: String,
    pub current_version: i32,
    pub current_content_hash: String,
    pub size_bytes: i64,
    pub hub_card_ref: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Immutable record of one upload. `version_number` is strictly monotonic
/// per file, starting at 1; a version's content hash never changes once written.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FileVersion {
    pub id: Uuid,
    pub file_id: Uuid,
    pub version_number: i32,
    pub content_hash: String,
    pub size_bytes: i64,
    pub uploaded_by: Uuid,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFile {
    pub project_id: Uuid,
    pub name: String,
    pub path: String,
    pub mime_type: String,
    pub content_hash: String,
    pub size_bytes: i64,
    pub created_by: Uuid,
    pub message: Option<String>,
}
