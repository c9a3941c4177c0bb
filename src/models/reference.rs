use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A share record: file `shared_version` posted into another channel/thread.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FileReference {
    pub id: Uuid,
    pub file_id: Uuid,
    pub source_project_id: Uuid,
    pub shared_by: Uuid,
    pub shared_version: i32,
    pub target_channel_id: String,
    pub target_message_id: String,
    pub target_thread_id: Option<String>,
    pub shared_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFileReference {
    pub file_id: Uuid,
    pub source_project_id: Uuid,
    pub shared_by: Uuid,
    pub shared_version: i32,
    pub target_channel_id: String,
    pub target_message_id: String,
    pub target_thread_id: Option<String>,
}
