use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, sqlx::Type)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    FileUpload,
    FileDownload,
    FileView,
    FileCheckout,
    FileCheckin,
    FileDelete,
    AccessDenied,
    AccessRevoked,
    LockForceRelease,
    DownloadTokenCreated,
    DownloadTokenUsed,
    DownloadTokenExpired,
    SecureDeleteStarted,
    SecureDeleteCompleted,
    ProjectDelete,
    AdminOverride,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, sqlx::Type)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Success,
    Failure,
    Denied,
    Partial,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditLog {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event_kind: EventKind,
    pub outcome: Outcome,
    pub user_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub file_id: Option<Uuid>,
    pub file_version_id: Option<Uuid>,
    pub source_ip: Option<String>,
    pub user_agent: Option<String>,
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub source_ip: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub event_kind: EventKind,
    pub outcome: Outcome,
    pub user_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub file_id: Option<Uuid>,
    pub file_version_id: Option<Uuid>,
    pub meta: RequestMeta,
    pub details: serde_json::Value,
}
