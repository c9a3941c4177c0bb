use crate::database::DbConn;
use crate::error::Result;
use crate::models::audit::{AuditLog, EventKind, NewAuditEntry, Outcome};
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub async fn insert_entry(conn: &mut DbConn, entry: &NewAuditEntry) -> Result<AuditLog> {
    let row = sqlx::query_as::<_, AuditLog>(
        r#"
        INSERT INTO audit_log (id, timestamp, event_kind, outcome, user_id, project_id, file_id,
            file_version_id, source_ip, user_agent, details)
        VALUES ($1, now(), $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(Uuid::now_v7())
    .bind(entry.event_kind)
    .bind(entry.outcome)
    .bind(entry.user_id)
    .bind(entry.project_id)
    .bind(entry.file_id)
    .bind(entry.file_version_id)
    .bind(&entry.meta.source_ip)
    .bind(&entry.meta.user_agent)
    .bind(&entry.details)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}

pub struct ReportFilter {
    pub project_id: Uuid,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

pub async fn list_for_report(conn: &mut DbConn, filter: &ReportFilter) -> Result<Vec<AuditLog>> {
    let rows = sqlx::query_as::<_, AuditLog>(
        "SELECT * FROM audit_log WHERE project_id = $1 AND timestamp >= $2 AND timestamp <= $3 ORDER BY timestamp",
    )
    .bind(filter.project_id)
    .bind(filter.from)
    .bind(filter.to)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

pub const SECURITY_EVENT_KINDS: &[EventKind] = &[
    EventKind::AccessDenied,
    EventKind::AccessRevoked,
    EventKind::LockForceRelease,
    EventKind::AdminOverride,
];
