//! Append-only audit sink. Logging is best-effort: a failure here never
//! fails the caller's operation, it is only surfaced through `tracing`.

use crate::database::DbPool;
use crate::models::audit::{EventKind, NewAuditEntry, Outcome, RequestMeta};
use crate::queries::audit::{self, ReportFilter, SECURITY_EVENT_KINDS};
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Clone)]
pub struct AuditLog {
    pool: DbPool,
}

impl AuditLog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn record(&self, entry: NewAuditEntry) {
        let mut conn = match self.pool.acquire().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::error!(error = %e, "failed to acquire connection for audit log write");
                return;
            }
        };
        if let Err(e) = audit::insert_entry(&mut conn, &entry).await {
            tracing::error!(error = %e, event = ?entry.event_kind, "failed to persist audit log entry");
        }
    }

    pub async fn success(
        &self,
        kind: EventKind,
        user_id: Option<Uuid>,
        project_id: Option<Uuid>,
        file_id: Option<Uuid>,
        meta: RequestMeta,
    ) {
        self.record(NewAuditEntry {
            event_kind: kind,
            outcome: Outcome::Success,
            user_id,
            project_id,
            file_id,
            file_version_id: None,
            meta,
            details: json!({}),
        })
        .await;
    }

    pub async fn denied(
        &self,
        kind: EventKind,
        user_id: Option<Uuid>,
        project_id: Option<Uuid>,
        file_id: Option<Uuid>,
        meta: RequestMeta,
        reason: &str,
    ) {
        self.record(NewAuditEntry {
            event_kind: kind,
            outcome: Outcome::Denied,
            user_id,
            project_id,
            file_id,
            file_version_id: None,
            meta,
            details: json!({ "reason": reason }),
        })
        .await;
    }

    pub async fn compliance_report(
        &self,
        project_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> crate::error::Result<ComplianceReport> {
        let mut conn = self.pool.acquire().await?;
        let entries = audit::list_for_report(&mut conn, &ReportFilter { project_id, from, to }).await?;

        let mut by_kind: HashMap<String, u64> = HashMap::new();
        let mut by_outcome: HashMap<String, u64> = HashMap::new();
        let mut timeline: HashMap<chrono::NaiveDate, u64> = HashMap::new();
        let mut denied = Vec::new();
        let mut security = Vec::new();
        let mut actors = std::collections::HashSet::new();
        let mut downloads = 0u64;
        let mut checkouts = 0u64;
        let mut checkins = 0u64;

        for e in &entries {
            *by_kind.entry(e.event_kind.to_string()).or_default() += 1;
            *by_outcome.entry(e.outcome.to_string()).or_default() += 1;
            *timeline.entry(e.timestamp.date_naive()).or_default() += 1;
            if let Some(u) = e.user_id {
                actors.insert(u);
            }
            if e.outcome == Outcome::Denied {
                denied.push(e.clone());
            }
            if SECURITY_EVENT_KINDS.contains(&e.event_kind) {
                security.push(e.clone());
            }
            match e.event_kind {
                EventKind::FileDownload => downloads += 1,
                EventKind::FileCheckout => checkouts += 1,
                EventKind::FileCheckin => checkins += 1,
                _ => {}
            }
        }

        let mut day = from.date_naive();
        let end = to.date_naive();
        let mut daily_timeline = Vec::new();
        while day <= end {
            daily_timeline.push((day, *timeline.get(&day).unwrap_or(&0)));
            day += Duration::days(1);
        }

        Ok(ComplianceReport {
            project_id,
            from,
            to,
            total_events: entries.len() as u64,
            by_kind,
            by_outcome,
            daily_timeline,
            denied_events: denied,
            security_events: security,
            unique_actors: actors.len() as u64,
            downloads,
            checkouts,
            checkins,
        })
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ComplianceReport {
    pub project_id: Uuid,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub total_events: u64,
    pub by_kind: HashMap<String, u64>,
    pub by_outcome: HashMap<String, u64>,
    pub daily_timeline: Vec<(chrono::NaiveDate, u64)>,
    pub denied_events: Vec<crate::models::audit::AuditLog>,
    pub security_events: Vec<crate::models::audit::AuditLog>,
    pub unique_actors: u64,
    pub downloads: u64,
    pub checkouts: u64,
    pub checkins: u64,
}
