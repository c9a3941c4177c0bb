//! Single-use, TTL-bounded download tokens, backed by the same TTL-map
//! primitive used for the access-oracle cache.

use crate::cache::Cache;
use crate::error::{Error, Result};
use crate::models::audit::{EventKind, RequestMeta};
use crate::services::audit_log::AuditLog;
use chrono::{DateTime, Utc};
use rand::TryRngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPayload {
    pub token: String,
    pub user_id: Uuid,
    pub file_id: Uuid,
    pub version_number: i32,
    pub project_id: Uuid,
    pub file_name: String,
    pub mime_type: String,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct TokenService {
    store: Cache<String>,
    ttl_seconds: u64,
    audit: AuditLog,
}

impl TokenService {
    pub fn new(store: Cache<String>, ttl_seconds: u64, audit: AuditLog) -> Self {
        Self { store, ttl_seconds, audit }
    }

    fn key(token: &str) -> String {
        format!("download:{}", token)
    }

    pub async fn create_token(&self, payload_without_token: impl FnOnce(String) -> TokenPayload) -> Result<String> {
        let mut raw = [0u8; 32];
        rand::rngs::OsRng
            .try_fill_bytes(&mut raw)
            .expect("os rng failure");
        let token = hex::encode(raw);

        let payload = payload_without_token(token.clone());
        let json = serde_json::to_string(&payload)?;
        self.store.set_ex(&Self::key(&token), json, self.ttl_seconds).await?;
        Ok(token)
    }

    /// Atomically consumes the token: a second call for the same token
    /// observes it absent and returns `TokenExpired`.
    pub async fn consume(&self, token: &str, requesting_user_id: Uuid, meta: RequestMeta) -> Result<TokenPayload> {
        let key = Self::key(token);
        let Some(raw) = self.store.get(&key).await? else {
            self.audit.success(EventKind::DownloadTokenExpired, Some(requesting_user_id), None, None, meta).await;
            return Err(Error::TokenExpired);
        };

        let payload: TokenPayload = serde_json::from_str(&raw)?;
        if payload.user_id != requesting_user_id {
            self.audit
                .denied(
                    EventKind::AccessDenied,
                    Some(requesting_user_id),
                    Some(payload.project_id),
                    Some(payload.file_id),
                    meta,
                    "download token belongs to another user",
                )
                .await;
            return Err(Error::TokenUserMismatch);
        }

        if !self.store.delete(&key).await? {
            // Raced with another consumer between get and delete.
            self.audit
                .denied(
                    EventKind::DownloadTokenUsed,
                    Some(requesting_user_id),
                    Some(payload.project_id),
                    Some(payload.file_id),
                    meta,
                    "token already consumed by another request",
                )
                .await;
            return Err(Error::TokenAlreadyUsed);
        }

        self.audit
            .success(EventKind::DownloadTokenUsed, Some(requesting_user_id), Some(payload.project_id), Some(payload.file_id), meta)
            .await;
        Ok(payload)
    }

    pub async fn revoke(&self, token: &str, user_id: Uuid) -> Result<()> {
        let key = Self::key(token);
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(());
        };
        let payload: TokenPayload = serde_json::from_str(&raw)?;
        if payload.user_id != user_id {
            return Err(Error::Unauthorized("token belongs to another user".into()));
        }
        self.store.delete(&key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheConfig;
    use sqlx::postgres::PgPoolOptions;

    fn service() -> TokenService {
        // Audit writes are best-effort (see AuditLog::record); a pool that
        // never actually connects is enough to exercise consume()'s outcomes.
        let pool = PgPoolOptions::new().connect_lazy("postgres://localhost/filevault_test").unwrap();
        TokenService::new(Cache::new_local(CacheConfig::default()), 300, AuditLog::new(pool))
    }

    #[tokio::test]
    async fn consume_is_single_use() {
        let svc = service();
        let user = Uuid::now_v7();
        let file = Uuid::now_v7();
        let project = Uuid::now_v7();

        let token = svc
            .create_token(|token| TokenPayload {
                token,
                user_id: user,
                file_id: file,
                version_number: 1,
                project_id: project,
                file_name: "x.txt".into(),
                mime_type: "text/plain".into(),
                content_hash: "abc".into(),
                created_at: Utc::now(),
                expires_at: Utc::now() + chrono::Duration::seconds(300),
            })
            .await
            .unwrap();

        let payload = svc.consume(&token, user, RequestMeta::default()).await.unwrap();
        assert_eq!(payload.file_id, file);

        let second = svc.consume(&token, user, RequestMeta::default()).await;
        assert!(matches!(second, Err(Error::TokenExpired)));
    }

    #[tokio::test]
    async fn consume_rejects_wrong_user() {
        let svc = service();
        let owner = Uuid::now_v7();
        let other = Uuid::now_v7();

        let token = svc
            .create_token(|token| TokenPayload {
                token,
                user_id: owner,
                file_id: Uuid::now_v7(),
                version_number: 1,
                project_id: Uuid::now_v7(),
                file_name: "x.txt".into(),
                mime_type: "text/plain".into(),
                content_hash: "abc".into(),
                created_at: Utc::now(),
                expires_at: Utc::now() + chrono::Duration::seconds(300),
            })
            .await
            .unwrap();

        let result = svc.consume(&token, other, RequestMeta::default()).await;
        assert!(matches!(result, Err(Error::TokenUserMismatch)));
    }
}
