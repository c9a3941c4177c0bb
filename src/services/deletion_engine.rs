//! Reference-counted secure erase (DoD 5220.22-M) and deletion certificates.

use crate::database::DbPool;
use crate::error::{Error, Result};
use crate::models::audit::{EventKind, RequestMeta};
use crate::models::deletion::{DeletionCertificate, DeletionRecord, DeletionStatus};
use crate::queries::{deletions, files as file_queries};
use crate::services::audit_log::AuditLog;
use crate::services::content_store::ContentStore;
use rand::TryRngCore;
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use uuid::Uuid;

const STREAM_BUF: usize = 64 * 1024;

#[derive(Debug, Default)]
pub struct ProjectDeletionReport {
    pub files_deleted: u64,
    pub blobs_deleted: u64,
    pub blob_errors: Vec<(String, String)>,
}

impl ProjectDeletionReport {
    pub fn outcome(&self) -> &'static str {
        if self.blob_errors.is_empty() {
            "SUCCESS"
        } else {
            "PARTIAL"
        }
    }
}

#[derive(Clone)]
pub struct DeletionEngine {
    pool: DbPool,
    store: ContentStore,
    secure_delete_enabled: bool,
    audit: AuditLog,
}

impl DeletionEngine {
    pub fn new(pool: DbPool, store: ContentStore, secure_delete_enabled: bool, audit: AuditLog) -> Self {
        Self {
            pool,
            store,
            secure_delete_enabled,
            audit,
        }
    }

    pub async fn secure_delete_content(
        &self,
        content_hash: &str,
        requested_by: Uuid,
        reason: &str,
    ) -> Result<DeletionRecord> {
        let mut conn = self.pool.acquire().await?;
        let refs = file_queries::count_versions_with_hash(&mut conn, content_hash).await?;
        if refs > 0 {
            return Err(Error::StillReferenced(content_hash.to_string(), refs));
        }

        let record = deletions::insert_record(&mut conn, Some(content_hash), requested_by, reason).await?;
        self.audit
            .success(EventKind::SecureDeleteStarted, Some(requested_by), None, None, RequestMeta::default())
            .await;

        match self.wipe(content_hash).await {
            Ok(secure_wipe_used) => {
                let verification_hash = Self::verification_hash(content_hash, secure_wipe_used);
                let completed =
                    deletions::mark_completed(&mut conn, record.id, secure_wipe_used, &verification_hash)
                        .await?;
                self.audit
                    .success(EventKind::SecureDeleteCompleted, Some(requested_by), None, None, RequestMeta::default())
                    .await;
                Ok(completed)
            }
            Err(e) => {
                deletions::mark_failed(&mut conn, record.id).await?;
                Err(Error::DeletionError(e.to_string()))
            }
        }
    }

    /// Returns whether a secure three-pass wipe was actually performed.
    async fn wipe(&self, content_hash: &str) -> Result<bool> {
        let path = self.store.blob_path(content_hash);
        if tokio::fs::metadata(&path).await.is_err() {
            return Ok(false);
        }

        if !self.secure_delete_enabled {
            self.store.delete(content_hash).await?;
            return Ok(false);
        }

        overwrite_dod_5220(&path).await?;
        self.store.delete(content_hash).await?;
        Ok(true)
    }

    /// `wipe_performed` selects between the two verification-hash forms: an
    /// already-absent blob never went through the overwrite pass and gets a
    /// distinct, simpler derivation from an actual wipe's.
    fn verification_hash(content_hash: &str, wipe_performed: bool) -> String {
        if !wipe_performed {
            let material = format!("already_deleted:{}{}", content_hash, chrono::Utc::now().timestamp_millis());
            return hex::encode(Sha256::digest(material.as_bytes()));
        }

        let mut rand_bytes = [0u8; 16];
        rand::rngs::OsRng
            .try_fill_bytes(&mut rand_bytes)
            .expect("os rng failure");
        let material = format!(
            "deleted:{}:{}:{}",
            content_hash,
            chrono::Utc::now().timestamp_millis(),
            hex::encode(rand_bytes)
        );
        hex::encode(Sha256::digest(material.as_bytes()))
    }

    pub async fn delete_project(
        &self,
        project_id: Uuid,
        requested_by: Uuid,
        reason: &str,
    ) -> Result<ProjectDeletionReport> {
        let mut tx = self.pool.begin().await?;
        let file_ids = file_queries::list_file_ids_for_project(&mut tx, project_id).await?;
        let content_hashes =
            file_queries::distinct_content_hashes_for_project(&mut tx, project_id).await?;

        for file_id in &file_ids {
            file_queries::delete_file_cascade(&mut tx, *file_id).await?;
        }
        sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(project_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        let mut report = ProjectDeletionReport {
            files_deleted: file_ids.len() as u64,
            ..Default::default()
        };

        for hash in content_hashes {
            let mut conn = self.pool.acquire().await?;
            let still_referenced = file_queries::count_versions_with_hash(&mut conn, &hash).await?;
            if still_referenced > 0 {
                continue;
            }
            match self
                .secure_delete_content(&hash, requested_by, &format!("project deletion: {}", reason))
                .await
            {
                Ok(_) => report.blobs_deleted += 1,
                Err(e) => report.blob_errors.push((hash, e.to_string())),
            }
        }

        Ok(report)
    }

    pub async fn generate_certificate(&self, deletion_record_id: Uuid) -> Result<DeletionCertificate> {
        let mut conn = self.pool.acquire().await?;
        let record = deletions::get_record(&mut conn, deletion_record_id)
            .await?
            .ok_or_else(|| Error::Internal("deletion record not found".into()))?;

        if !matches!(record.status, DeletionStatus::Completed | DeletionStatus::Verified) {
            return Err(Error::DeletionError(
                "certificate can only be issued for a completed deletion".into(),
            ));
        }

        deletions::mark_verified(&mut conn, record.id).await?;

        Ok(DeletionCertificate {
            certificate_id: Uuid::new_v4(),
            deletion_record_id: record.id,
            content_hash: record.content_hash,
            deleted_at: record.completed_at,
            wipe_method: if record.secure_wipe_used {
                "DoD 5220.22-M (3-pass)".to_string()
            } else {
                "Standard deletion".to_string()
            },
            verification_hash: record.verification_hash,
            requested_by: record.requested_by,
            reason: record.reason,
            generated_at: chrono::Utc::now(),
        })
    }

    pub async fn retry_deletion(&self, record_id: Uuid, requested_by: Uuid) -> Result<DeletionRecord> {
        let mut conn = self.pool.acquire().await?;
        let record = deletions::get_record(&mut conn, record_id)
            .await?
            .ok_or_else(|| Error::Internal("deletion record not found".into()))?;
        if !matches!(record.status, DeletionStatus::Failed) {
            return Err(Error::DeletionError("only failed deletions can be retried".into()));
        }
        deletions::reset_for_retry(&mut conn, record_id).await?;

        let content_hash = record
            .content_hash
            .ok_or_else(|| Error::Internal("deletion record has no content hash".into()))?;
        self.secure_delete_content(&content_hash, requested_by, &format!("Retry: {}", record.reason))
            .await
    }
}

/// Three-pass overwrite (zero, 0xFF, random), each fsync'd before the next,
/// streamed in bounded-size buffers so large files don't blow up memory.
async fn overwrite_dod_5220(path: &Path) -> Result<()> {
    let len = tokio::fs::metadata(path).await?.len();

    for pass in 0..3u8 {
        let mut file = tokio::fs::OpenOptions::new().write(true).open(path).await?;
        file.seek(std::io::SeekFrom::Start(0)).await?;

        let mut written = 0u64;
        let mut buf = vec![0u8; STREAM_BUF.min(len.max(1) as usize)];
        while written < len {
            let chunk_len = (STREAM_BUF as u64).min(len - written) as usize;
            match pass {
                0 => buf[..chunk_len].fill(0x00),
                1 => buf[..chunk_len].fill(0xFF),
                _ => rand::rngs::OsRng
                    .try_fill_bytes(&mut buf[..chunk_len])
                    .expect("os rng failure"),
            }
            file.write_all(&buf[..chunk_len]).await?;
            written += chunk_len as u64;
        }
        file.flush().await?;
        file.sync_all().await?;
    }

    tokio::fs::remove_file(path).await?;
    Ok(())
}
