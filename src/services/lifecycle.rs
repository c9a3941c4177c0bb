//! Lifecycle Coordinator: the façade external callers use. Orchestrates
//! the lock, version, content, audit, and token services in the order
//! the spec requires so no caller can observe a half-applied mutation.

use crate::database::DbPool;
use crate::error::{Error, Result};
use crate::models::audit::{EventKind, NewAuditEntry, Outcome, RequestMeta};
use crate::models::file::File;
use crate::models::lock::FileLock;
use crate::queries::files as file_queries;
use crate::services::audit_log::AuditLog;
use crate::services::content_store::ContentStore;
use crate::services::lock_manager::LockManager;
use crate::services::version_manager::VersionManager;
use crate::validation;
use serde_json::json;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Clone)]
pub struct LifecycleCoordinator {
    pool: DbPool,
    store: ContentStore,
    locks: LockManager,
    audit: AuditLog,
}

impl LifecycleCoordinator {
    pub fn new(pool: DbPool, store: ContentStore, locks: LockManager, audit: AuditLog) -> Self {
        Self {
            pool,
            store,
            locks,
            audit,
        }
    }

    async fn load_file(&self, file_id: Uuid) -> Result<File> {
        let mut conn = self.pool.acquire().await?;
        file_queries::get_file_by_id(&mut conn, file_id)
            .await?
            .ok_or(Error::FileNotFound(file_id))
    }

    pub async fn checkout(&self, file_id: Uuid, user_id: Uuid, reason: Option<&str>, meta: RequestMeta) -> Result<(File, PathBuf, FileLock)> {
        let file = self.load_file(file_id).await?;

        let lock = match self.locks.acquire(file_id, user_id, reason).await {
            Ok(lock) => lock,
            Err(e @ Error::FileLocked { .. }) => {
                self.audit
                    .denied(
                        EventKind::AccessDenied,
                        Some(user_id),
                        Some(file.project_id),
                        Some(file_id),
                        meta,
                        &e.to_string(),
                    )
                    .await;
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        let blob_path = self.store.blob_path(&file.current_content_hash);
        self.audit
            .success(EventKind::FileCheckout, Some(user_id), Some(file.project_id), Some(file_id), meta)
            .await;
        Ok((file, blob_path, lock))
    }

    /// `checkin`'s blob store happens before the transaction: a transaction
    /// failure leaves a harmless orphan blob rather than inconsistent metadata.
    pub async fn checkin(
        &self,
        file_id: Uuid,
        user_id: Uuid,
        uploaded_source_path: &Path,
        message: Option<&str>,
        meta: RequestMeta,
    ) -> Result<(File, crate::models::file::FileVersion)> {
        if let Some(m) = message {
            validation::validate_reason(m, "message", 2000)?;
        }

        let file = self.load_file(file_id).await?;
        if !self.locks.is_locked_by(file_id, user_id).await? {
            return Err(Error::Unauthorized(format!(
                "user {} does not hold the lock on file {}",
                user_id, file_id
            )));
        }

        let (content_hash, size_bytes) = self
            .store
            .store(uploaded_source_path, Some(file.project_id))
            .await?;

        let mut tx = self.pool.begin().await?;
        let (updated_file, version) = VersionManager::add_version(
            &mut tx,
            &file,
            user_id,
            &content_hash,
            size_bytes,
            message,
            Some(user_id),
        )
        .await?;
        tx.commit().await?;

        self.audit
            .success(EventKind::FileCheckin, Some(user_id), Some(file.project_id), Some(file_id), meta)
            .await;
        Ok((updated_file, version))
    }

    pub async fn create(
        &self,
        project_id: Uuid,
        name: &str,
        path: &str,
        mime_type: &str,
        source_path: &Path,
        uploader_id: Uuid,
        message: Option<&str>,
        meta: RequestMeta,
    ) -> Result<File> {
        validation::validate_file_name(name)?;
        let normalized_path = validation::normalize_path(path)?;
        validation::validate_mime_type(mime_type)?;
        if let Some(m) = message {
            validation::validate_reason(m, "message", 2000)?;
        }

        let mut conn = self.pool.acquire().await?;
        if file_queries::find_file_by_name_ci(&mut conn, project_id, name)
            .await?
            .is_some()
        {
            self.audit
                .denied(
                    EventKind::FileUpload,
                    Some(uploader_id),
                    Some(project_id),
                    None,
                    meta,
                    "a file with this name already exists in the project",
                )
                .await;
            return Err(Error::Validation(crate::error::ValidationErrors::Single {
                field: "name".to_string(),
                message: "a file with this name already exists in the project".to_string(),
            }));
        }

        let (content_hash, size_bytes) = self.store.store(source_path, Some(project_id)).await?;

        let mut tx = self.pool.begin().await?;
        let (file, _version) = file_queries::insert_file_with_first_version(
            &mut tx,
            Uuid::now_v7(),
            project_id,
            name,
            &normalized_path,
            mime_type,
            &content_hash,
            size_bytes,
            uploader_id,
            message,
        )
        .await?;
        tx.commit().await?;

        self.audit
            .success(EventKind::FileUpload, Some(uploader_id), Some(project_id), Some(file.id), meta)
            .await;
        Ok(file)
    }

    pub async fn get_version_path(&self, file_id: Uuid, version_number: Option<i32>) -> Result<PathBuf> {
        let mut conn = self.pool.acquire().await?;
        let hash = match version_number {
            Some(v) => file_queries::get_version(&mut conn, file_id, v).await?.content_hash,
            None => {
                let file = file_queries::get_file_by_id(&mut conn, file_id)
                    .await?
                    .ok_or(Error::FileNotFound(file_id))?;
                file.current_content_hash
            }
        };
        Ok(self.store.blob_path(&hash))
    }

    /// Blobs are never touched here; garbage collection is an out-of-band
    /// Deletion Engine operation so admin policy controls when wipes run.
    pub async fn delete(&self, file_id: Uuid, actor: Uuid, meta: RequestMeta) -> Result<()> {
        let file = self.load_file(file_id).await?;
        if let Some(lock) = self.locks.current(file_id).await? {
            self.audit
                .denied(
                    EventKind::FileDelete,
                    Some(actor),
                    Some(file.project_id),
                    Some(file_id),
                    meta,
                    "file is locked",
                )
                .await;
            return Err(Error::FileLocked {
                file_id,
                owner: lock.owner_id,
                locked_at: lock.acquired_at,
                expires_at: lock.expires_at,
            });
        }

        let mut tx = self.pool.begin().await?;
        file_queries::delete_file_cascade(&mut tx, file_id).await?;
        tx.commit().await?;

        self.audit
            .record(NewAuditEntry {
                event_kind: EventKind::FileDelete,
                outcome: Outcome::Success,
                user_id: Some(actor),
                project_id: Some(file.project_id),
                file_id: Some(file_id),
                file_version_id: None,
                meta,
                details: json!({}),
            })
            .await;
        Ok(())
    }
}
