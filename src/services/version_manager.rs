//! Creates immutable file versions and advances the file's current-version pointer.

use crate::error::Result;
use crate::models::file::{File, FileVersion};
use crate::queries::{files, locks};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

pub struct VersionManager;

impl VersionManager {
    /// Appends a new version inside the caller's transaction. When `release_lock_owner`
    /// is set, the file's lock is deleted as part of the same atomic unit (checkin).
    pub async fn add_version(
        tx: &mut Transaction<'_, Postgres>,
        file: &File,
        uploader_id: Uuid,
        content_hash: &str,
        size_bytes: i64,
        message: Option<&str>,
        release_lock_owner: Option<Uuid>,
    ) -> Result<(File, FileVersion)> {
        let new_version_number = file.current_version + 1;

        let version = files::insert_version(
            tx,
            file.id,
            new_version_number,
            content_hash,
            size_bytes,
            uploader_id,
            message,
        )
        .await?;

        let updated_file =
            files::advance_current_version(tx, file.id, new_version_number, content_hash, size_bytes)
                .await?;

        if let Some(owner) = release_lock_owner {
            let lock = locks::get_lock_for_update(tx, file.id).await?;
            match lock {
                Some(l) if l.owner_id == owner => {
                    locks::delete_lock(tx, file.id).await?;
                }
                Some(l) => {
                    return Err(crate::error::Error::Unauthorized(format!(
                        "file {} is locked by {}, not {}",
                        file.id, l.owner_id, owner
                    )));
                }
                None => {}
            }
        }

        Ok((updated_file, version))
    }
}
