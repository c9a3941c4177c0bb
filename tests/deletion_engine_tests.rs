mod common;

use common::{seed_file, seed_project, seed_user, TestDb};
use filevault::error::Error;
use filevault::services::audit_log::AuditLog;
use filevault::services::content_store::ContentStore;
use filevault::services::deletion_engine::DeletionEngine;
use tempfile::tempdir;
use tokio::io::AsyncWriteExt;

#[tokio::test]
async fn secure_delete_is_refused_while_a_version_still_references_the_blob() {
    let db = TestDb::new("deletion_still_referenced").await;
    let user = seed_user(&db.pool, &db.team_id).await;
    let project = seed_project(&db.pool, &db.team_id, user.id).await;
    let content_hash = "1".repeat(64);
    seed_file(&db.pool, project.id, user.id, &content_hash, 4).await;

    let dir = tempdir().unwrap();
    let store = ContentStore::new(dir.path(), false, None);
    let engine = DeletionEngine::new(db.pool.clone(), store, true, AuditLog::new(db.pool.clone()));

    let err = engine.secure_delete_content(&content_hash, user.id, "no longer needed").await.unwrap_err();
    assert!(matches!(err, Error::StillReferenced(h, n) if h == content_hash && n == 1));

    db.cleanup().await;
}

#[tokio::test]
async fn secure_delete_wipes_the_blob_once_unreferenced() {
    let db = TestDb::new("deletion_wipe").await;
    let user = seed_user(&db.pool, &db.team_id).await;
    let project = seed_project(&db.pool, &db.team_id, user.id).await;

    let dir = tempdir().unwrap();
    let store = ContentStore::new(dir.path(), false, None);
    let src = dir.path().join("orphan.bin");
    tokio::fs::File::create(&src).await.unwrap().write_all(b"orphaned bytes").await.unwrap();
    let (content_hash, _size) = store.store(&src, None).await.unwrap();

    // The file row that referenced this hash is gone; the blob is an orphan.
    let file = seed_file(&db.pool, project.id, user.id, &content_hash, 14).await;
    let mut tx = db.pool.begin().await.unwrap();
    filevault::queries::files::delete_file_cascade(&mut tx, file.id).await.unwrap();
    tx.commit().await.unwrap();

    let engine = DeletionEngine::new(db.pool.clone(), store.clone(), true, AuditLog::new(db.pool.clone()));
    let record = engine.secure_delete_content(&content_hash, user.id, "orphan cleanup").await.unwrap();

    assert!(record.secure_wipe_used);
    assert!(!store.exists(&content_hash).await);

    let certificate = engine.generate_certificate(record.id).await.unwrap();
    assert_eq!(certificate.content_hash.as_deref(), Some(content_hash.as_str()));
    assert!(certificate.wipe_method.contains("DoD"));

    db.cleanup().await;
}

#[tokio::test]
async fn certificate_cannot_be_issued_before_completion() {
    let db = TestDb::new("deletion_certificate_gate").await;
    let user = seed_user(&db.pool, &db.team_id).await;

    let dir = tempdir().unwrap();
    let store = ContentStore::new(dir.path(), false, None);
    let engine = DeletionEngine::new(db.pool.clone(), store, true, AuditLog::new(db.pool.clone()));

    let mut conn = db.pool.acquire().await.unwrap();
    let record = filevault::queries::deletions::insert_record(&mut conn, Some(&"3".repeat(64)), user.id, "pending review")
        .await
        .unwrap();

    let err = engine.generate_certificate(record.id).await.unwrap_err();
    assert!(matches!(err, Error::DeletionError(_)));

    db.cleanup().await;
}
