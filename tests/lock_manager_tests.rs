mod common;

use common::{seed_file, seed_project, seed_user, TestDb};
use filevault::error::Error;
use filevault::services::audit_log::AuditLog;
use filevault::services::lock_manager::LockManager;

#[tokio::test]
async fn acquire_is_idempotent_for_the_same_owner() {
    let db = TestDb::new("lock_acquire_idempotent").await;
    let user = seed_user(&db.pool, &db.team_id).await;
    let project = seed_project(&db.pool, &db.team_id, user.id).await;
    let file = seed_file(&db.pool, project.id, user.id, &"a".repeat(64), 10).await;

    let locks = LockManager::new(db.pool.clone(), 24, AuditLog::new(db.pool.clone()));
    let first = locks.acquire(file.id, user.id, Some("editing")).await.unwrap();
    let second = locks.acquire(file.id, user.id, Some("still editing")).await.unwrap();

    assert_eq!(first.owner_id, second.owner_id);
    assert!(second.acquired_at >= first.acquired_at);

    db.cleanup().await;
}

#[tokio::test]
async fn second_owner_is_rejected_while_lock_is_live() {
    let db = TestDb::new("lock_contention").await;
    let owner = seed_user(&db.pool, &db.team_id).await;
    let other = seed_user(&db.pool, &db.team_id).await;
    let project = seed_project(&db.pool, &db.team_id, owner.id).await;
    let file = seed_file(&db.pool, project.id, owner.id, &"b".repeat(64), 10).await;

    let locks = LockManager::new(db.pool.clone(), 24, AuditLog::new(db.pool.clone()));
    locks.acquire(file.id, owner.id, None).await.unwrap();

    let err = locks.acquire(file.id, other.id, None).await.unwrap_err();
    assert!(matches!(err, Error::FileLocked { owner: o, .. } if o == owner.id));

    db.cleanup().await;
}

#[tokio::test]
async fn zero_expiry_hours_makes_locks_immediately_stealable() {
    let db = TestDb::new("lock_zero_expiry").await;
    let owner = seed_user(&db.pool, &db.team_id).await;
    let other = seed_user(&db.pool, &db.team_id).await;
    let project = seed_project(&db.pool, &db.team_id, owner.id).await;
    let file = seed_file(&db.pool, project.id, owner.id, &"c".repeat(64), 10).await;

    let locks = LockManager::new(db.pool.clone(), 0, AuditLog::new(db.pool.clone()));
    locks.acquire(file.id, owner.id, None).await.unwrap();

    // An already-expired lock is transparently stolen on the next acquire.
    let stolen = locks.acquire(file.id, other.id, None).await.unwrap();
    assert_eq!(stolen.owner_id, other.id);

    db.cleanup().await;
}

#[tokio::test]
async fn release_requires_ownership() {
    let db = TestDb::new("lock_release_ownership").await;
    let owner = seed_user(&db.pool, &db.team_id).await;
    let other = seed_user(&db.pool, &db.team_id).await;
    let project = seed_project(&db.pool, &db.team_id, owner.id).await;
    let file = seed_file(&db.pool, project.id, owner.id, &"d".repeat(64), 10).await;

    let locks = LockManager::new(db.pool.clone(), 24, AuditLog::new(db.pool.clone()));
    locks.acquire(file.id, owner.id, None).await.unwrap();

    let err = locks.release(file.id, other.id).await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));

    locks.release(file.id, owner.id).await.unwrap();
    assert!(!locks.is_locked(file.id).await.unwrap());

    db.cleanup().await;
}

#[tokio::test]
async fn reap_expired_clears_only_expired_locks() {
    let db = TestDb::new("lock_reap").await;
    let owner = seed_user(&db.pool, &db.team_id).await;
    let project = seed_project(&db.pool, &db.team_id, owner.id).await;
    let expired_file = seed_file(&db.pool, project.id, owner.id, &"e".repeat(64), 10).await;
    let live_file = seed_file(&db.pool, project.id, owner.id, &"f".repeat(64), 10).await;

    let expiring_now = LockManager::new(db.pool.clone(), 0, AuditLog::new(db.pool.clone()));
    expiring_now.acquire(expired_file.id, owner.id, None).await.unwrap();

    let long_lived = LockManager::new(db.pool.clone(), 24, AuditLog::new(db.pool.clone()));
    long_lived.acquire(live_file.id, owner.id, None).await.unwrap();

    let reaped = long_lived.reap_expired().await.unwrap();
    assert_eq!(reaped, 1);
    assert!(long_lived.is_locked(live_file.id).await.unwrap());

    db.cleanup().await;
}
