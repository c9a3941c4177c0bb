//! Shared test helper functions.

use filevault::database::DbPool;
use filevault::models::file::File;
use filevault::models::project::{NewProject, Project};
use filevault::models::user::{NewUser, User};
use filevault::queries;
use filevault::services::service_auth::generate_service_token;
use uuid::Uuid;

/// A fresh, collision-free platform user id for one test case.
pub fn unique_platform_user_id() -> String {
    format!("U{}", uuid::Uuid::now_v7().simple())
}

/// A fresh, collision-free hub channel id for one test project.
pub fn unique_channel_id() -> String {
    format!("C{}", uuid::Uuid::now_v7().simple())
}

/// Signs a service token for the given platform identity using the test
/// config's secret, so handler tests exercise real JWT verification.
pub fn issue_service_token(secret: &str, platform_user_id: &str, platform_team_id: &str, admin: bool) -> String {
    generate_service_token(platform_user_id, platform_team_id, admin, secret, 15)
        .expect("failed to sign test service token")
}

/// Inserts a throwaway user row for service-level tests that bypass HTTP.
pub async fn seed_user(pool: &DbPool, team_id: &str) -> User {
    let mut conn = pool.acquire().await.unwrap();
    queries::users::create_user(
        &mut conn,
        &NewUser {
            platform_user_id: unique_platform_user_id(),
            platform_team_id: team_id.to_string(),
            display_name: "Test User".to_string(),
            email: None,
            avatar_url: None,
        },
    )
    .await
    .unwrap()
}

/// Inserts a throwaway project row for service-level tests that bypass HTTP.
pub async fn seed_project(pool: &DbPool, team_id: &str, created_by: Uuid) -> Project {
    let mut conn = pool.acquire().await.unwrap();
    queries::projects::create_project(
        &mut conn,
        &NewProject {
            name: "Seed Project".to_string(),
            platform_team_id: team_id.to_string(),
            hub_channel_id: unique_channel_id(),
            created_by,
        },
    )
    .await
    .unwrap()
}

/// Inserts a file (with its first version) holding `content`, for service-level tests.
pub async fn seed_file(pool: &DbPool, project_id: Uuid, created_by: Uuid, content_hash: &str, size_bytes: i64) -> File {
    let mut tx = pool.begin().await.unwrap();
    let (file, _version) = queries::files::insert_file_with_first_version(
        &mut tx,
        Uuid::now_v7(),
        project_id,
        "seed.bin",
        "/seed.bin",
        "application/octet-stream",
        content_hash,
        size_bytes,
        created_by,
        None,
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();
    file
}
