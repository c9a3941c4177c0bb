use filevault::load_config;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use std::sync::Once;

static INIT: Once = Once::new();

/// Connects to the configured Postgres database and runs migrations.
/// Tests own a fresh `platform_team_id` namespace, so no global reset is needed.
pub async fn init_test_pool() -> PgPool {
    INIT.call_once(|| {
        dotenvy::dotenv().ok();
    });

    let config = load_config().expect("failed to load config");
    let pool = PgPool::connect(config.database.connection_string().expose_secret())
        .await
        .expect("failed to connect to database");

    sqlx::migrate!("./migrations").run(&pool).await.expect("failed to run migrations");

    pool
}

/// A database handle scoped to one test's `platform_team_id` namespace.
/// Every row created under that team id is removed on cleanup.
pub struct TestDb {
    pub pool: PgPool,
    pub team_id: String,
}

impl TestDb {
    pub async fn new(test_name: &str) -> Self {
        let pool = init_test_pool().await;
        let team_id = format!("test-team-{}-{}", test_name, uuid::Uuid::now_v7());
        Self { pool, team_id }
    }

    pub async fn get_connection(&self) -> sqlx::pool::PoolConnection<sqlx::Postgres> {
        self.pool.acquire().await.expect("failed to acquire connection")
    }

    /// Tears down everything created under this test's team namespace, in
    /// FK-safe order: audit trail, deletion records, then projects (which
    /// cascade to files/versions/locks/references), then users.
    pub async fn cleanup(&self) {
        let user_ids: Vec<uuid::Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE platform_team_id = $1")
            .bind(&self.team_id)
            .fetch_all(&self.pool)
            .await
            .unwrap_or_default();

        sqlx::query("DELETE FROM audit_log WHERE project_id IN (SELECT id FROM projects WHERE platform_team_id = $1)")
            .bind(&self.team_id)
            .execute(&self.pool)
            .await
            .ok();
        for id in &user_ids {
            sqlx::query("DELETE FROM deletion_records WHERE requested_by = $1")
                .bind(id)
                .execute(&self.pool)
                .await
                .ok();
        }
        sqlx::query("DELETE FROM projects WHERE platform_team_id = $1")
            .bind(&self.team_id)
            .execute(&self.pool)
            .await
            .ok();
        sqlx::query("DELETE FROM users WHERE platform_team_id = $1")
            .bind(&self.team_id)
            .execute(&self.pool)
            .await
            .ok();
    }
}

impl Drop for TestDb {
    fn drop(&mut self) {
        let pool = self.pool.clone();
        let team_id = self.team_id.clone();
        tokio::spawn(async move {
            let _ = sqlx::query(
                "DELETE FROM audit_log WHERE project_id IN (SELECT id FROM projects WHERE platform_team_id = $1)",
            )
            .bind(&team_id)
            .execute(&pool)
            .await;
            let _ = sqlx::query("DELETE FROM projects WHERE platform_team_id = $1")
                .bind(&team_id)
                .execute(&pool)
                .await;
            let _ = sqlx::query("DELETE FROM users WHERE platform_team_id = $1")
                .bind(&team_id)
                .execute(&pool)
                .await;
        });
    }
}
