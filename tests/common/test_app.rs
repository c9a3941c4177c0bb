use axum::Router;
use filevault::{create_api_router, load_config, AppState, Config, DbPool};
use reqwest::Client;
use secrecy::ExposeSecret;
use std::net::SocketAddr;
use tokio::net::TcpListener;

use super::database::init_test_pool;

/// HTTP test application: a real server bound to a random port, backed by
/// the configured Postgres database and a throwaway storage directory.
pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub config: Config,
    pub pool: DbPool,
    _storage_dir: tempfile::TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut config = load_config().expect("failed to load config");
        let storage_dir = tempfile::tempdir().expect("failed to create temp storage dir");
        config.storage.base_path = storage_dir.path().to_string_lossy().to_string();

        let pool = init_test_pool().await;

        let app_state = AppState::new(pool.clone(), config.clone()).expect("failed to build app state");

        let api_routes = create_api_router(app_state.clone());
        let app = Router::new().nest("/api/v1", api_routes).with_state(app_state);

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{port}");

        tokio::spawn(async move {
            axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
                .await
                .unwrap();
        });

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("failed to build http client");

        Self { address, client, config, pool, _storage_dir: storage_dir }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub fn service_auth_secret(&self) -> String {
        self.config.service_auth.secret.expose_secret().to_string()
    }

    pub async fn get_connection(&self) -> sqlx::pool::PoolConnection<sqlx::Postgres> {
        self.pool.acquire().await.expect("failed to acquire connection")
    }
}
