pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod queries;
pub mod services;
pub mod state;
pub mod validation;
pub mod workers;

pub use cache::{Cache, CacheConfig};
pub use config::Config;
pub use database::{DbConn, DbPool};
pub use error::{Error, Result, ValidationErrors};
pub use middleware::auth::AuthenticatedUser;
pub use state::AppState;
pub use workers::lock_reaper_worker;

use axum::{
    extract::Request,
    http::HeaderName,
    middleware as axum_middleware,
    middleware::Next,
    response::Response,
    routing::{delete, get, post},
    Router,
};
use secrecy::ExposeSecret;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// Stamps every request/response pair with an `x-request-id`, generating one
/// if the caller didn't send it, so logs and the audit trail can be
/// correlated back to a single HTTP call.
async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| {
            let id = Uuid::now_v7().to_string();
            req.headers_mut().insert(HeaderName::from_static("x-request-id"), id.parse().unwrap());
            id
        });

    let mut response = next.run(req).await;
    response.headers_mut().insert(HeaderName::from_static("x-request-id"), request_id.parse().unwrap());
    response
}

/// Load configuration from environment variables.
pub fn load_config() -> Result<Config> {
    Ok(Config::load()?)
}

/// Initialize the tracing subscriber, honoring `RUST_LOG` if set.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}

/// Builds the `/api/v1` router. Reused by the running server and by tests
/// so both exercise exactly the same route table.
pub fn create_api_router(state: AppState) -> Router<AppState> {
    let authenticated = Router::new()
        .route("/projects", post(handlers::projects::create_project))
        .route("/projects/{id}", get(handlers::projects::get_project))
        .route("/projects/{id}/compliance-report", get(handlers::projects::compliance_report))
        .route("/projects/{id}/files", post(handlers::files::create_file))
        .route("/files/{id}/checkout", post(handlers::files::checkout))
        .route("/files/{id}/checkin", post(handlers::files::checkin))
        .route("/files/{id}/lock", delete(handlers::files::release_lock))
        .route("/files/{id}", delete(handlers::files::delete_file))
        .route("/files/{id}/download-token", post(handlers::download::create_download_token))
        .route("/download/{token}", get(handlers::download::download))
        .route("/admin/content/{hash}/secure-delete", post(handlers::admin::secure_delete_content))
        .route("/admin/deletion-records/{id}/certificate", post(handlers::admin::generate_certificate))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::access::access_control_middleware,
        ))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::service_auth_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .merge(authenticated)
}

/// Starts the HTTP server: connects the database, spawns background
/// workers, and serves the `/api/v1` surface until a shutdown signal.
pub async fn run_api_server(config: Config) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let pool = DbPool::connect(config.database.connection_string().expose_secret())
        .await
        .map_err(|e| Error::Internal(format!("failed to connect to database: {}", e)))?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| Error::Internal(format!("failed to run migrations: {}", e)))?;

    let app_state = AppState::new(pool, config)?;

    let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);
    let reap_interval = app_state.config.lock.reap_interval_seconds;
    tokio::spawn(lock_reaper_worker(app_state.locks.clone(), reap_interval, shutdown_tx.subscribe()));

    let api_routes = create_api_router(app_state.clone());
    let app = Router::new()
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(axum_middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown")
                        .to_string();
                    tracing::info_span!("http_request", method = %request.method(), path = %request.uri().path(), request_id)
                }))
                .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)),
        )
        .with_state(app_state);

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("filevault listening on http://{}", addr);

    let shutdown_signal = async move {
        tokio::signal::ctrl_c().await.expect("failed to install CTRL+C handler");
        tracing::info!("shutdown signal received");
        let _ = shutdown_tx.send(());
    };

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal).await?;
    Ok(())
}
