use crate::cache::{Cache, CacheConfig};
use crate::config::Config;
use crate::database::DbPool;
use crate::error::{Error, Result};
use crate::services::access::{AllowAllOracle, CachedAccessOracle};
use crate::services::audit_log::AuditLog;
use crate::services::content_store::ContentStore;
use crate::services::deletion_engine::DeletionEngine;
use crate::services::lifecycle::LifecycleCoordinator;
use crate::services::lock_manager::LockManager;
use crate::services::token_service::TokenService;
use std::sync::Arc;

/// Shared state handed to every axum handler via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<Config>,
    pub store: ContentStore,
    pub locks: LockManager,
    pub audit: AuditLog,
    pub lifecycle: LifecycleCoordinator,
    pub deletion: DeletionEngine,
    pub tokens: TokenService,
    pub access: Arc<CachedAccessOracle<AllowAllOracle>>,
}

impl AppState {
    pub fn new(pool: DbPool, config: Config) -> Result<Self> {
        let config = Arc::new(config);

        let master_key = if config.storage.encrypted() {
            Some(decode_master_key(&config)?)
        } else {
            None
        };
        let store = ContentStore::new(config.storage.base_path.clone(), config.storage.encrypted(), master_key);

        let audit = AuditLog::new(pool.clone());
        let locks = LockManager::new(pool.clone(), config.lock.expiry_hours, audit.clone());
        let lifecycle = LifecycleCoordinator::new(pool.clone(), store.clone(), locks.clone(), audit.clone());
        let deletion = DeletionEngine::new(pool.clone(), store.clone(), config.deletion.secure_delete_enabled, audit.clone());

        let token_store: Cache<String> = Cache::new_local(CacheConfig::default());
        let tokens = TokenService::new(token_store, config.token.expiry_seconds, audit.clone());

        let access_cache: Cache<bool> = Cache::new_local(CacheConfig {
            cleanup_interval_seconds: 60,
            default_ttl_seconds: Some(config.access_cache.membership_ttl_seconds),
        });
        let access = Arc::new(CachedAccessOracle::new(AllowAllOracle, access_cache));

        Ok(Self {
            pool,
            config,
            store,
            locks,
            audit,
            lifecycle,
            deletion,
            tokens,
            access,
        })
    }
}

fn decode_master_key(config: &Config) -> Result<[u8; 32]> {
    use base64::Engine;
    use secrecy::ExposeSecret;

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(config.storage.master_key_base64.expose_secret())
        .map_err(|e| Error::Internal(format!("invalid master key base64: {}", e)))?;
    decoded
        .try_into()
        .map_err(|_| Error::Internal("master key must decode to 32 bytes".into()))
}
