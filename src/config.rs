use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use std::fmt;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub lock: LockConfig,
    pub token: TokenConfig,
    pub deletion: DeletionConfig,
    pub server: ServerConfig,
    pub service_auth: ServiceAuthConfig,
    pub access_cache: AccessCacheConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub user: String,
    #[serde(skip_serializing)]
    pub password: SecretString,
    pub host: String,
    pub port: u16,
    pub database: String,
}

#[derive(Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Root of the content-addressed blob tree.
    pub base_path: String,
    /// "standard" or "encrypted".
    pub encryption_mode: String,
    /// Base64-encoded 32-byte master key, required when encryption_mode = "encrypted".
    #[serde(skip_serializing)]
    pub master_key_base64: SecretString,
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("base_path", &self.base_path)
            .field("encryption_mode", &self.encryption_mode)
            .field("master_key_base64", &"<REDACTED>")
            .finish()
    }
}

impl StorageConfig {
    pub fn encrypted(&self) -> bool {
        self.encryption_mode == "encrypted"
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: "./storage".to_string(),
            encryption_mode: "standard".to_string(),
            master_key_base64: SecretString::from(String::new()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LockConfig {
    pub expiry_hours: i64,
    pub reap_interval_seconds: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            expiry_hours: 24,
            reap_interval_seconds: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenConfig {
    pub expiry_seconds: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self { expiry_seconds: 300 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeletionConfig {
    pub secure_delete_enabled: bool,
    pub audit_retention_years: u32,
}

impl Default for DeletionConfig {
    fn default() -> Self {
        Self {
            secure_delete_enabled: true,
            audit_retention_years: 7,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccessCacheConfig {
    pub membership_ttl_seconds: u64,
}

impl Default for AccessCacheConfig {
    fn default() -> Self {
        Self { membership_ttl_seconds: 300 }
    }
}

#[derive(Clone, Deserialize, Serialize)]
pub struct ServiceAuthConfig {
    /// Secret used to sign/verify the internal operation-API bearer token.
    #[serde(skip_serializing)]
    pub secret: SecretString,
    pub token_expiration_minutes: i64,
}

impl fmt::Debug for ServiceAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAuthConfig")
            .field("secret", &"<REDACTED>")
            .field("token_expiration_minutes", &self.token_expiration_minutes)
            .finish()
    }
}

impl Default for ServiceAuthConfig {
    fn default() -> Self {
        Self {
            secret: SecretString::from(String::new()),
            token_expiration_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            user: "postgres".to_string(),
            password: "password".to_string().into(),
            host: "localhost".to_string(),
            port: 5432,
            database: "filevault".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, with defaults.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            // e.g. FILEVAULT__DATABASE__USER="my_user" or FILEVAULT__STORAGE__BASE_PATH=/data
            .add_source(
                config::Environment::with_prefix("FILEVAULT")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;

        config.validate().map_err(|e| {
            config::ConfigError::Message(format!("Configuration validation failed: {}", e))
        })?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        let secret = self.service_auth.secret.expose_secret();
        if secret.len() < 32 {
            return Err(format!(
                "FILEVAULT__SERVICE_AUTH__SECRET must be at least 32 characters (got {} chars).",
                secret.len()
            )
            .into());
        }

        let weak_patterns = ["change-this", "secret", "password", "123456", "example"];
        for pattern in weak_patterns {
            if secret.to_lowercase().contains(pattern) {
                return Err(format!(
                    "FILEVAULT__SERVICE_AUTH__SECRET contains weak pattern '{}'. Use a cryptographically random secret.",
                    pattern
                )
                .into());
            }
        }

        if self.storage.encrypted() {
            use base64::Engine;
            let key = self.storage.master_key_base64.expose_secret();
            let decoded = base64::engine::general_purpose::STANDARD
                .decode(key)
                .map_err(|e| format!("FILEVAULT__STORAGE__MASTER_KEY_BASE64 is not valid base64: {}", e))?;
            if decoded.len() != 32 {
                return Err(format!(
                    "FILEVAULT__STORAGE__MASTER_KEY_BASE64 must decode to exactly 32 bytes (got {})",
                    decoded.len()
                )
                .into());
            }
        }

        Ok(())
    }
}

impl DatabaseConfig {
    pub fn connection_string(&self) -> SecretString {
        SecretString::from(format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user,
            self.password.expose_secret(),
            self.host,
            self.port,
            self.database
        ))
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string_pretty(&self) {
            Ok(json) => write!(f, "{}", json),
            Err(_) => write!(f, "Error serializing config"),
        }
    }
}
