//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::admin::ReorderMode;
use crate::feed::FeedConfig;
use crate::payment::BankDetails;
use crate::pricing::PriceSource;
use crate::session::{
    AdminCredentials, ADMIN_PASSWORD_ENV, ADMIN_USERNAME_ENV, DEFAULT_ADMIN_PASSWORD,
    DEFAULT_ADMIN_USERNAME,
};
use crate::store::RestStoreConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub admin: AdminConfig,

    #[serde(default)]
    pub pricing: PricingConfig,

    #[serde(default)]
    pub feed: FeedSettings,

    #[serde(default)]
    pub payment: BankDetails,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which table store to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Rest,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "rest" => Ok(StoreBackend::Rest),
            other => Err(format!("unknown store backend: {}", other)),
        }
    }
}

/// Table store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// SQLite database file
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,

    /// Insert the default batch and details rows into an empty database
    #[serde(default = "default_seed_on_open")]
    pub seed_on_open: bool,

    /// Hosted store project URL
    #[serde(default)]
    pub url: String,

    /// Hosted store public API key
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_store_timeout")]
    pub request_timeout_ms: u64,
}

fn default_sqlite_path() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("batchboard").join("batchboard.db").to_string_lossy().to_string())
        .unwrap_or_else(|| "./batchboard.db".to_string())
}

fn default_seed_on_open() -> bool {
    true
}

fn default_store_timeout() -> u64 {
    5000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            sqlite_path: default_sqlite_path(),
            seed_on_open: default_seed_on_open(),
            url: String::new(),
            api_key: String::new(),
            request_timeout_ms: default_store_timeout(),
        }
    }
}

impl StoreConfig {
    pub fn rest(&self) -> RestStoreConfig {
        RestStoreConfig {
            url: self.url.clone(),
            api_key: self.api_key.clone(),
            request_timeout_ms: self.request_timeout_ms,
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8082
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
    ]
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl ApiConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Admin page configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    #[serde(default = "default_admin_username")]
    pub username: String,

    #[serde(default = "default_admin_password")]
    pub password: String,

    #[serde(default)]
    pub reorder_mode: ReorderMode,
}

fn default_admin_username() -> String {
    DEFAULT_ADMIN_USERNAME.to_string()
}

fn default_admin_password() -> String {
    DEFAULT_ADMIN_PASSWORD.to_string()
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: default_admin_username(),
            password: default_admin_password(),
            reorder_mode: ReorderMode::default(),
        }
    }
}

impl AdminConfig {
    pub fn credentials(&self) -> AdminCredentials {
        AdminCredentials::new(self.username.clone(), self.password.clone())
    }
}

/// Live price sources for each surface
#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    #[serde(default)]
    pub public: PriceSource,

    #[serde(default = "default_admin_price")]
    pub admin: PriceSource,
}

fn default_admin_price() -> PriceSource {
    PriceSource::Stored
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            public: PriceSource::default(),
            admin: default_admin_price(),
        }
    }
}

/// Change feed configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedSettings {
    #[serde(default = "default_max_subscribers")]
    pub max_subscribers: usize,
}

fn default_max_subscribers() -> usize {
    FeedConfig::default().max_subscribers
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            max_subscribers: default_max_subscribers(),
        }
    }
}

impl From<&FeedSettings> for FeedConfig {
    fn from(settings: &FeedSettings) -> Self {
        FeedConfig {
            max_subscribers: settings.max_subscribers,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Defaults plus environment variable overrides
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("batchboard").join("config.toml")),
            Some(PathBuf::from("/etc/batchboard/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Store overrides
        if let Some(backend) = var("BATCHBOARD_STORE_BACKEND") {
            match backend.parse() {
                Ok(b) => self.store.backend = b,
                Err(e) => tracing::warn!("Ignoring BATCHBOARD_STORE_BACKEND: {}", e),
            }
        }
        if let Some(path) = var("BATCHBOARD_SQLITE_PATH") {
            self.store.sqlite_path = path;
        }
        if let Some(url) = var("BATCHBOARD_STORE_URL") {
            self.store.url = url;
        }
        if let Some(key) = var("BATCHBOARD_STORE_KEY") {
            self.store.api_key = key;
        }

        // API overrides
        if let Some(host) = var("BATCHBOARD_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = var("BATCHBOARD_API_PORT") {
            if let Ok(p) = port.parse() {
                self.api.port = p;
            }
        }

        // Admin login
        if let Some(username) = var(ADMIN_USERNAME_ENV).filter(|v| !v.is_empty()) {
            self.admin.username = username;
        }
        if let Some(password) = var(ADMIN_PASSWORD_ENV).filter(|v| !v.is_empty()) {
            self.admin.password = password;
        }

        // Logging overrides
        if let Some(level) = var("BATCHBOARD_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("BATCHBOARD_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Batchboard Configuration
#
# Environment variables override these settings:
# - BATCHBOARD_STORE_BACKEND
# - BATCHBOARD_SQLITE_PATH
# - BATCHBOARD_STORE_URL
# - BATCHBOARD_STORE_KEY
# - BATCHBOARD_API_HOST
# - BATCHBOARD_API_PORT
# - BATCHBOARD_LOG_LEVEL
# - BATCHBOARD_LOG_FORMAT
# - ADMIN_USERNAME
# - ADMIN_PASSWORD

[store]
# Backend: sqlite (local file) or rest (hosted table API)
backend = "sqlite"

# SQLite database file
sqlite_path = "~/.local/share/batchboard/batchboard.db"

# Create the default batch and details rows in an empty database
seed_on_open = true

# Hosted table API (backend = "rest")
url = ""
api_key = ""
request_timeout_ms = 5000

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 8082

# Allowed CORS origins
cors_origins = ["http://localhost:3000", "http://127.0.0.1:3000"]

[admin]
# Admin login (change these)
username = "admin"
password = "ceyloncare2025"

# Document reorder writes: sequential (two updates) or atomic (one transaction)
reorder_mode = "sequential"

[pricing.public]
# Live price on public panels: static (fixed price) or stored (batch current_price)
source = "static"
price = 1.00

[pricing.admin]
source = "stored"

[feed]
# Maximum concurrent change feed subscriptions
max_subscribers = 1000

[payment]
# Bank account shown on the payment page
account_name = "EXAMPLE HOLDINGS LTD"
account_number = "00000000"
sort_code = "00-00-00"
iban = "GB00XXXX00000000000000"
swift_bic = "XXXXGB00"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert!(config.store.seed_on_open);
        assert_eq!(config.api.port, 8082);
        assert_eq!(config.admin.username, "admin");
        assert_eq!(config.admin.reorder_mode, ReorderMode::Sequential);
        assert_eq!(config.pricing.public, PriceSource::Static { price: 1.0 });
        assert_eq!(config.pricing.admin, PriceSource::Stored);
        assert_eq!(config.feed.max_subscribers, 1000);
    }

    #[test]
    fn test_generated_config_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config.api.port, 8082);
        assert_eq!(config.pricing.public, PriceSource::Static { price: 1.0 });
        assert_eq!(config.pricing.admin, PriceSource::Stored);
        assert_eq!(config.payment, BankDetails::default());
        assert!(config.admin.credentials().validate("admin", "ceyloncare2025"));
    }

    #[test]
    fn test_partial_config() {
        let config: Config = toml::from_str(
            r#"
            [store]
            backend = "rest"
            url = "https://project.example.co"

            [admin]
            password = "hunter2"
            reorder_mode = "atomic"
            "#,
        )
        .unwrap();

        assert_eq!(config.store.backend, StoreBackend::Rest);
        assert_eq!(config.store.rest().url, "https://project.example.co");
        assert_eq!(config.admin.username, "admin");
        assert_eq!(config.admin.password, "hunter2");
        assert_eq!(config.admin.reorder_mode, ReorderMode::Atomic);
        assert_eq!(config.api.port, 8082);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("BATCHBOARD_STORE_BACKEND", "rest"),
            ("BATCHBOARD_API_PORT", "9000"),
            ("ADMIN_USERNAME", "ops"),
            ("ADMIN_PASSWORD", ""),
            ("BATCHBOARD_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.store.backend, StoreBackend::Rest);
        assert_eq!(config.api.port, 9000);
        assert_eq!(config.admin.username, "ops");
        assert_eq!(config.admin.password, "ceyloncare2025");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_load_errors() {
        let err = Config::load(Path::new("/nonexistent/batchboard.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[api]\nport = \"not a number\"").unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
