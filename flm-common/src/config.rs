//! Configuration loading and runtime settings
//!
//! Two layers:
//! 1. **Bootstrap**: resolved once at startup with priority
//!    CLI argument → environment variable → TOML file → compiled default.
//! 2. **Runtime overrides**: connection settings changed through the API while
//!    the server runs. They live in an explicit [`SettingsContext`] owned by the
//!    caller; every request takes a [`Settings`] snapshot and passes it on.
//!
//! Matching thresholds are deliberately absent here: they are request parameters.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

/// Environment variable naming the TOML config file
pub const CONFIG_ENV_VAR: &str = "FLM_CONFIG";

pub const ENV_LEGACY_DB: &str = "FLM_LEGACY_DB";
pub const ENV_MODERN_DB_HOST: &str = "FLM_MODERN_DB_HOST";
pub const ENV_MODERN_DB_PORT: &str = "FLM_MODERN_DB_PORT";
pub const ENV_MODERN_DB_NAME: &str = "FLM_MODERN_DB_NAME";
pub const ENV_MODERN_DB_USER: &str = "FLM_MODERN_DB_USER";
pub const ENV_MODERN_DB_PASSWORD: &str = "FLM_MODERN_DB_PASSWORD";
pub const ENV_MODERN_API_URL: &str = "FLM_MODERN_API_URL";
pub const ENV_MODERN_API_KEY: &str = "FLM_MODERN_API_KEY";

/// Bootstrap configuration as written in `flm.toml`
///
/// Every field is optional; absent values fall through to compiled defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct TomlConfig {
    /// Path to the legacy SQLite database
    #[serde(default)]
    pub legacy_db: Option<PathBuf>,

    #[serde(default)]
    pub modern_db: ModernDbToml,

    #[serde(default)]
    pub modern_api: ModernApiToml,

    #[serde(default)]
    pub server: ServerToml,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Container path prefix → local path prefix
    #[serde(default)]
    pub path_mappings: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ModernDbToml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub name: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ModernApiToml {
    pub url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ServerToml {
    /// Socket address the HTTP server binds to
    pub bind: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Built-in defaults used when no other source provides a value
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub legacy_db: PathBuf,
    pub modern_db_host: String,
    pub modern_db_port: u16,
    pub modern_db_name: String,
    pub modern_db_user: String,
    pub modern_api_url: String,
    pub bind: String,
    pub log_level: String,
}

impl Default for CompiledDefaults {
    fn default() -> Self {
        Self {
            legacy_db: PathBuf::from("MediaDb.v1.sqlite"),
            modern_db_host: "localhost".to_string(),
            modern_db_port: 5432,
            modern_db_name: "immich".to_string(),
            modern_db_user: "postgres".to_string(),
            modern_api_url: "http://localhost:2283".to_string(),
            bind: "127.0.0.1:5730".to_string(),
            log_level: default_log_level(),
        }
    }
}

/// Values supplied on the command line (highest priority)
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub legacy_db: Option<PathBuf>,
    pub modern_db_host: Option<String>,
    pub modern_db_port: Option<u16>,
    pub modern_db_name: Option<String>,
    pub modern_db_user: Option<String>,
    pub modern_api_url: Option<String>,
    pub bind: Option<String>,
    pub log_level: Option<String>,
}

/// Connection settings for the modern PostgreSQL database
#[derive(Debug, Clone, PartialEq)]
pub struct ModernDbSettings {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
}

impl ModernDbSettings {
    /// Connection URL with the password masked, for logs
    pub fn display_url(&self) -> String {
        format!(
            "postgresql://{}:***@{}:{}/{}",
            self.user, self.host, self.port, self.name
        )
    }
}

/// Connection settings for the modern server's REST API
#[derive(Debug, Clone, PartialEq)]
pub struct ModernApiSettings {
    pub url: String,
    pub api_key: String,
}

/// Fully resolved settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub legacy_db: PathBuf,
    pub modern_db: ModernDbSettings,
    pub modern_api: ModernApiSettings,
    pub bind: String,
    pub log_level: String,
    pub path_mappings: BTreeMap<String, String>,
}

impl Settings {
    /// Resolve settings from CLI, environment, TOML and compiled defaults
    pub fn resolve(cli: &CliOverrides, toml: &TomlConfig) -> Result<Self> {
        let defaults = CompiledDefaults::default();

        let port = match cli.modern_db_port {
            Some(port) => port,
            None => match env_value(ENV_MODERN_DB_PORT) {
                Some(raw) => raw.parse::<u16>().map_err(|e| {
                    Error::Config(format!("{} is not a valid port ({}): {}", ENV_MODERN_DB_PORT, raw, e))
                })?,
                None => toml.modern_db.port.unwrap_or(defaults.modern_db_port),
            },
        };

        Ok(Self {
            legacy_db: cli
                .legacy_db
                .clone()
                .or_else(|| env_value(ENV_LEGACY_DB).map(PathBuf::from))
                .or_else(|| toml.legacy_db.clone())
                .unwrap_or(defaults.legacy_db),
            modern_db: ModernDbSettings {
                host: pick(&cli.modern_db_host, ENV_MODERN_DB_HOST, &toml.modern_db.host)
                    .unwrap_or(defaults.modern_db_host),
                port,
                name: pick(&cli.modern_db_name, ENV_MODERN_DB_NAME, &toml.modern_db.name)
                    .unwrap_or(defaults.modern_db_name),
                user: pick(&cli.modern_db_user, ENV_MODERN_DB_USER, &toml.modern_db.user)
                    .unwrap_or(defaults.modern_db_user),
                // Secrets are never taken from the command line
                password: pick(&None, ENV_MODERN_DB_PASSWORD, &toml.modern_db.password)
                    .unwrap_or_default(),
            },
            modern_api: ModernApiSettings {
                url: pick(&cli.modern_api_url, ENV_MODERN_API_URL, &toml.modern_api.url)
                    .unwrap_or(defaults.modern_api_url),
                api_key: pick(&None, ENV_MODERN_API_KEY, &toml.modern_api.api_key)
                    .unwrap_or_default(),
            },
            bind: cli
                .bind
                .clone()
                .or_else(|| toml.server.bind.clone())
                .unwrap_or(defaults.bind),
            log_level: cli
                .log_level
                .clone()
                .unwrap_or_else(|| toml.logging.level.clone()),
            path_mappings: toml.path_mappings.clone(),
        })
    }

    /// Translate a modern-server container path into a local path
    ///
    /// The first configured prefix that matches wins; unmatched paths pass through.
    pub fn map_path(&self, path: &str) -> String {
        for (container, local) in &self.path_mappings {
            if let Some(rest) = path.strip_prefix(container.as_str()) {
                return format!("{}{}", local, rest);
            }
        }
        path.to_string()
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn pick(cli: &Option<String>, env_name: &str, toml: &Option<String>) -> Option<String> {
    cli.clone()
        .or_else(|| env_value(env_name))
        .or_else(|| toml.clone())
}

/// Locate the TOML config file
///
/// Priority: explicit path → `FLM_CONFIG` → `<config_dir>/flm/flm.toml` if present.
pub fn locate_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = env_value(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir()
        .map(|d| d.join("flm").join("flm.toml"))
        .filter(|p| p.exists())
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load the TOML config if one exists
///
/// A missing file is not an error: a warning is logged and defaults are used.
/// A file that exists but does not parse is an error.
pub fn load_or_default(path: Option<&Path>) -> Result<TomlConfig> {
    match path {
        Some(p) if p.exists() => {
            let config = load_toml_config(p)?;
            info!("Loaded configuration from {}", p.display());
            Ok(config)
        }
        Some(p) => {
            warn!("Config file {} not found, using defaults", p.display());
            Ok(TomlConfig::default())
        }
        None => {
            info!("No config file found, using environment and defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Connection settings changed at runtime through the API
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuntimeOverrides {
    pub legacy_db: Option<PathBuf>,
    pub modern_api_url: Option<String>,
    pub modern_api_key: Option<String>,
    pub modern_db_host: Option<String>,
    pub modern_db_port: Option<u16>,
    pub modern_db_name: Option<String>,
    pub modern_db_user: Option<String>,
    pub modern_db_password: Option<String>,
}

impl RuntimeOverrides {
    fn has_modern_db(&self) -> bool {
        self.modern_db_host.is_some()
            || self.modern_db_port.is_some()
            || self.modern_db_name.is_some()
            || self.modern_db_user.is_some()
            || self.modern_db_password.is_some()
    }
}

/// Partial update of the modern database connection
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModernDbUpdate {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub name: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// Bootstrap settings plus runtime overrides
///
/// Cloning shares the override store, so every clone observes updates.
#[derive(Debug, Clone)]
pub struct SettingsContext {
    base: Arc<Settings>,
    overrides: Arc<RwLock<RuntimeOverrides>>,
}

impl SettingsContext {
    pub fn new(base: Settings) -> Self {
        Self {
            base: Arc::new(base),
            overrides: Arc::new(RwLock::new(RuntimeOverrides::default())),
        }
    }

    /// Effective settings at this instant
    pub fn snapshot(&self) -> Settings {
        let overrides = self.read_overrides();
        let mut settings = (*self.base).clone();

        if let Some(path) = overrides.legacy_db {
            settings.legacy_db = path;
        }
        if let Some(url) = overrides.modern_api_url {
            settings.modern_api.url = url;
        }
        if let Some(key) = overrides.modern_api_key {
            settings.modern_api.api_key = key;
        }
        if let Some(host) = overrides.modern_db_host {
            settings.modern_db.host = host;
        }
        if let Some(port) = overrides.modern_db_port {
            settings.modern_db.port = port;
        }
        if let Some(name) = overrides.modern_db_name {
            settings.modern_db.name = name;
        }
        if let Some(user) = overrides.modern_db_user {
            settings.modern_db.user = user;
        }
        if let Some(password) = overrides.modern_db_password {
            settings.modern_db.password = password;
        }
        settings
    }

    pub fn set_legacy_db(&self, path: PathBuf) {
        info!("Legacy database override: {}", path.display());
        self.write_overrides().legacy_db = Some(path);
    }

    pub fn set_modern_api(&self, url: Option<String>, api_key: Option<String>) {
        let mut overrides = self.write_overrides();
        if let Some(url) = url {
            info!("Modern API URL override: {}", url);
            overrides.modern_api_url = Some(url);
        }
        if api_key.is_some() {
            info!("Modern API key override set");
            overrides.modern_api_key = api_key;
        }
    }

    pub fn set_modern_db(&self, update: ModernDbUpdate) {
        let mut overrides = self.write_overrides();
        if update.host.is_some() {
            overrides.modern_db_host = update.host;
        }
        if update.port.is_some() {
            overrides.modern_db_port = update.port;
        }
        if update.name.is_some() {
            overrides.modern_db_name = update.name;
        }
        if update.user.is_some() {
            overrides.modern_db_user = update.user;
        }
        if update.password.is_some() {
            overrides.modern_db_password = update.password;
        }
        info!("Modern database override updated");
    }

    /// Effective configuration with secrets masked
    pub fn effective_view(&self) -> EffectiveConfig {
        let overrides = self.read_overrides();
        let settings = self.snapshot();

        EffectiveConfig {
            legacy_db: settings.legacy_db.display().to_string(),
            modern_api_url: settings.modern_api.url.clone(),
            modern_api_key_set: !settings.modern_api.api_key.is_empty(),
            modern_db_host: settings.modern_db.host.clone(),
            modern_db_port: settings.modern_db.port,
            modern_db_name: settings.modern_db.name.clone(),
            modern_db_user: settings.modern_db.user.clone(),
            modern_db_password_set: !settings.modern_db.password.is_empty(),
            has_overrides: OverrideFlags {
                legacy_db: overrides.legacy_db.is_some(),
                modern_api_url: overrides.modern_api_url.is_some(),
                modern_api_key: overrides.modern_api_key.is_some(),
                modern_db: overrides.has_modern_db(),
            },
        }
    }

    fn read_overrides(&self) -> RuntimeOverrides {
        // A poisoned lock still holds a complete value; writers never leave it half-updated
        self.overrides
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn write_overrides(&self) -> std::sync::RwLockWriteGuard<'_, RuntimeOverrides> {
        self.overrides
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Effective configuration as reported to clients
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EffectiveConfig {
    pub legacy_db: String,
    pub modern_api_url: String,
    pub modern_api_key_set: bool,
    pub modern_db_host: String,
    pub modern_db_port: u16,
    pub modern_db_name: String,
    pub modern_db_user: String,
    pub modern_db_password_set: bool,
    pub has_overrides: OverrideFlags,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OverrideFlags {
    pub legacy_db: bool,
    pub modern_api_url: bool,
    pub modern_api_key: bool,
    pub modern_db: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_settings() -> Settings {
        Settings {
            legacy_db: PathBuf::from("/data/MediaDb.v1.sqlite"),
            modern_db: ModernDbSettings {
                host: "db".to_string(),
                port: 5432,
                name: "immich".to_string(),
                user: "postgres".to_string(),
                password: "secret".to_string(),
            },
            modern_api: ModernApiSettings {
                url: "http://photos:2283".to_string(),
                api_key: String::new(),
            },
            bind: "127.0.0.1:5730".to_string(),
            log_level: "info".to_string(),
            path_mappings: BTreeMap::new(),
        }
    }

    #[test]
    fn test_snapshot_without_overrides_is_base() {
        let ctx = SettingsContext::new(base_settings());
        assert_eq!(ctx.snapshot(), base_settings());
    }

    #[test]
    fn test_overrides_visible_through_clones() {
        let ctx = SettingsContext::new(base_settings());
        let shared = ctx.clone();

        shared.set_modern_api(Some("http://other:2283".to_string()), Some("k".to_string()));
        shared.set_modern_db(ModernDbUpdate {
            port: Some(6543),
            ..Default::default()
        });

        let snap = ctx.snapshot();
        assert_eq!(snap.modern_api.url, "http://other:2283");
        assert_eq!(snap.modern_api.api_key, "k");
        assert_eq!(snap.modern_db.port, 6543);
        assert_eq!(snap.modern_db.host, "db");
    }

    #[test]
    fn test_effective_view_masks_secrets() {
        let ctx = SettingsContext::new(base_settings());
        let view = ctx.effective_view();
        assert!(view.modern_db_password_set);
        assert!(!view.modern_api_key_set);
        assert!(!view.has_overrides.modern_db);

        ctx.set_legacy_db(PathBuf::from("/tmp/other.sqlite"));
        let view = ctx.effective_view();
        assert!(view.has_overrides.legacy_db);
        assert_eq!(view.legacy_db, "/tmp/other.sqlite");
    }

    #[test]
    fn test_map_path_uses_first_matching_prefix() {
        let mut settings = base_settings();
        settings
            .path_mappings
            .insert("/external/photos".to_string(), "D:/Pictures".to_string());

        assert_eq!(settings.map_path("/external/photos/2019/a.jpg"), "D:/Pictures/2019/a.jpg");
        assert_eq!(settings.map_path("/upload/b.jpg"), "/upload/b.jpg");
    }

    #[test]
    fn test_display_url_hides_password() {
        let url = base_settings().modern_db.display_url();
        assert!(!url.contains("secret"));
        assert!(url.contains("db:5432/immich"));
    }
}
