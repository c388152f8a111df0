//! Configuration resolution for Parklot.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (`<config dir>/parklot/settings.json`)
//! 3. Explicit config file (`--config`)
//! 4. Environment variables (`PARKLOT_*`)
//! 5. CLI arguments (highest priority, applied by the binary)

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Complete Parklot configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub booking: BookingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub database_path: Option<PathBuf>,
    pub log_json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_path: None,
            log_json: false,
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Lifetime of a login session in seconds.
    pub session_ttl_secs: i64,
    /// Admin account created on startup when no admin exists yet.
    pub bootstrap_admin: Option<AdminCredentials>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "dev-secret-change-me".to_string(),
            session_ttl_secs: 12 * 60 * 60,
            bootstrap_admin: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

/// Reservation lifecycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingConfig {
    /// Offset from UTC used to interpret wall-clock booking times such as `10:30 AM`.
    pub utc_offset_minutes: i32,
    /// How often the expiry sweeper runs.
    pub sweep_interval_secs: u64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            sweep_interval_secs: 60,
        }
    }
}

/// Load configuration with hierarchical resolution.
///
/// A missing global file is skipped; a missing explicit file is an error.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let global = global_config_path().filter(|path| path.exists());
    let layers: Vec<&Path> = global.as_deref().into_iter().chain(explicit).collect();

    let mut config = load_layers(&layers)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("parklot").join("settings.json"))
}

/// Get the default database path.
pub fn database_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("parklot").join("parklot.db"))
}

/// Combine config files in order; keys set by a later file win, keys it omits are kept.
fn load_layers(paths: &[&Path]) -> Result<Config> {
    let mut merged = Value::Object(Map::new());
    for path in paths {
        merge_json(&mut merged, read_config_value(path)?);
    }
    serde_json::from_value(merged).map_err(Error::ConfigMerge)
}

/// Read one config file, rejecting it unless it is a valid partial `Config` on its own.
fn read_config_value(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    let parse_error = |source| Error::ConfigParse {
        path: path.to_path_buf(),
        source,
    };
    let value: Value = serde_json::from_str(&content).map_err(parse_error)?;
    Config::deserialize(&value).map_err(parse_error)?;
    Ok(value)
}

fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                merge_json(base.entry(key).or_insert(Value::Null), value);
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Parse an optional environment value, rejecting values that are set but malformed.
fn parse_env<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>> {
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| Error::InvalidEnv { key, value })
        })
        .transpose()
}

fn apply_env_overrides(
    config: &mut Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(addr) = parse_env(&lookup, "PARKLOT_LISTEN_ADDR")? {
        config.server.listen_addr = addr;
    }
    if let Some(path) = lookup("PARKLOT_DB_PATH") {
        config.server.database_path = Some(PathBuf::from(path));
    }
    if let Some(secret) = lookup("PARKLOT_JWT_SECRET") {
        config.auth.jwt_secret = secret;
    }
    if let Some(ttl) = parse_env(&lookup, "PARKLOT_SESSION_TTL")? {
        config.auth.session_ttl_secs = ttl;
    }
    if let (Some(username), Some(password)) = (
        lookup("PARKLOT_ADMIN_USERNAME"),
        lookup("PARKLOT_ADMIN_PASSWORD"),
    ) {
        config.auth.bootstrap_admin = Some(AdminCredentials { username, password });
    }
    if let Some(offset) = parse_env(&lookup, "PARKLOT_UTC_OFFSET_MINUTES")? {
        config.booking.utc_offset_minutes = offset;
    }
    if let Some(secs) = parse_env(&lookup, "PARKLOT_SWEEP_INTERVAL")? {
        config.booking.sweep_interval_secs = secs;
    }
    Ok(())
}
