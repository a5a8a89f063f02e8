//! Configuration resolution for rtcpass.
//!
//! Implements layered config resolution:
//! 1. Built-in defaults
//! 2. Settings file (`--config path/to/settings.json`)
//! 3. Environment variables (`RTCPASS_*`)
//! 4. CLI arguments (highest priority, applied by the binary)
//!
//! Application credentials are not part of the settings file; they are only
//! accepted from the environment or the command line.

use std::path::Path;

use serde::{Deserialize, Serialize};

use rtcpass_token::{ChecksumMode, DEFAULT_VALIDITY_SECS};

use crate::error::{Error, Result};

/// Complete rtcpass configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub issuer: IssuerConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Token issuance settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IssuerConfig {
    /// Lifetime of issued tokens in seconds.
    pub validity_secs: u32,
    /// Content of the reserved channel/subject checksum fields.
    pub checksum_mode: ChecksumMode,
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            validity_secs: DEFAULT_VALIDITY_SECS,
            checksum_mode: ChecksumMode::Zeroed,
        }
    }
}

/// HTTP endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    pub log_json: bool,
    /// CORS origins; `"*"` allows any.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".to_string(),
            log_json: false,
            allowed_origins: vec!["*".to_string()],
        }
    }
}

impl Config {
    /// Reject settings the issuer cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.issuer.validity_secs == 0 {
            return Err(Error::Config("issuer.validity_secs must be positive".to_string()));
        }
        if self.server.addr.trim().is_empty() {
            return Err(Error::Config("server.addr must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Load configuration with layered resolution from the process environment.
pub fn load_config(settings_path: Option<&Path>) -> Result<Config> {
    load_config_with(settings_path, |key| std::env::var(key).ok())
}

/// Same as [`load_config`] with an explicit environment lookup.
pub fn load_config_with<F>(settings_path: Option<&Path>, env: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match settings_path {
        Some(path) => load_config_file(path)?,
        None => Config::default(),
    };
    apply_env_overrides(&mut config, env)?;
    config.validate()?;
    Ok(config)
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn apply_env_overrides<F>(config: &mut Config, env: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = env("RTCPASS_VALIDITY_SECS") {
        config.issuer.validity_secs = val
            .parse()
            .map_err(|e| Error::Config(format!("RTCPASS_VALIDITY_SECS={val}: {e}")))?;
    }
    if let Some(val) = env("RTCPASS_CHECKSUM_MODE") {
        config.issuer.checksum_mode = val
            .parse()
            .map_err(|e| Error::Config(format!("RTCPASS_CHECKSUM_MODE: {e}")))?;
    }
    if let Some(val) = env("RTCPASS_ADDR") {
        config.server.addr = val;
    }
    if let Some(val) = env("RTCPASS_LOG_JSON") {
        config.server.log_json = matches!(val.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
    }
    if let Some(val) = env("RTCPASS_ALLOWED_ORIGINS") {
        config.server.allowed_origins = val
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
    }
    Ok(())
}
