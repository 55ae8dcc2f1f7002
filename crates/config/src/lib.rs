use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "lnwallet";
const KEYCHAIN_SERVICE: &str = "lnwallet.credentials";

pub const RUNE_SECRET_KEY: &str = "lightningd_rune";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub modules: ModulesConfig,
    #[serde(default)]
    pub lightningd: LightningdConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModulesConfig {
    #[serde(default = "default_frontend")]
    pub frontend: String, // "console"
    #[serde(default = "default_backend")]
    pub backend: String, // "lightningd" | "mock"
}

impl Default for ModulesConfig {
    fn default() -> Self {
        Self {
            frontend: default_frontend(),
            backend: default_backend(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightningdConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Left empty to read the rune from `LIGHTNINGD_RUNE` or the keychain.
    pub rune: Option<String>,
    /// PEM file of the CA that signed the node's certificate. clnrest
    /// generates a self-signed one next to its data directory.
    #[serde(default)]
    pub ca_cert: Option<PathBuf>,
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl Default for LightningdConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            rune: None,
            ca_cert: None,
            accept_invalid_certs: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

fn default_frontend() -> String {
    "console".to_string()
}

fn default_backend() -> String {
    "lightningd".to_string()
}

fn default_base_url() -> String {
    "https://127.0.0.1:3010".to_string()
}

fn default_interval_secs() -> u64 {
    5
}

impl AppConfig {
    /// Looks up `name` inside `section`, rendered as text. Unset optional
    /// values and unknown keys both come back as `None`.
    pub fn get_value(&self, section: &str, name: &str) -> Option<String> {
        let tree = serde_json::to_value(self).ok()?;
        match tree.get(section)?.get(name)? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Platform location of the TOML config file.
pub fn config_path() -> Result<PathBuf> {
    confy::get_configuration_file_path(APP_NAME, None)
        .context("No config directory for this platform")
}

/// Reads `path`, writing the defaults there first when the file is missing.
pub fn load_from(path: &Path) -> Result<AppConfig> {
    confy::load_path(path).with_context(|| format!("Failed to load config from {}", path.display()))
}

pub fn store_to(path: &Path, cfg: &AppConfig) -> Result<()> {
    confy::store_path(path, cfg)
        .with_context(|| format!("Failed to store config to {}", path.display()))
}

/// Named secrets kept in the OS keychain under one service.
#[derive(Debug, Clone)]
pub struct Keychain {
    service: String,
}

impl Default for Keychain {
    fn default() -> Self {
        Self::new(KEYCHAIN_SERVICE)
    }
}

impl Keychain {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, key)
            .with_context(|| format!("Bad keychain entry {}/{key}", self.service))
    }

    pub fn store_secret(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .with_context(|| format!("Failed to store secret {key}"))
    }

    /// `Ok(None)` when nothing is stored under `key`.
    pub fn get_secret(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read secret {key}")),
        }
    }

    /// Returns whether a secret was actually removed.
    pub fn delete_secret(&self, key: &str) -> Result<bool> {
        match self.entry(key)?.delete_password() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to delete secret {key}")),
        }
    }
}
