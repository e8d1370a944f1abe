//! Dongari configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{DongariError, Result};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DongariConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub fcm: FcmConfig,
}

impl Default for DongariConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            fcm: FcmConfig::default(),
        }
    }
}

impl DongariConfig {
    /// Load config from the default path (~/.dongari/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DongariError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| DongariError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| DongariError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the dongari home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".dongari")
    }
}

/// Durable store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "~/.dongari/dongari.db".into()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// FCM push provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FcmConfig {
    /// Server key for the legacy FCM HTTP API.
    #[serde(default)]
    pub server_key: String,
    /// Send endpoint.
    #[serde(default = "default_fcm_endpoint")]
    pub endpoint: String,
    /// Topic subscription management endpoint (Instance ID API).
    #[serde(default = "default_iid_endpoint")]
    pub iid_endpoint: String,
    /// Per-call timeout in seconds. A hung provider must not stall the
    /// fire path.
    #[serde(default = "default_fcm_timeout")]
    pub timeout_secs: u64,
}

fn default_fcm_endpoint() -> String {
    "https://fcm.googleapis.com/fcm/send".into()
}

fn default_iid_endpoint() -> String {
    "https://iid.googleapis.com/iid/v1".into()
}

fn default_fcm_timeout() -> u64 {
    10
}

impl Default for FcmConfig {
    fn default() -> Self {
        Self {
            server_key: String::new(),
            endpoint: default_fcm_endpoint(),
            iid_endpoint: default_iid_endpoint(),
            timeout_secs: default_fcm_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DongariConfig::default();
        assert_eq!(config.fcm.timeout_secs, 10);
        assert!(config.fcm.endpoint.contains("fcm.googleapis.com"));
        assert!(config.database.path.ends_with("dongari.db"));
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml = r#"
            [fcm]
            server_key = "AAAA-test-key"
            timeout_secs = 5
        "#;
        let config: DongariConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.fcm.server_key, "AAAA-test-key");
        assert_eq!(config.fcm.timeout_secs, 5);
        // Unspecified sections fall back to defaults
        assert!(config.database.path.ends_with("dongari.db"));
    }
}
