//! Client configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/vaultup/config.toml`
//! - Windows: `%APPDATA%/vaultup/config.toml`
//!
//! The password is never stored; it comes from a flag or the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vaultup_auth::OAuthConfig;
use vaultup_http::RetryPolicy;
use vaultup_transfer::DEFAULT_CHUNK_SIZE;
use vaultup_upload::TransferOptions;

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Server base URL.
    #[serde(default)]
    pub server_url: String,

    #[serde(default)]
    pub database: String,

    #[serde(default)]
    pub username: String,

    /// Maximum bytes per upload request.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,

    /// Attempts per request (begin, each chunk, commit).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Per-attempt timeout in seconds.
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,

    /// Delay before the first retry in milliseconds (0 = retry at once).
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default)]
    pub oauth: OAuthConfig,
}

fn default_chunk_size() -> u64 {
    DEFAULT_CHUNK_SIZE
}

fn default_max_attempts() -> u32 {
    3
}

fn default_attempt_timeout_secs() -> u64 {
    30
}

fn default_retry_delay_ms() -> u64 {
    250
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            database: String::new(),
            username: String::new(),
            chunk_size: default_chunk_size(),
            max_attempts: default_max_attempts(),
            attempt_timeout_secs: default_attempt_timeout_secs(),
            retry_delay_ms: default_retry_delay_ms(),
            oauth: OAuthConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from `path`, or defaults if the file is missing.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            tracing::debug!(path = %path.display(), "configuration loaded");
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Saves the configuration to `path`.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        // Restrict permissions on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let initial_delay = Duration::from_millis(self.retry_delay_ms);
        RetryPolicy {
            initial_delay,
            max_delay: initial_delay.max(RetryPolicy::default().max_delay),
            ..RetryPolicy::default()
        }
        .with_attempt_timeout(Duration::from_secs(self.attempt_timeout_secs))
    }

    pub fn transfer_options(&self) -> TransferOptions {
        TransferOptions {
            chunk_size: self.chunk_size,
            max_attempts: self.max_attempts,
            retry: self.retry_policy(),
        }
    }
}

/// Returns the platform-specific configuration file path.
pub fn config_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home)
            .join(".config")
            .join("vaultup")
            .join("config.toml")
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("vaultup").join("config.toml")
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        PathBuf::from("/tmp/vaultup/config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.server_url.is_empty());
        assert_eq!(config.chunk_size, 10_000);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.attempt_timeout_secs, 30);
        assert_eq!(config.oauth.client_id, "IOMApp");
    }

    #[test]
    fn config_partial_toml() {
        let toml_str = r#"
            server_url = "http://localhost/InnovatorServer"

            [oauth]
            scope = "Custom"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server_url, "http://localhost/InnovatorServer");
        assert_eq!(config.chunk_size, 10_000);
        assert_eq!(config.oauth.scope, "Custom");
        assert_eq!(config.oauth.client_id, "IOMApp");
    }

    #[test]
    fn config_save_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("config.toml");

        let config = Config {
            database: "InnovatorSolutions".into(),
            chunk_size: 65_536,
            ..Config::default()
        };
        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn transfer_options_follow_config() {
        let config = Config {
            chunk_size: 4096,
            max_attempts: 5,
            attempt_timeout_secs: 10,
            retry_delay_ms: 0,
            ..Config::default()
        };
        let opts = config.transfer_options();
        assert_eq!(opts.chunk_size, 4096);
        assert_eq!(opts.max_attempts, 5);
        assert_eq!(opts.retry.attempt_timeout, Duration::from_secs(10));
        assert_eq!(opts.retry.delay_for_attempt(1), Duration::ZERO);
    }

    #[test]
    fn config_path_not_empty() {
        assert!(config_path().to_string_lossy().contains("vaultup"));
    }
}
