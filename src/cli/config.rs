//! Claim desk configuration file handling
//!
//! Provides default configuration generation and loading. Configuration
//! files are TOML and live in the data directory next to the ledger.
//!
//! The admin identifier can also come from the `CLAIMDESK_ADMIN_USER_ID`
//! environment variable, which wins over the file so a deployment can keep
//! it out of the config.

use claimdesk::chat::DispatcherConfig;
use claimdesk::ledger::request::UserId;
use claimdesk::persistence::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment override for `[admin] user_id`
pub const ADMIN_ENV_VAR: &str = "CLAIMDESK_ADMIN_USER_ID";

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_LEDGER_FILE: &str = "token-requests.json";
const DEFAULT_DISTRIBUTION_FILE: &str = "approved-addresses.json";
const DEFAULT_SAVE_TIMEOUT_MS: u64 = 5000;
const DEFAULT_SAVE_RETRIES: u32 = 3;
const SAVE_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimdeskConfig {
    pub storage: StorageConfig,

    #[serde(default)]
    pub admin: AdminConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the ledger and the distribution list
    pub data_dir: PathBuf,

    #[serde(default = "default_ledger_file")]
    pub ledger_file: String,

    #[serde(default = "default_distribution_file")]
    pub distribution_file: String,

    /// Time allowed for one ledger write
    #[serde(default = "default_save_timeout_ms")]
    pub save_timeout_ms: u64,

    /// Retries after a failed ledger write
    #[serde(default = "default_save_retries")]
    pub save_retries: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Chat user id of the admin; unset disables admin commands and notices
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` overrides
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

fn default_ledger_file() -> String {
    DEFAULT_LEDGER_FILE.to_string()
}

fn default_distribution_file() -> String {
    DEFAULT_DISTRIBUTION_FILE.to_string()
}

fn default_save_timeout_ms() -> u64 {
    DEFAULT_SAVE_TIMEOUT_MS
}

fn default_save_retries() -> u32 {
    DEFAULT_SAVE_RETRIES
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

impl StorageConfig {
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(&self.ledger_file)
    }

    pub fn distribution_path(&self) -> PathBuf {
        self.data_dir.join(&self.distribution_file)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.save_retries,
            base_backoff: SAVE_BACKOFF,
            attempt_timeout: Duration::from_millis(self.save_timeout_ms),
        }
    }
}

impl ClaimdeskConfig {
    /// Create a new configuration with the given data directory
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            storage: StorageConfig {
                data_dir,
                ledger_file: default_ledger_file(),
                distribution_file: default_distribution_file(),
                save_timeout_ms: DEFAULT_SAVE_TIMEOUT_MS,
                save_retries: DEFAULT_SAVE_RETRIES,
            },
            admin: AdminConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

        let config: ClaimdeskConfig = toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;

        Ok(config)
    }

    /// Admin id, with `env_value` (the environment override) taking
    /// precedence. Blank values count as unset.
    pub fn admin_user_id(&self, env_value: Option<String>) -> Option<UserId> {
        let non_blank =
            |id: Option<String>| id.map(|id| id.trim().to_string()).filter(|id| !id.is_empty());
        non_blank(env_value)
            .or_else(|| non_blank(self.admin.user_id.clone()))
            .map(UserId)
    }

    /// Admin id from the environment or the file.
    pub fn resolved_admin(&self) -> Option<UserId> {
        self.admin_user_id(std::env::var(ADMIN_ENV_VAR).ok())
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            admin: self.resolved_admin(),
            distribution_path: self.storage.distribution_path(),
        }
    }

    /// Generate default configuration content as a string with comments
    pub fn generate_default_toml(data_dir: &Path) -> String {
        format!(
            r#"# Claim desk configuration
#
# Token request ledger and distribution list live in data_dir.

[storage]
data_dir = "{data_dir}"

# Ledger document (all requests and their status)
ledger_file = "{ledger_file}"

# Approved wallet list written by /generate_distribution
distribution_file = "{distribution_file}"

# Bounds for one ledger write
save_timeout_ms = {save_timeout_ms}
save_retries = {save_retries}

[admin]
# Chat user id allowed to approve/reject requests and receiving notices.
# Leave unset to disable admin features.
# Can be overridden with the {admin_env} environment variable.
# user_id = "123456789"

[logging]
# Log level: trace, debug, info, warn, error (RUST_LOG overrides)
level = "info"

# Log file path (optional, logs to stderr if not specified)
# file = "/var/log/claimdesk/claimdesk.log"
"#,
            data_dir = data_dir.display(),
            ledger_file = DEFAULT_LEDGER_FILE,
            distribution_file = DEFAULT_DISTRIBUTION_FILE,
            save_timeout_ms = DEFAULT_SAVE_TIMEOUT_MS,
            save_retries = DEFAULT_SAVE_RETRIES,
            admin_env = ADMIN_ENV_VAR,
        )
    }

    /// Create and save a default configuration file
    pub fn create_default(
        config_path: &Path,
        data_dir: &Path,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let contents = Self::generate_default_toml(data_dir);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(config_path, contents).map_err(|e| {
            format!(
                "Failed to write config file '{}': {}",
                config_path.display(),
                e
            )
        })?;

        Ok(())
    }

    /// Load the config at `config_path` (or the default location).
    ///
    /// A missing file is created with defaults when `create_if_missing`,
    /// otherwise defaults are used without touching the disk. An explicitly
    /// given path must exist.
    pub fn resolve(
        config_path: Option<String>,
        create_if_missing: bool,
    ) -> Result<(Self, PathBuf), Box<dyn std::error::Error>> {
        let explicit = config_path.is_some();
        let data_dir = default_data_dir();
        let path = config_path
            .map(PathBuf::from)
            .unwrap_or_else(|| default_config_path(&data_dir));

        if path.exists() || explicit {
            return Ok((Self::load(&path)?, path));
        }

        if create_if_missing {
            Self::create_default(&path, &data_dir)?;
            Ok((Self::load(&path)?, path))
        } else {
            Ok((Self::new(data_dir), path))
        }
    }
}

/// Config file location inside a data directory
pub fn default_config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.toml")
}

/// Default data directory: `<platform data dir>/claimdesk`
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("claimdesk")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let data_dir = PathBuf::from("/data/claimdesk");
        let config = ClaimdeskConfig::new(data_dir.clone());

        assert_eq!(config.storage.data_dir, data_dir);
        assert_eq!(
            config.storage.ledger_path(),
            PathBuf::from("/data/claimdesk/token-requests.json")
        );
        assert_eq!(
            config.storage.distribution_path(),
            PathBuf::from("/data/claimdesk/approved-addresses.json")
        );
        assert_eq!(config.logging.level, "info");
        assert!(config.admin.user_id.is_none());
    }

    #[test]
    fn test_load_config_with_admin() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(
            &config_path,
            "[storage]\ndata_dir = \"/data/claimdesk\"\n\n[admin]\nuser_id = \"42\"\n",
        )
        .unwrap();

        let loaded = ClaimdeskConfig::load(&config_path).unwrap();
        assert_eq!(loaded.storage.data_dir, PathBuf::from("/data/claimdesk"));
        assert_eq!(loaded.admin.user_id, Some("42".to_string()));
        assert_eq!(loaded.admin_user_id(None), Some(UserId::from("42")));
    }

    #[test]
    fn test_create_default_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let data_dir = temp_dir.path().join("data");

        ClaimdeskConfig::create_default(&config_path, &data_dir).unwrap();

        let config = ClaimdeskConfig::load(&config_path).unwrap();
        assert_eq!(config.storage.data_dir, data_dir);
        assert_eq!(config.storage.ledger_file, "token-requests.json");
        assert_eq!(config.storage.save_retries, 3);
        assert!(config.admin.user_id.is_none());
    }

    #[test]
    fn test_load_config_with_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "[storage]\ndata_dir = \"/tmp/cd\"\n").unwrap();

        let config = ClaimdeskConfig::load(&config_path).unwrap();

        assert_eq!(config.storage.distribution_file, "approved-addresses.json");
        assert_eq!(config.storage.save_timeout_ms, 5000);
        assert_eq!(config.logging.level, "info");
        assert_eq!(
            config.storage.retry_policy().attempt_timeout,
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_admin_env_override() {
        let mut config = ClaimdeskConfig::new(PathBuf::from("/tmp"));
        assert_eq!(config.admin_user_id(None), None);

        config.admin.user_id = Some("100".to_string());
        assert_eq!(config.admin_user_id(None), Some(UserId::from("100")));
        assert_eq!(
            config.admin_user_id(Some("200".to_string())),
            Some(UserId::from("200"))
        );
        // blank env value counts as unset and falls back to the file
        assert_eq!(
            config.admin_user_id(Some("  ".to_string())),
            Some(UserId::from("100"))
        );

        config.admin.user_id = Some(" ".to_string());
        assert_eq!(config.admin_user_id(Some(String::new())), None);
    }

    #[test]
    fn test_generate_default_toml() {
        let toml = ClaimdeskConfig::generate_default_toml(Path::new("/srv/claimdesk"));
        assert!(toml.contains("data_dir = \"/srv/claimdesk\""));
        assert!(toml.contains(ADMIN_ENV_VAR));
        assert!(toml.contains("# user_id"));
    }

    #[test]
    fn test_resolve_explicit_missing_path_fails() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.toml");
        assert!(ClaimdeskConfig::resolve(Some(missing.display().to_string()), true).is_err());
    }

    #[test]
    fn test_default_config_path() {
        assert_eq!(
            default_config_path(Path::new("/data/claimdesk")),
            PathBuf::from("/data/claimdesk/config.toml")
        );
    }
}
