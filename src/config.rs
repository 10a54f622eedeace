use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("failed to read config file '{}': {source}", .path.display())]
    ReadFile { path: PathBuf, source: std::io::Error },

    /// Failed to parse JSON.
    #[error("failed to parse config file '{}': {source}", .path.display())]
    ParseJson { path: PathBuf, source: serde_json::Error },

    /// An environment variable holds a value of the wrong shape.
    #[error("invalid value for {var}: {message}")]
    InvalidEnv { var: String, message: String },

    /// Validation error.
    #[error("config validation error: {0}")]
    Validation(String),
}

/// Where registered profiles live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Deserialize, Default)]
struct ConfigFile {
    bot_token: Option<String>,
    /// Accounts that receive forwarded requests.
    #[serde(default)]
    admin_ids: Vec<i64>,
    /// Directory for the database and logs. Defaults to current directory.
    data_dir: Option<String>,
    /// Port for the liveness endpoint (0 = disabled).
    health_port: Option<u16>,
    #[serde(default)]
    storage: StorageKind,
    /// Chat that receives WARN/ERROR log lines.
    log_chat_id: Option<i64>,
}

const DEFAULT_HEALTH_PORT: u16 = 8080;

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub admin_ids: Vec<i64>,
    pub data_dir: PathBuf,
    pub health_port: u16,
    pub storage: StorageKind,
    pub log_chat_id: Option<i64>,
}

impl Config {
    /// Load from an optional JSON file, then apply environment overrides.
    ///
    /// When `required` is false a missing file is treated as empty.
    pub fn load<P: AsRef<Path>>(path: P, required: bool) -> Result<Self, ConfigError> {
        let file = read_file(path.as_ref(), required)?;
        Self::resolve(file, |var| std::env::var(var).ok())
    }

    /// Merge file values with variables looked up through `env`.
    fn resolve<F>(file: ConfigFile, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |var: &str| env(var).filter(|v| !v.trim().is_empty());

        let bot_token = env("BOT_TOKEN").or(file.bot_token).unwrap_or_default();
        if bot_token.is_empty() {
            return Err(ConfigError::Validation(
                "bot token is required (set BOT_TOKEN or bot_token)".into(),
            ));
        }
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        match bot_token.split_once(':') {
            Some((id, secret)) if id.parse::<u64>().is_ok() && !secret.is_empty() => {}
            _ => {
                return Err(ConfigError::Validation(
                    "bot token appears invalid (expected format: 123456789:ABCdefGHI...)".into(),
                ));
            }
        }

        let admin_ids = match env("ADMIN_IDS") {
            Some(raw) => parse_admin_ids(&raw)?,
            None => file.admin_ids,
        };

        let data_dir = env("DATA_DIR")
            .or(file.data_dir)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let health_port = match env("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::InvalidEnv {
                var: "PORT".into(),
                message: e.to_string(),
            })?,
            None => file.health_port.unwrap_or(DEFAULT_HEALTH_PORT),
        };

        let storage = match env("STORAGE").as_deref().map(str::trim) {
            Some("sqlite") => StorageKind::Sqlite,
            Some("memory") => StorageKind::Memory,
            Some(other) => {
                return Err(ConfigError::InvalidEnv {
                    var: "STORAGE".into(),
                    message: format!("expected 'sqlite' or 'memory', got '{other}'"),
                });
            }
            None => file.storage,
        };

        let log_chat_id = match env("LOG_CHAT_ID") {
            Some(raw) => Some(raw.trim().parse::<i64>().map_err(|e| ConfigError::InvalidEnv {
                var: "LOG_CHAT_ID".into(),
                message: e.to_string(),
            })?),
            None => file.log_chat_id,
        };

        Ok(Self {
            bot_token,
            admin_ids,
            data_dir,
            health_port,
            storage,
            log_chat_id,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("users.db")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

fn read_file(path: &Path, required: bool) -> Result<ConfigFile, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(ConfigFile::default());
        }
        Err(e) => {
            return Err(ConfigError::ReadFile { path: path.to_path_buf(), source: e });
        }
    };
    serde_json::from_str(&content)
        .map_err(|e| ConfigError::ParseJson { path: path.to_path_buf(), source: e })
}

/// Parse a comma-separated id list such as `"5640388317, 1001"`.
fn parse_admin_ids(raw: &str) -> Result<Vec<i64>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>().map_err(|e| ConfigError::InvalidEnv {
                var: "ADMIN_IDS".into(),
                message: format!("'{s}': {e}"),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TOKEN: &str = "123456789:ABCdefGHIjklMNOpqrsTUVwxyz";

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn resolve_with(file: ConfigFile, vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::resolve(file, |var| vars.get(var).cloned())
    }

    fn assert_err<T>(result: Result<T, ConfigError>) -> ConfigError {
        match result {
            Ok(_) => panic!("expected error, got Ok"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_valid_config_file() {
        let file = write_config(&format!(
            r#"{{
                "bot_token": "{TOKEN}",
                "admin_ids": [5640388317, 1001],
                "data_dir": "/var/lib/murojaat",
                "health_port": 9000,
                "storage": "memory"
            }}"#
        ));
        let config = Config::resolve(read_file(file.path(), true).unwrap(), |_| None)
            .expect("should load valid config");
        assert_eq!(config.bot_token, TOKEN);
        assert_eq!(config.admin_ids, vec![5640388317, 1001]);
        assert_eq!(config.database_path(), PathBuf::from("/var/lib/murojaat/users.db"));
        assert_eq!(config.health_port, 9000);
        assert_eq!(config.storage, StorageKind::Memory);
        assert_eq!(config.log_chat_id, None);
    }

    #[test]
    fn test_env_only() {
        let config = resolve_with(
            ConfigFile::default(),
            &[("BOT_TOKEN", TOKEN), ("ADMIN_IDS", "5640388317, 42,")],
        )
        .unwrap();
        assert_eq!(config.admin_ids, vec![5640388317, 42]);
        assert_eq!(config.data_dir, PathBuf::from("."));
        assert_eq!(config.health_port, DEFAULT_HEALTH_PORT);
        assert_eq!(config.storage, StorageKind::Sqlite);
    }

    #[test]
    fn test_env_overrides_file() {
        let file = ConfigFile {
            bot_token: Some("1:file".into()),
            admin_ids: vec![1],
            health_port: Some(9000),
            ..Default::default()
        };
        let config = resolve_with(
            file,
            &[("BOT_TOKEN", TOKEN), ("ADMIN_IDS", "2,3"), ("PORT", "10000"), ("STORAGE", "memory")],
        )
        .unwrap();
        assert_eq!(config.bot_token, TOKEN);
        assert_eq!(config.admin_ids, vec![2, 3]);
        assert_eq!(config.health_port, 10000);
        assert_eq!(config.storage, StorageKind::Memory);
    }

    #[test]
    fn test_missing_token_is_fatal() {
        let err = assert_err(resolve_with(ConfigFile::default(), &[]));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("BOT_TOKEN"));
    }

    #[test]
    fn test_blank_env_token_is_missing() {
        let err = assert_err(resolve_with(ConfigFile::default(), &[("BOT_TOKEN", "  ")]));
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_invalid_token_format() {
        for token in ["invalid_token_no_colon", "notanumber:ABCdef", "123456789:"] {
            let err = assert_err(resolve_with(ConfigFile::default(), &[("BOT_TOKEN", token)]));
            assert!(matches!(err, ConfigError::Validation(_)), "{token}");
        }
    }

    #[test]
    fn test_invalid_admin_ids() {
        let err = assert_err(resolve_with(
            ConfigFile::default(),
            &[("BOT_TOKEN", TOKEN), ("ADMIN_IDS", "1,abc")],
        ));
        assert!(matches!(err, ConfigError::InvalidEnv { ref var, .. } if var == "ADMIN_IDS"));
    }

    #[test]
    fn test_invalid_storage() {
        let err = assert_err(resolve_with(
            ConfigFile::default(),
            &[("BOT_TOKEN", TOKEN), ("STORAGE", "redis")],
        ));
        assert!(err.to_string().contains("redis"));
    }

    #[test]
    fn test_optional_file_may_be_missing() {
        let file = read_file(Path::new("/nonexistent/path/murojaat.json"), false).unwrap();
        assert!(file.bot_token.is_none());
    }

    #[test]
    fn test_required_file_not_found() {
        let err = assert_err(read_file(Path::new("/nonexistent/path/murojaat.json"), true));
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let file = write_config("{ invalid json }");
        let err = assert_err(read_file(file.path(), true));
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }
}
