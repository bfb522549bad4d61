//! Configuration
//!
//! Layered: a TOML file (explicit path or the first default location that
//! exists) with REFBOOK_* environment variables applied on top.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::catalog::Domain;
use crate::tree::CyclePolicy;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Reference-data service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token, sent when set
    pub token: Option<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_request_timeout() -> u64 {
    5000 // 5 seconds
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            request_timeout_ms: default_request_timeout(),
        }
    }
}

/// Session behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub domain: Domain,

    #[serde(default)]
    pub cycle_policy: CyclePolicy,

    #[serde(default)]
    pub preserve_expansion: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            domain: Domain::default(),
            cycle_policy: CyclePolicy::default(),
            preserve_expansion: false,
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

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
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
            dirs::config_dir().map(|p| p.join("refbook").join("config.toml")),
            Some(PathBuf::from("/etc/refbook/config.toml")),
            Some(PathBuf::from("./refbook.toml")),
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
    fn apply_env_overrides(&mut self) {
        // Service overrides
        if let Ok(base_url) = std::env::var("REFBOOK_BASE_URL") {
            self.service.base_url = base_url;
        }
        if let Ok(token) = std::env::var("REFBOOK_TOKEN") {
            self.service.token = Some(token);
        }

        // Session overrides
        if let Ok(domain) = std::env::var("REFBOOK_DOMAIN") {
            if let Ok(parsed) = domain.parse() {
                self.session.domain = parsed;
            }
        }

        // Logging overrides
        if let Ok(level) = std::env::var("REFBOOK_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("REFBOOK_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            session: SessionConfig::default(),
            logging: LoggingConfig::default(),
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
    r#"# Refbook Configuration
#
# Environment variables override these settings:
# - REFBOOK_BASE_URL
# - REFBOOK_TOKEN
# - REFBOOK_DOMAIN
# - REFBOOK_LOG_LEVEL
# - REFBOOK_LOG_FORMAT

[service]
# Reference-data service URL
base_url = "http://localhost:8080"

# Bearer token sent with every request
# token = ""

# Request timeout (ms)
request_timeout_ms = 5000

[session]
# Catalog shown first: income or expense
domain = "expense"

# What to do with cyclic hierarchies: promote_to_root or reject
cycle_policy = "promote_to_root"

# Keep collapsed groups collapsed across rebuilds
preserve_expansion = false

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
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service.base_url, "http://localhost:8080");
        assert!(config.service.token.is_none());
        assert_eq!(config.session.domain, Domain::Expense);
        assert_eq!(config.session.cycle_policy, CyclePolicy::PromoteToRoot);
        assert!(!config.session.preserve_expansion);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[service]
base_url = "https://refdata.internal:9443"

[session]
domain = "income"
cycle_policy = "reject"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.service.base_url, "https://refdata.internal:9443");
        assert_eq!(config.service.request_timeout_ms, 5000);
        assert_eq!(config.session.domain, Domain::Income);
        assert_eq!(config.session.cycle_policy, CyclePolicy::Reject);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_invalid_file_reports_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "session = \"not a table\"").unwrap();

        let result = Config::load(file.path());
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_env_overrides() {
        std::env::set_var("REFBOOK_BASE_URL", "http://10.0.0.5:8080");
        std::env::set_var("REFBOOK_DOMAIN", "income");

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.service.base_url, "http://10.0.0.5:8080");
        assert_eq!(config.session.domain, Domain::Income);

        std::env::remove_var("REFBOOK_BASE_URL");
        std::env::remove_var("REFBOOK_DOMAIN");
    }

    #[test]
    fn test_template_parses_back_to_defaults() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config.service.base_url, Config::default().service.base_url);
        assert_eq!(config.session.cycle_policy, CyclePolicy::PromoteToRoot);
    }
}
