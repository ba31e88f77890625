use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use url::Url;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Upstream authentication API and the public origin this app is served from.
///
/// `app_url` is sent as the `Referer` on every upstream call; Sanctum uses it
/// for its stateful-domain check, so it must match the origin browsers use.
#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    pub api_url: String,
    pub app_url: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub environment: RuntimeMode,
}

impl RuntimeConfig {
    /// Production mode switches logging to JSON and defaults relayed cookies
    /// to `Secure`.
    pub fn is_production(&self) -> bool {
        self.environment == RuntimeMode::Production
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    #[default]
    Development,
    Production,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file and environment variables
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (FRONTDESK__UPSTREAM__API_URL, etc.)
    /// 2. Config file specified by path
    /// 3. Hardcoded defaults
    pub fn load(config_path: Option<String>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        // Set defaults
        builder = builder
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("upstream.api_url", "http://localhost:8000")?
            .set_default("upstream.app_url", "http://localhost:3000")?;

        // Load config file if path provided or CONFIG_PATH env var set
        let config_file_path = config_path
            .or_else(|| env::var("CONFIG_PATH").ok())
            .unwrap_or_else(|| "config/default.toml".to_string());

        // Try to load config file (optional - ignore if not found)
        if std::path::Path::new(&config_file_path).exists() {
            builder = builder.add_source(File::with_name(&config_file_path));
        }

        // Override with environment variables (FRONTDESK__UPSTREAM__API_URL, etc.)
        builder = builder.add_source(
            Environment::with_prefix("FRONTDESK")
                .separator("__")
                .try_parsing(true),
        );

        // Also support legacy environment variables without prefix
        if let Ok(api_url) = env::var("API_URL") {
            builder = builder.set_override("upstream.api_url", api_url)?;
        }
        if let Ok(app_url) = env::var("APP_URL") {
            builder = builder.set_override("upstream.app_url", app_url)?;
        }
        if let Ok(environment) = env::var("ENVIRONMENT") {
            builder = builder.set_override("runtime.environment", environment)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("Server port must be greater than 0".to_string());
        }
        Url::parse(&self.upstream.api_url)
            .map_err(|e| format!("Invalid upstream API URL '{}': {}", self.upstream.api_url, e))?;
        Url::parse(&self.upstream.app_url)
            .map_err(|e| format!("Invalid app URL '{}': {}", self.upstream.app_url, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            upstream: UpstreamConfig {
                api_url: "http://localhost:8000".to_string(),
                app_url: "http://localhost:3000".to_string(),
            },
            runtime: RuntimeConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }

    #[test]
    fn test_validation_valid_config() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_validation_zero_port() {
        let mut config = base_config();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_bad_api_url() {
        let mut config = base_config();
        config.upstream.api_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_runtime_mode_defaults_to_development() {
        let config = base_config();
        assert!(!config.runtime.is_production());
    }
}
