use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::data::tokenizer::DEFAULT_VOCAB_SIZE;
use crate::rl::algorithms::DqnConfig;
use crate::rl::config::{EnvConfig, TrainingConfig};
use crate::rl::networks::QNetworkConfig;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub alpaca: AlpacaConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub environment: EnvConfig,
    #[serde(default)]
    pub network: QNetworkConfig,
    #[serde(default)]
    pub agent: DqnConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Alpaca credentials and endpoints.
///
/// Missing credentials fall back to `APCA_API_KEY_ID` / `APCA_API_SECRET_KEY`.
#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaConfig {
    #[serde(default)]
    pub key_id: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default)]
    pub data_url: Option<String>,
    #[serde(default)]
    pub trading_url: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for AlpacaConfig {
    fn default() -> Self {
        Self {
            key_id: None,
            secret_key: None,
            data_url: None,
            trading_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl AlpacaConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Where prices and news come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataProvider {
    #[default]
    Alpaca,
    /// Recorded JSON files, see `data.price_fixture` / `data.news_fixture`
    Fixture,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    #[serde(default)]
    pub provider: DataProvider,
    #[serde(default)]
    pub price_fixture: Option<PathBuf>,
    #[serde(default)]
    pub news_fixture: Option<PathBuf>,
    /// Tokenizer vocabulary, also the embedding size of both text branches
    #[serde(default = "default_vocab_size")]
    pub vocab_size: usize,
}

fn default_vocab_size() -> usize {
    DEFAULT_VOCAB_SIZE
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            provider: DataProvider::default(),
            price_fixture: None,
            news_fixture: None,
            vocab_size: default_vocab_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
    /// Directory for the daily-rolling log file, console only when unset
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info,sentitrade=debug".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            dir: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("logging.level", default_log_level())?
            .set_default("logging.json", false)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/backtest.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("SENTITRADE_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (SENTITRADE_ENVIRONMENT__SYMBOL, etc.)
            .add_source(
                Environment::with_prefix("SENTITRADE")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Network configuration sized for the tokenizer and action space
    pub fn network_config(&self) -> QNetworkConfig {
        let num_actions = if self.environment.use_neutrality { 3 } else { 2 };
        self.network
            .clone()
            .sized_for(self.data.vocab_size, num_actions)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Err(env) = self.environment.validate() {
            errors.extend(env);
        }
        if let Err(training) = self.training.validate() {
            errors.extend(training);
        }
        if let Err(agent) = self.agent.validate() {
            errors.extend(agent);
        }
        if let Err(network) = self.network_config().validate() {
            errors.push(network.to_string());
        }

        if self.data.vocab_size < 5 {
            errors.push(format!(
                "data.vocab_size must be at least 5, got {}",
                self.data.vocab_size
            ));
        }
        if self.data.provider == DataProvider::Fixture && self.data.price_fixture.is_none() {
            errors.push("data.price_fixture is required with the fixture provider".to_string());
        }
        if self.alpaca.timeout_secs == 0 {
            errors.push("alpaca.timeout_secs must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.network_config().num_actions, 2);
        assert_eq!(config.network_config().title.vocab_size, DEFAULT_VOCAB_SIZE);
    }

    #[test]
    fn test_neutrality_sizes_three_actions() {
        let mut config = AppConfig::default();
        config.environment.use_neutrality = true;
        assert_eq!(config.network_config().num_actions, 3);
    }

    #[test]
    fn test_load_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.toml"),
            r#"
[environment]
symbol = "MSFT"
start = "2021-02-01T09:00:00Z"
stop = "2021-03-01T09:00:00Z"
step = "1h"
limit_steps = 20
use_neutrality = true
neutrality_order = "scale_first"

[data]
provider = "fixture"
price_fixture = "prices.json"
vocab_size = 1000

[training]
num_iterations = 3
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(dir.path()).unwrap();
        assert_eq!(config.environment.symbol, "MSFT");
        assert_eq!(config.environment.limit_steps, Some(20));
        assert_eq!(config.data.provider, DataProvider::Fixture);
        assert_eq!(config.training.num_iterations, 3);
        // untouched sections keep their defaults
        assert_eq!(config.training.replay_capacity, 100);
        assert_eq!(config.logging.level, "info,sentitrade=debug");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_collects_errors() {
        let mut config = AppConfig::default();
        config.environment.news_limit = 0;
        config.training.replay_capacity = 0;
        config.data.provider = DataProvider::Fixture;
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
