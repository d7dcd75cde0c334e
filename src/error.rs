use chrono::{DateTime, Utc};
use thiserror::Error;

/// Main error type for the trading agent
#[derive(Error, Debug)]
pub enum SentiError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Raised at construction time (unsupported interval, untradable symbol,
    /// inconsistent network widths). Never masked.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    // Provider errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider '{provider}' failed: {message}")]
    Provider { provider: String, message: String },

    #[error("No price data for {symbol} around {at} after searching {searched_days} days")]
    NoData {
        symbol: String,
        at: DateTime<Utc>,
        searched_days: i64,
    },

    // Invariant violations
    #[error("Shape mismatch in {component}: expected {expected}, got {actual}")]
    Shape {
        component: String,
        expected: String,
        actual: String,
    },

    // Environment state machine errors
    #[error("Invalid action index: {0}")]
    InvalidAction(usize),

    #[error("Episode finished: reset the environment before stepping")]
    EpisodeFinished,

    // Model errors
    #[error("Model error: {0}")]
    Model(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SentiError {
    pub fn provider(provider: impl Into<String>, message: impl std::fmt::Display) -> Self {
        SentiError::Provider {
            provider: provider.into(),
            message: message.to_string(),
        }
    }

    pub fn shape(
        component: impl Into<String>,
        expected: impl std::fmt::Display,
        actual: impl std::fmt::Display,
    ) -> Self {
        SentiError::Shape {
            component: component.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Whether the error is the absorbed "no data for this date" condition.
    pub fn is_no_data(&self) -> bool {
        matches!(self, SentiError::NoData { .. })
    }
}

/// Result type alias for SentiError
pub type Result<T> = std::result::Result<T, SentiError>;
