//! Configuration management for Marginalia

use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub highlighter: HighlighterConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
}

/// Settings of a client-side highlighter
#[derive(Debug, Clone, Deserialize)]
pub struct HighlighterConfig {
    /// Base URL of the highlight peer
    pub api_url: String,
    pub api_key: Option<String>,
    /// URL of the page being annotated
    pub page_url: String,
    pub upload_interval: Duration,
    pub upload_batch_size: usize,
    /// Elements whose text may be selected
    pub selectable_elements: Vec<String>,
    /// Elements whose text may never be selected
    pub unselectable_elements: Vec<String>,
    /// Minimum selection length in UTF-16 code units of serialized content
    pub min_selection_length: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Bearer token required on highlight routes when set
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a number, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

impl Default for HighlighterConfig {
    fn default() -> Self {
        HighlighterConfig {
            api_url: "http://localhost:3000".to_string(),
            api_key: None,
            page_url: "http://localhost/".to_string(),
            upload_interval: Duration::from_millis(5000),
            upload_batch_size: 10,
            selectable_elements: vec!["p".to_string(), "span".to_string()],
            unselectable_elements: vec!["a".to_string(), "button".to_string()],
            min_selection_length: 3,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            highlighter: HighlighterConfig::default(),
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                api_key: None,
            },
            database: DatabaseConfig {
                url: "sqlite:./marginalia.db".to_string(),
            },
        }
    }
}

/// Parse `var` if set, otherwise use `default`
fn number<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
        Err(_) => Ok(default),
    }
}

fn non_empty(var: &str) -> Option<String> {
    env::var(var).ok().filter(|value| !value.trim().is_empty())
}

impl HighlighterConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = HighlighterConfig::default();
        Ok(HighlighterConfig {
            api_url: non_empty("HIGHLIGHTS_API_URL").unwrap_or(defaults.api_url),
            api_key: non_empty("HIGHLIGHTS_API_KEY"),
            page_url: non_empty("HIGHLIGHTS_PAGE_URL").unwrap_or(defaults.page_url),
            upload_interval: Duration::from_millis(number("HIGHLIGHTS_UPLOAD_INTERVAL_MS", 5000u64)?),
            upload_batch_size: number("HIGHLIGHTS_BATCH_SIZE", defaults.upload_batch_size)?,
            selectable_elements: defaults.selectable_elements,
            unselectable_elements: defaults.unselectable_elements,
            min_selection_length: number("HIGHLIGHTS_MIN_SELECTION", defaults.min_selection_length)?,
        })
    }

    pub fn is_selectable(&self, tag: &str) -> bool {
        self.selectable_elements.iter().any(|t| t.eq_ignore_ascii_case(tag))
            && !self.unselectable_elements.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Config {
            highlighter: HighlighterConfig::from_env()?,
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: number("SERVER_PORT", 3000)?,
                api_key: non_empty("SERVER_API_KEY"),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:./marginalia.db".to_string()),
            },
        })
    }
}
