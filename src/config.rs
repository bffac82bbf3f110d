//! Construction-time configuration for the suggester and its provider.
//!
//! Everything is read from environment variables. The `from_lookup`
//! constructors take any key lookup so tests never touch the process env.

use std::time::Duration;

use thiserror::Error;

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const PROJECT_VAR: &str = "OPENAI_PROJECT";
pub const ENDPOINT_VAR: &str = "FERRIDYN_INVENTORY_ENDPOINT";
pub const MODEL_VAR: &str = "FERRIDYN_INVENTORY_MODEL";
pub const TIMEOUT_VAR: &str = "FERRIDYN_INVENTORY_TIMEOUT_SECS";
pub const MIN_INTERVAL_VAR: &str = "FERRIDYN_INVENTORY_MIN_INTERVAL_MS";
pub const FALLBACK_VAR: &str = "FERRIDYN_INVENTORY_FALLBACK_CATEGORIES";
pub const POLICY_VAR: &str = "FERRIDYN_INVENTORY_ON_PROVIDER_ERROR";

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(1000);
pub const DEFAULT_FALLBACK: &[&str] = &["General", "Electronics", "Home", "Office", "Outdoor"];

/// Errors raised while reading configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },

    #[error("FERRIDYN_INVENTORY_ON_PROVIDER_ERROR must be 'surface' or 'fallback', got '{0}'")]
    InvalidPolicy(String),

    #[error("fallback category list is empty")]
    EmptyFallback,
}

/// What the suggester does when the completion provider fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Return the classified error to the caller.
    #[default]
    Surface,
    /// Hand out the next fallback rotation label instead.
    Fallback,
}

impl FailurePolicy {
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "surface" => Ok(Self::Surface),
            "fallback" => Ok(Self::Fallback),
            _ => Err(ConfigError::InvalidPolicy(s.to_string())),
        }
    }
}

/// Settings for the suggester itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggesterConfig {
    /// Labels handed out by the fallback rotation, in order.
    pub fallback_labels: Vec<String>,
    /// Minimum spacing between the starts of two provider calls.
    pub min_interval: Duration,
    pub failure_policy: FailurePolicy,
}

impl Default for SuggesterConfig {
    fn default() -> Self {
        Self {
            fallback_labels: DEFAULT_FALLBACK.iter().map(|s| s.to_string()).collect(),
            min_interval: DEFAULT_MIN_INTERVAL,
            failure_policy: FailurePolicy::Surface,
        }
    }
}

impl SuggesterConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(FALLBACK_VAR) {
            config.fallback_labels = parse_label_list(&raw)?;
        }
        if let Some(raw) = lookup(MIN_INTERVAL_VAR) {
            config.min_interval = Duration::from_millis(parse_number(MIN_INTERVAL_VAR, &raw)?);
        }
        if let Some(raw) = lookup(POLICY_VAR) {
            config.failure_policy = FailurePolicy::parse(&raw)?;
        }

        Ok(config)
    }
}

/// Connection settings for the completion provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub api_key: String,
    /// Sent as the `OpenAI-Project` header when set.
    pub project: Option<String>,
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl ProviderConfig {
    /// Provider settings with defaults for everything but the key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            project: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 16,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Read provider settings from the environment.
    ///
    /// Returns `Ok(None)` when no API key is set, which puts the suggester
    /// in rotation-only mode.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<Self>, ConfigError> {
        let Some(api_key) = lookup(API_KEY_VAR).filter(|k| !k.trim().is_empty()) else {
            return Ok(None);
        };

        let mut config = Self::new(api_key.trim());
        config.project = lookup(PROJECT_VAR).filter(|p| !p.trim().is_empty());
        if let Some(endpoint) = lookup(ENDPOINT_VAR) {
            config.endpoint = endpoint;
        }
        if let Some(model) = lookup(MODEL_VAR) {
            config.model = model;
        }
        if let Some(raw) = lookup(TIMEOUT_VAR) {
            config.timeout_secs = parse_number(TIMEOUT_VAR, &raw)?;
        }

        Ok(Some(config))
    }
}

fn parse_number(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        var,
        value: raw.to_string(),
    })
}

/// Split a comma-separated label list, dropping blanks.
pub fn parse_label_list(raw: &str) -> Result<Vec<String>, ConfigError> {
    let labels: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if labels.is_empty() {
        return Err(ConfigError::EmptyFallback);
    }
    Ok(labels)
}
