use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::error::LogchatError;

pub const DEFAULT_MONGODB_URI: &str = "mongodb://localhost:27017";
pub const DEFAULT_COLLECTION: &str = "logs";
pub const DEFAULT_SYNTHESIS_MODEL: &str = "gpt-4";
pub const DEFAULT_NARRATION_MODEL: &str = "gpt-3.5-turbo";

/// Values shipped in `.env.example` files that mean "nobody filled this in".
const API_KEY_PLACEHOLDERS: &[&str] = &["your-actual-openai-api-key-goes-here", "your-openai-api-key"];

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // OpenAI
    pub openai_api_key: String,
    pub openai_base_url: Option<String>,
    pub synthesis_model: String,
    pub narration_model: String,
    pub synthesis_temperature: f32,
    pub narration_temperature: f32,

    // MongoDB
    pub mongodb_uri: String,
    pub mongodb_database: Option<String>,
    pub collection_name: String,

    // Pipeline
    pub stage_timeout: Option<Duration>,
    pub demo_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            openai_base_url: None,
            synthesis_model: DEFAULT_SYNTHESIS_MODEL.to_string(),
            narration_model: DEFAULT_NARRATION_MODEL.to_string(),
            synthesis_temperature: 0.0,
            narration_temperature: 0.0,
            mongodb_uri: DEFAULT_MONGODB_URI.to_string(),
            mongodb_database: None,
            collection_name: DEFAULT_COLLECTION.to_string(),
            stage_timeout: None,
            demo_mode: false,
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, LogchatError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup. Every variable is
    /// optional; malformed numbers and flags are reported, never defaulted.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, LogchatError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Ok(Self {
            openai_api_key: get("OPENAI_API_KEY").unwrap_or_default(),
            openai_base_url: get("OPENAI_BASE_URL"),
            synthesis_model: get("SYNTHESIS_MODEL").unwrap_or(defaults.synthesis_model),
            narration_model: get("NARRATION_MODEL").unwrap_or(defaults.narration_model),
            synthesis_temperature: parse_or("SYNTHESIS_TEMPERATURE", get("SYNTHESIS_TEMPERATURE"), 0.0)?,
            narration_temperature: parse_or("NARRATION_TEMPERATURE", get("NARRATION_TEMPERATURE"), 0.0)?,
            mongodb_uri: get("MONGODB_URI").unwrap_or(defaults.mongodb_uri),
            mongodb_database: get("MONGODB_DATABASE"),
            collection_name: get("COLLECTION_NAME").unwrap_or(defaults.collection_name),
            stage_timeout: get("STAGE_TIMEOUT_SECS")
                .map(|v| parse_value::<u64>("STAGE_TIMEOUT_SECS", &v))
                .transpose()?
                .map(Duration::from_secs),
            demo_mode: get("LOGCHAT_DEMO")
                .map(|v| parse_flag("LOGCHAT_DEMO", &v))
                .transpose()?
                .unwrap_or(false),
        })
    }

    /// Whether the completion credential looks usable. A missing or
    /// placeholder key means every completion call would fail, so callers
    /// short-circuit instead of attempting one.
    pub fn has_valid_api_key(&self) -> bool {
        let key = self.openai_api_key.as_str();
        !key.is_empty()
            && !API_KEY_PLACEHOLDERS.iter().any(|p| key.contains(p))
            && key.starts_with("sk-")
            && key.len() > 20
    }

    /// Log the effective configuration without secrets.
    pub fn log_redacted(&self) {
        info!(
            openai_api_key = if self.openai_api_key.is_empty() { "unset" } else { "set" },
            api_key_valid = self.has_valid_api_key(),
            openai_base_url = self.openai_base_url.as_deref().unwrap_or("default"),
            synthesis_model = %self.synthesis_model,
            narration_model = %self.narration_model,
            mongodb_database = self.mongodb_database.as_deref().unwrap_or("<from uri>"),
            collection = %self.collection_name,
            stage_timeout_secs = ?self.stage_timeout.map(|d| d.as_secs()),
            demo_mode = self.demo_mode,
            "Loaded configuration"
        );
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T, LogchatError> {
    raw.parse()
        .map_err(|_| LogchatError::Config(format!("{key} has invalid value {raw:?}")))
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T, LogchatError> {
    match raw {
        Some(v) => parse_value(key, &v),
        None => Ok(default),
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, LogchatError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(LogchatError::Config(format!("{key} must be a boolean, got {raw:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, LogchatError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.mongodb_uri, DEFAULT_MONGODB_URI);
        assert_eq!(config.collection_name, "logs");
        assert_eq!(config.synthesis_model, "gpt-4");
        assert_eq!(config.narration_model, "gpt-3.5-turbo");
        assert_eq!(config.synthesis_temperature, 0.0);
        assert!(config.stage_timeout.is_none());
        assert!(!config.demo_mode);
        assert!(!config.has_valid_api_key());
    }

    #[test]
    fn overrides_are_read() {
        let config = config_from(&[
            ("COLLECTION_NAME", "events"),
            ("NARRATION_TEMPERATURE", "0.7"),
            ("STAGE_TIMEOUT_SECS", "30"),
            ("LOGCHAT_DEMO", "yes"),
        ])
        .unwrap();
        assert_eq!(config.collection_name, "events");
        assert_eq!(config.narration_temperature, 0.7);
        assert_eq!(config.stage_timeout, Some(Duration::from_secs(30)));
        assert!(config.demo_mode);
    }

    #[test]
    fn malformed_numbers_are_config_errors() {
        let err = config_from(&[("SYNTHESIS_TEMPERATURE", "cold")]).unwrap_err();
        assert!(matches!(err, LogchatError::Config(msg) if msg.contains("SYNTHESIS_TEMPERATURE")));
    }

    #[test]
    fn malformed_flag_is_config_error() {
        assert!(config_from(&[("LOGCHAT_DEMO", "maybe")]).is_err());
    }

    #[test]
    fn api_key_validation() {
        let key = |k: &str| Config {
            openai_api_key: k.to_string(),
            ..Config::default()
        };
        assert!(key("sk-abcdefghijklmnopqrstuvwxyz").has_valid_api_key());
        assert!(!key("").has_valid_api_key());
        assert!(!key("sk-short").has_valid_api_key());
        assert!(!key("pk-abcdefghijklmnopqrstuvwxyz").has_valid_api_key());
        assert!(!key("sk-your-openai-api-key-here-please").has_valid_api_key());
    }
}
