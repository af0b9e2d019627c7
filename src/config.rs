//! Runtime configuration
//!
//! Defaults match the hosted OpenAI setup. `from_env` overlays environment
//! variables on top of the defaults.

use crate::error::{DuetError, Result};
use crate::vector_store::CHARS_PER_WORD;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_GENERATION_MODEL: &str = "gpt-4o";
pub const DEFAULT_ANALYSIS_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuetConfig {
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,
    pub api_base_url: String,

    pub generation_model: String,
    pub analysis_model: String,
    pub embedding_model: String,
    pub generation_temperature: f32,
    pub analysis_temperature: f32,
    pub generation_max_tokens: u32,
    pub analysis_max_tokens: u32,

    // Retrieval
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub retrieval_top_k: usize,

    // Turn loop
    pub max_history_turns: usize,
    pub analysis_context_turns: usize,
    pub turn_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub max_consecutive_failures: usize,
}

impl Default for DuetConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            generation_model: DEFAULT_GENERATION_MODEL.to_string(),
            analysis_model: DEFAULT_ANALYSIS_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            generation_temperature: 0.8,
            analysis_temperature: 0.3,
            generation_max_tokens: 500,
            analysis_max_tokens: 1000,
            chunk_size: 500,
            chunk_overlap: 50,
            retrieval_top_k: 3,
            max_history_turns: 8,
            analysis_context_turns: 6,
            turn_delay_ms: 1000,
            request_timeout_secs: 60,
            max_consecutive_failures: 3,
        }
    }
}

fn parse_var<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| DuetError::InvalidConfig(format!("{} is not a valid number: '{}'", name, raw)))
}

impl DuetConfig {
    /// Defaults overlaid with environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as `from_env` but reading from an arbitrary lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("OPENAI_API_KEY") {
            config.openai_api_key = Some(key);
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(model) = get("DUET_GENERATION_MODEL") {
            config.generation_model = model;
        }
        if let Some(model) = get("DUET_ANALYSIS_MODEL") {
            config.analysis_model = model;
        }
        if let Some(model) = get("DUET_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        if let Some(raw) = get("DUET_TURN_DELAY_MS") {
            config.turn_delay_ms = parse_var("DUET_TURN_DELAY_MS", &raw)?;
        }
        if let Some(raw) = get("DUET_REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = parse_var("DUET_REQUEST_TIMEOUT_SECS", &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size / CHARS_PER_WORD <= self.chunk_overlap / CHARS_PER_WORD {
            return Err(DuetError::InvalidConfig(format!(
                "chunk_size {} must exceed chunk_overlap {} by at least one word",
                self.chunk_size, self.chunk_overlap
            )));
        }
        if self.retrieval_top_k == 0 {
            return Err(DuetError::InvalidConfig("retrieval_top_k must be positive".to_string()));
        }
        if self.max_consecutive_failures == 0 {
            return Err(DuetError::InvalidConfig(
                "max_consecutive_failures must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn turn_delay(&self) -> Duration {
        Duration::from_millis(self.turn_delay_ms)
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.openai_api_key
            .as_deref()
            .ok_or_else(|| DuetError::InvalidConfig("OPENAI_API_KEY is not set".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = DuetConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.turn_delay(), Duration::from_millis(1000));
        assert!(config.require_api_key().is_err());
    }

    #[test]
    fn test_env_overlay() {
        let config = DuetConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_BASE_URL", "http://localhost:8080/v1/"),
            ("DUET_ANALYSIS_MODEL", "gpt-4.1-mini"),
            ("DUET_TURN_DELAY_MS", " 0 "),
        ]))
        .unwrap();
        assert_eq!(config.require_api_key().unwrap(), "sk-test");
        assert_eq!(config.api_base_url, "http://localhost:8080/v1");
        assert_eq!(config.analysis_model, "gpt-4.1-mini");
        assert_eq!(config.generation_model, DEFAULT_GENERATION_MODEL);
        assert_eq!(config.turn_delay_ms, 0);
    }

    #[test]
    fn test_malformed_number_is_rejected() {
        let err = DuetConfig::from_lookup(lookup(&[("DUET_REQUEST_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(matches!(err, DuetError::InvalidConfig(_)));
    }

    #[test]
    fn test_validate_rejects_degenerate_values() {
        let mut config = DuetConfig::default();
        config.chunk_overlap = 498;
        assert!(config.validate().is_err());

        let mut config = DuetConfig::default();
        config.retrieval_top_k = 0;
        assert!(config.validate().is_err());

        let mut config = DuetConfig::default();
        config.max_consecutive_failures = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: DuetConfig = serde_json::from_str(r#"{"retrieval_top_k": 5}"#).unwrap();
        assert_eq!(config.retrieval_top_k, 5);
        assert_eq!(config.chunk_size, 500);
    }
}
