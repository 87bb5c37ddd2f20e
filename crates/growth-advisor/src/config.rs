use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Connection settings for the OpenAI-compatible text-generation backend.
#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            timeout: Duration::from_secs(20),
        }
    }
}

impl AdvisorConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env` but reads values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let timeout_secs: u64 = lookup("GROWTH_ADVISOR_TIMEOUT_SECS")
            .unwrap_or_else(|| defaults.timeout.as_secs().to_string())
            .parse()
            .context("GROWTH_ADVISOR_TIMEOUT_SECS must be a whole number of seconds")?;

        Ok(Self {
            base_url: lookup("LLM_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            api_key: lookup("LLM_API_KEY").filter(|k| !k.trim().is_empty()),
            model: lookup("LLM_MODEL").unwrap_or(defaults.model),
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// A backend is only usable with credentials.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
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
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = AdvisorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.timeout, Duration::from_secs(20));
        assert!(!config.is_configured());
    }

    #[test]
    fn test_overrides() {
        let config = AdvisorConfig::from_lookup(lookup(&[
            ("LLM_BASE_URL", "http://localhost:11434/v1/"),
            ("LLM_API_KEY", "sk-test"),
            ("LLM_MODEL", "llama3"),
            ("GROWTH_ADVISOR_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:11434/v1");
        assert_eq!(config.model, "llama3");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.is_configured());
    }

    #[test]
    fn test_blank_key_is_unconfigured() {
        let config = AdvisorConfig::from_lookup(lookup(&[("LLM_API_KEY", "  ")])).unwrap();
        assert!(!config.is_configured());
    }

    #[test]
    fn test_bad_timeout_is_an_error() {
        let err = AdvisorConfig::from_lookup(lookup(&[("GROWTH_ADVISOR_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("GROWTH_ADVISOR_TIMEOUT_SECS"));
    }
}
