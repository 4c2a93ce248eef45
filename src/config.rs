//! Runtime configuration read from the environment (and `.env`).

use std::env;
use std::time::Duration;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("{0} is not set")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub model: String,
    pub tavily_api_key: Option<String>,
    pub search_results: usize,
    pub retrieve_top_k: usize,
    /// `None` means no limit on Generate visits.
    pub max_generations: Option<u32>,
    pub max_steps: usize,
    pub http_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            tavily_api_key: None,
            search_results: 3,
            retrieve_top_k: 4,
            max_generations: Some(3),
            max_steps: 25,
            http_timeout: Duration::from_secs(30),
        }
    }
}

fn parse<T: std::str::FromStr>(
    name: &'static str,
    expected: &'static str,
    value: String,
) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid {
            name,
            expected,
            value,
        })
}

impl Config {
    /// Load `.env` if present, then read the environment over the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source; `from_env` passes the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(val) = lookup("OPENAI_API_KEY") {
            config.openai_api_key = Some(val);
        }
        if let Some(val) = lookup("OPENAI_BASE_URL") {
            config.openai_base_url = val;
        }
        if let Some(val) = lookup("RAG_MODEL") {
            config.model = val;
        }
        if let Some(val) = lookup("TAVILY_API_KEY") {
            config.tavily_api_key = Some(val);
        }
        if let Some(val) = lookup("SEARCH_RESULTS") {
            config.search_results = parse("SEARCH_RESULTS", "a positive integer", val)?;
        }
        if let Some(val) = lookup("RETRIEVE_TOP_K") {
            config.retrieve_top_k = parse("RETRIEVE_TOP_K", "a positive integer", val)?;
        }
        if let Some(val) = lookup("MAX_GENERATIONS") {
            let max: u32 = parse("MAX_GENERATIONS", "a non-negative integer", val)?;
            config.max_generations = (max > 0).then_some(max);
        }
        if let Some(val) = lookup("MAX_STEPS") {
            config.max_steps = parse("MAX_STEPS", "a positive integer", val)?;
        }
        if let Some(val) = lookup("HTTP_TIMEOUT_SECS") {
            config.http_timeout =
                Duration::from_secs(parse("HTTP_TIMEOUT_SECS", "a number of seconds", val)?);
        }

        Ok(config)
    }

    /// Check that the HTTP-backed collaborators can be built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.openai_api_key.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigError::Missing("OPENAI_API_KEY"));
        }
        if self.tavily_api_key.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigError::Missing("TAVILY_API_KEY"));
        }
        let zero = |name| ConfigError::Invalid {
            name,
            expected: "a positive integer",
            value: "0".to_string(),
        };
        if self.max_steps == 0 {
            return Err(zero("MAX_STEPS"));
        }
        if self.search_results == 0 {
            return Err(zero("SEARCH_RESULTS"));
        }
        if self.retrieve_top_k == 0 {
            return Err(zero("RETRIEVE_TOP_K"));
        }
        if self.http_timeout.is_zero() {
            return Err(zero("HTTP_TIMEOUT_SECS"));
        }
        Ok(())
    }
}
