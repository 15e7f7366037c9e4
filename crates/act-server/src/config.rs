use std::path::PathBuf;

use thiserror::Error;

/// Startup configuration read from the environment (spec.md §6).
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub state_dir: PathBuf,
}

/// A startup configuration failure; always fatal (spec.md §6's exit-code contract).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("ACT_PORT must be a positive integer, got {0:?}")]
    InvalidPort(String),
}

impl Config {
    /// Read `ACT_PORT` (default 3695) and `ACT_ALLOWED_ORIGINS` (comma-separated,
    /// default empty) from the environment. `state_dir` is always
    /// `<cwd>/.agent-chrome-test`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|key| std::env::var(key).ok())
    }

    fn from_source(source: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match source("ACT_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .ok()
                .filter(|port| *port > 0)
                .ok_or(ConfigError::InvalidPort(raw))?,
            None => act_protocol::DEFAULT_PORT,
        };
        let allowed_origins = source("ACT_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|entry| !entry.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self {
            port,
            allowed_origins,
            state_dir: PathBuf::from(".agent-chrome-test"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset() {
        let config = Config::from_source(|_| None).unwrap();
        assert_eq!(config.port, act_protocol::DEFAULT_PORT);
        assert!(config.allowed_origins.is_empty());
    }

    #[test]
    fn parses_origins_trimming_whitespace() {
        let config = Config::from_source(|key| match key {
            "ACT_ALLOWED_ORIGINS" => Some("example.com, foo.test ,,bar.test".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.allowed_origins, vec!["example.com", "foo.test", "bar.test"]);
    }

    #[test]
    fn rejects_zero_port() {
        let result = Config::from_source(|key| (key == "ACT_PORT").then(|| "0".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn rejects_non_numeric_port() {
        let result = Config::from_source(|key| (key == "ACT_PORT").then(|| "nope".to_string()));
        assert!(matches!(result, Err(ConfigError::InvalidPort(raw)) if raw == "nope"));
    }
}
