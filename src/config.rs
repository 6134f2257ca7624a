use anyhow::{Context, Result};
use std::{str::FromStr, time::Duration};

use crate::audio::session::SessionSettings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    // Discord
    pub discord_token: Option<String>,
    pub command_prefix: String,

    // Health server
    pub port: u16,

    // Playback
    pub idle_timeout: Duration,
    pub max_queue_size: usize,
    pub queue_display_limit: usize,

    // Search
    pub search_timeout: Duration,
}

impl Config {
    /// Reads the process environment, after loading `.env` if present.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset keys take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // Blank values count as unset
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let config = Self {
            // Discord
            discord_token: get("DISCORD_BOT_TOKEN").map(|t| t.trim().to_string()),
            command_prefix: get("COMMAND_PREFIX")
                .map(|p| p.trim().to_string())
                .unwrap_or(defaults.command_prefix),

            // Health server
            port: parse_or(get("PORT"), "PORT", defaults.port)?,

            // Playback (humantime durations)
            idle_timeout: duration_or(get("IDLE_TIMEOUT"), "IDLE_TIMEOUT", defaults.idle_timeout)?,
            max_queue_size: parse_or(get("MAX_QUEUE_SIZE"), "MAX_QUEUE_SIZE", defaults.max_queue_size)?,
            queue_display_limit: parse_or(
                get("QUEUE_DISPLAY_LIMIT"),
                "QUEUE_DISPLAY_LIMIT",
                defaults.queue_display_limit,
            )?,

            // Search
            search_timeout: duration_or(
                get("SEARCH_TIMEOUT"),
                "SEARCH_TIMEOUT",
                defaults.search_timeout,
            )?,
        };

        // Validate configuration before returning
        config.validate()?;
        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - Queue size and display limit must be greater than 0
    /// - Idle and search timeouts must be greater than 0
    /// - The command prefix must not contain whitespace
    pub fn validate(&self) -> Result<()> {
        // Validate limits
        if self.max_queue_size == 0 {
            anyhow::bail!("Max queue size must be greater than 0");
        }

        if self.queue_display_limit == 0 {
            anyhow::bail!("Queue display limit must be greater than 0");
        }

        // Validate timeouts
        if self.idle_timeout.is_zero() {
            anyhow::bail!("Idle timeout must be greater than 0");
        }

        if self.search_timeout.is_zero() {
            anyhow::bail!("Search timeout must be greater than 0");
        }

        // Validate the prefix
        if self.command_prefix.is_empty() || self.command_prefix.chars().any(char::is_whitespace) {
            anyhow::bail!("Command prefix must be non-empty and contain no whitespace, got: {:?}", self.command_prefix);
        }

        Ok(())
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            idle_timeout: self.idle_timeout,
            max_queue_size: self.max_queue_size,
        }
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// The token is never included, only whether one is set.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: token {}, prefix '{}'\n  \
            Health: port {}\n  \
            Playback: {} queue, {} shown, idle disconnect after {}\n  \
            Search: timeout {}",
            if self.discord_token.is_some() { "set" } else { "missing" },
            self.command_prefix,
            self.port,
            self.max_queue_size,
            self.queue_display_limit,
            humantime::format_duration(self.idle_timeout),
            humantime::format_duration(self.search_timeout),
        )
    }
}

/// Default configuration values.
///
/// Used as fallbacks when environment variables are not provided.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (no default token)
            discord_token: None,
            command_prefix: "!".to_string(),

            // Health server default
            port: 8080,

            // Playback defaults
            idle_timeout: Duration::from_secs(5 * 60), // 5 minutes
            max_queue_size: 1000,
            queue_display_limit: 10,

            // Search default
            search_timeout: Duration::from_secs(30),
        }
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {key}: {value:?}")),
        None => Ok(default),
    }
}

fn duration_or(raw: Option<String>, key: &str, default: Duration) -> Result<Duration> {
    match raw {
        Some(value) => humantime::parse_duration(value.trim())
            .with_context(|| format!("Invalid duration for {key}: {value:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.port, 8080);
        assert_eq!(config.idle_timeout, Duration::from_secs(300));
        assert_eq!(config.discord_token, None);
    }

    #[test]
    fn test_reads_overrides() {
        let config = from_pairs(&[
            ("DISCORD_BOT_TOKEN", " abc.def "),
            ("PORT", "3000"),
            ("COMMAND_PREFIX", "?"),
            ("IDLE_TIMEOUT", "90s"),
            ("MAX_QUEUE_SIZE", "25"),
            ("SEARCH_TIMEOUT", "1m"),
        ])
        .unwrap();

        assert_eq!(config.discord_token.as_deref(), Some("abc.def"));
        assert_eq!(config.port, 3000);
        assert_eq!(config.command_prefix, "?");
        assert_eq!(config.idle_timeout, Duration::from_secs(90));
        assert_eq!(config.max_queue_size, 25);
        assert_eq!(config.search_timeout, Duration::from_secs(60));
        assert_eq!(config.session_settings().max_queue_size, 25);
    }

    #[test]
    fn test_blank_values_fall_back() {
        let config = from_pairs(&[("DISCORD_BOT_TOKEN", "  "), ("PORT", "")]).unwrap();
        assert_eq!(config.discord_token, None);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_parse_errors_name_the_variable() {
        let err = from_pairs(&[("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));

        let err = from_pairs(&[("IDLE_TIMEOUT", "soon")]).unwrap_err();
        assert!(err.to_string().contains("IDLE_TIMEOUT"));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        assert!(from_pairs(&[("MAX_QUEUE_SIZE", "0")]).is_err());
        assert!(from_pairs(&[("QUEUE_DISPLAY_LIMIT", "0")]).is_err());
        assert!(from_pairs(&[("IDLE_TIMEOUT", "0s")]).is_err());
        assert!(from_pairs(&[("COMMAND_PREFIX", "! ")]).is_ok());

        let config = Config {
            command_prefix: "a b".into(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_summary_hides_token() {
        let config = Config {
            discord_token: Some("secret-token".into()),
            ..Config::default()
        };
        let summary = config.summary();
        assert!(!summary.contains("secret-token"));
        assert!(summary.contains("token set"));
        assert!(summary.contains("idle disconnect after 5m"));
    }
}
