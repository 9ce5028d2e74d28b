//! Process configuration, read once at startup.
//!
//! All settings come from the environment (after `dotenvy` has loaded any
//! `.env` file). [`Config::from_lookup`] accepts an arbitrary key lookup so
//! tests never have to touch the real process environment.

use crate::neo::RecordPolicy;
use reqwest::Url;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_NEO_FEED_URL: &str = "https://api.nasa.gov/neo/rest/v1/feed";
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_FEED_TIMEOUT_SECS: u64 = 30;
const DEFAULT_ADVISORY_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{var}='{value}' is invalid: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// An API key. Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Settings for the NeoWs feed provider.
#[derive(Debug, Clone)]
pub struct NeoFeedConfig {
    pub api_key: Secret,
    pub url: Url,
    pub timeout: Duration,
    pub record_policy: RecordPolicy,
}

/// Settings for the Gemini text-generation dependency.
///
/// `api_key` is optional: without it every advisory comes from the fallback
/// pool.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<Secret>,
    pub endpoint: Url,
    pub model: String,
    pub timeout: Duration,
}

/// Both halves are independent. The feed half is `None` when
/// `NASA_API_KEY` is unset, which only matters to commands that fetch.
#[derive(Debug, Clone)]
pub struct Config {
    pub neo: Option<NeoFeedConfig>,
    pub gemini: GeminiConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from `lookup`. Empty values count as unset.
    ///
    /// Feed settings other than the key are validated even when the key is
    /// absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let url = parse_url("NEO_FEED_URL", get("NEO_FEED_URL"), DEFAULT_NEO_FEED_URL)?;
        let timeout = parse_secs(
            "NEO_FEED_TIMEOUT_SECS",
            get("NEO_FEED_TIMEOUT_SECS"),
            DEFAULT_FEED_TIMEOUT_SECS,
        )?;
        let record_policy = match get("INVALID_RECORD_POLICY") {
            None => RecordPolicy::default(),
            Some(v) => v.parse().map_err(|reason| ConfigError::Invalid {
                var: "INVALID_RECORD_POLICY",
                value: v.clone(),
                reason,
            })?,
        };
        let neo = get("NASA_API_KEY").map(|key| NeoFeedConfig {
            api_key: Secret::new(key),
            url,
            timeout,
            record_policy,
        });

        let gemini = GeminiConfig {
            api_key: get("GEMINI_API_KEY").map(Secret::new),
            endpoint: parse_url(
                "GEMINI_ENDPOINT",
                get("GEMINI_ENDPOINT"),
                DEFAULT_GEMINI_ENDPOINT,
            )?,
            model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            timeout: parse_secs(
                "ADVISORY_TIMEOUT_SECS",
                get("ADVISORY_TIMEOUT_SECS"),
                DEFAULT_ADVISORY_TIMEOUT_SECS,
            )?,
        };

        Ok(Self { neo, gemini })
    }

    /// Feed settings, for commands that fetch the feed.
    pub fn neo(&self) -> Result<&NeoFeedConfig, ConfigError> {
        self.neo.as_ref().ok_or(ConfigError::Missing("NASA_API_KEY"))
    }
}

fn parse_url(var: &'static str, value: Option<String>, default: &str) -> Result<Url, ConfigError> {
    let raw = value.unwrap_or_else(|| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::Invalid {
        var,
        value: raw.clone(),
        reason: e.to_string(),
    })
}

fn parse_secs(var: &'static str, value: Option<String>, default: u64) -> Result<Duration, ConfigError> {
    let Some(raw) = value else {
        return Ok(Duration::from_secs(default));
    };
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid {
            var,
            value: raw,
            reason: "timeout must be at least one second".to_string(),
        }),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(ConfigError::Invalid {
            var,
            value: raw,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_only_nasa_key() {
        let config = Config::from_lookup(lookup(&[("NASA_API_KEY", "nasa-key")])).unwrap();
        let neo = config.neo().unwrap();

        assert_eq!(neo.api_key.expose(), "nasa-key");
        assert_eq!(neo.url.as_str(), DEFAULT_NEO_FEED_URL);
        assert_eq!(neo.timeout, Duration::from_secs(30));
        assert_eq!(neo.record_policy, RecordPolicy::Skip);
        assert!(config.gemini.api_key.is_none());
        assert_eq!(config.gemini.model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.gemini.timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_gemini_only_environment_is_accepted() {
        let config = Config::from_lookup(lookup(&[("GEMINI_API_KEY", "g")])).unwrap();

        assert!(config.neo.is_none());
        assert_eq!(config.gemini.api_key.as_ref().unwrap().expose(), "g");
        assert!(matches!(config.neo(), Err(ConfigError::Missing("NASA_API_KEY"))));
    }

    #[test]
    fn test_blank_nasa_key_counts_as_missing() {
        let config = Config::from_lookup(lookup(&[("NASA_API_KEY", "   ")])).unwrap();
        assert!(matches!(config.neo(), Err(ConfigError::Missing("NASA_API_KEY"))));
    }

    #[test]
    fn test_bad_feed_url_is_rejected_without_key() {
        let err = Config::from_lookup(lookup(&[("NEO_FEED_URL", "not a url")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "NEO_FEED_URL", .. }));
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = Config::from_lookup(lookup(&[
            ("NASA_API_KEY", "n"),
            ("GEMINI_API_KEY", "g"),
            ("GEMINI_MODEL", "gemini-pro"),
            ("ADVISORY_TIMEOUT_SECS", "4"),
            ("NEO_FEED_URL", "http://localhost:9000/feed"),
            ("INVALID_RECORD_POLICY", "reject"),
        ]))
        .unwrap();

        assert_eq!(config.gemini.api_key.as_ref().unwrap().expose(), "g");
        assert_eq!(config.gemini.model, "gemini-pro");
        assert_eq!(config.gemini.timeout, Duration::from_secs(4));
        let neo = config.neo().unwrap();
        assert_eq!(neo.url.as_str(), "http://localhost:9000/feed");
        assert_eq!(neo.record_policy, RecordPolicy::Reject);
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("NASA_API_KEY", "n"),
            ("NEO_FEED_TIMEOUT_SECS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                var: "NEO_FEED_TIMEOUT_SECS",
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("NASA_API_KEY", "n"),
            ("INVALID_RECORD_POLICY", "maybe"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                var: "INVALID_RECORD_POLICY",
                ..
            }
        ));
    }

    #[test]
    fn test_debug_redacts_keys() {
        let config = Config::from_lookup(lookup(&[("NASA_API_KEY", "super-secret")])).unwrap();
        let printed = format!("{config:?}");
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("Secret(***)"));
    }
}
