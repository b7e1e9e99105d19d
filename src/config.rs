//! Experiment configuration and API credential resolution.
//!
//! Configuration is an explicit value handed to each component, so several
//! experiment setups can coexist in one process. Every field has a default;
//! a JSON file may override any subset and CLI flags override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::gateway::chat_completions::{OPENAI_BASE_URL, OPENROUTER_BASE_URL};
use crate::gateway::GatewayConfig;
use crate::prompts::DEFAULT_WORD_BUDGET;

/// Environment variables checked for an API key, in priority order.
pub const API_KEY_VARS: [&str; 2] = ["OPENROUTER_API_KEY", "OPENAI_API_KEY"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing OPENROUTER_API_KEY/OPENAI_API_KEY for API access")]
    MissingCredential,
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Knobs for one experiment run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Model id used for both generation and judging.
    pub model: String,
    pub temperature: f32,
    /// Token cap for the two summary generations.
    pub max_tokens: u32,
    /// Token cap for the judge call; only a short verdict is needed.
    pub judge_max_tokens: u32,
    /// Word cap stated in the concise prompt.
    pub word_budget: u32,
    /// Number of examples taken from the head of the dataset.
    pub num_examples: usize,
    /// Seed for the presentation-order RNG.
    pub seed: u64,
    /// Total attempts per model call.
    pub max_retries: u32,
    pub backoff_base_secs: f64,
    pub request_timeout_secs: u64,
    /// Rows read from the verbosity dataset.
    pub helpsteer_sample_size: usize,
}

fn default_model() -> String {
    std::env::var("OPENROUTER_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string())
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: 0.2,
            max_tokens: 200,
            judge_max_tokens: 64,
            word_budget: DEFAULT_WORD_BUDGET,
            num_examples: 5,
            seed: 42,
            max_retries: 3,
            backoff_base_secs: 2.0,
            request_timeout_secs: 30,
            helpsteer_sample_size: 1000,
        }
    }
}

impl ExperimentConfig {
    /// Load from a JSON file; fields absent from the file keep their defaults.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid("model must not be empty".into()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Invalid(format!(
                "temperature must be within [0, 2], got {}",
                self.temperature
            )));
        }
        if self.max_tokens == 0 || self.judge_max_tokens == 0 {
            return Err(ConfigError::Invalid("token budgets must be >= 1".into()));
        }
        if self.word_budget == 0 {
            return Err(ConfigError::Invalid("word_budget must be >= 1".into()));
        }
        if self.num_examples == 0 {
            return Err(ConfigError::Invalid("num_examples must be >= 1".into()));
        }
        if self.max_retries == 0 {
            return Err(ConfigError::Invalid("max_retries must be >= 1".into()));
        }
        if Duration::try_from_secs_f64(self.backoff_base_secs).is_err() {
            return Err(ConfigError::Invalid(format!(
                "backoff_base_secs must be a non-negative duration in seconds, got {}",
                self.backoff_base_secs
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be >= 1".into(),
            ));
        }
        Ok(())
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            max_retries: self.max_retries,
            // Unrepresentable values are rejected by `validate`.
            backoff_base: Duration::try_from_secs_f64(self.backoff_base_secs).unwrap_or_default(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// =============================================================================
// Credentials
// =============================================================================

static BASHRC_EXPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"export (OPENROUTER_API_KEY|OPENAI_API_KEY)="([^"]+)""#)
        .expect("Invalid bashrc export regex")
});

/// API key plus the endpoint it belongs to.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiCredentials {
    pub api_key: String,
    pub base_url: String,
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ApiCredentials {
    /// Resolve from the process environment, falling back to `~/.bashrc`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bashrc = std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".bashrc"));
        Self::resolve(|name| std::env::var(name).ok(), bashrc.as_deref())
    }

    /// Resolve with an explicit variable lookup and optional shell rc file.
    pub fn resolve<F>(lookup: F, bashrc: Option<&Path>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let from_env = API_KEY_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .find(|value| !value.trim().is_empty());

        let api_key = match from_env {
            Some(key) => key,
            None => bashrc
                .and_then(|path| std::fs::read_to_string(path).ok())
                .and_then(|text| key_from_bashrc(&text))
                .ok_or(ConfigError::MissingCredential)?,
        };

        let base_url = if api_key.starts_with("sk-or-") {
            lookup("OPENROUTER_API_BASE").unwrap_or_else(|| OPENROUTER_BASE_URL.to_string())
        } else {
            OPENAI_BASE_URL.to_string()
        };

        Ok(Self { api_key, base_url })
    }
}

/// Find the first exported key, honoring the same priority as the environment.
fn key_from_bashrc(text: &str) -> Option<String> {
    API_KEY_VARS.iter().find_map(|wanted| {
        BASHRC_EXPORT
            .captures_iter(text)
            .find(|caps| &caps[1] == *wanted)
            .map(|caps| caps[2].to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_match_reference_run() {
        let config = ExperimentConfig {
            model: "gpt-4o-mini".into(),
            ..ExperimentConfig::default()
        };
        assert_eq!(config.max_tokens, 200);
        assert_eq!(config.judge_max_tokens, 64);
        assert_eq!(config.word_budget, DEFAULT_WORD_BUDGET);
        assert_eq!(DEFAULT_WORD_BUDGET, 100);
        assert_eq!(config.num_examples, 5);
        assert_eq!(config.seed, 42);
        assert_eq!(config.max_retries, 3);
        assert!(config.validate().is_ok());
        assert_eq!(config.gateway_config().backoff_base, Duration::from_secs(2));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: ExperimentConfig =
            serde_json::from_str(r#"{"model": "test/model", "word_budget": 60}"#).unwrap();
        assert_eq!(config.model, "test/model");
        assert_eq!(config.word_budget, 60);
        assert_eq!(config.judge_max_tokens, 64);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let base = ExperimentConfig {
            model: "m".into(),
            ..ExperimentConfig::default()
        };
        let cases = [
            ExperimentConfig {
                max_retries: 0,
                ..base.clone()
            },
            ExperimentConfig {
                temperature: 2.5,
                ..base.clone()
            },
            ExperimentConfig {
                backoff_base_secs: f64::NAN,
                ..base.clone()
            },
            ExperimentConfig {
                backoff_base_secs: -1.0,
                ..base.clone()
            },
            ExperimentConfig {
                backoff_base_secs: 1e300,
                ..base.clone()
            },
            ExperimentConfig {
                request_timeout_secs: 0,
                ..base.clone()
            },
            ExperimentConfig {
                num_examples: 0,
                ..base.clone()
            },
            ExperimentConfig {
                model: " ".into(),
                ..base.clone()
            },
        ];
        for case in cases {
            assert!(matches!(case.validate(), Err(ConfigError::Invalid(_))));
        }
    }

    #[test]
    fn test_huge_backoff_never_panics() {
        let config = ExperimentConfig {
            backoff_base_secs: 1e300,
            ..ExperimentConfig::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(config.gateway_config().backoff_base, Duration::ZERO);

        let config = ExperimentConfig {
            backoff_base_secs: 0.25,
            ..ExperimentConfig::default()
        };
        assert_eq!(
            config.gateway_config().backoff_base,
            Duration::from_millis(250)
        );
    }

    #[test]
    fn test_env_key_preferred_in_order() {
        let creds = ApiCredentials::resolve(
            lookup_from(&[("OPENAI_API_KEY", "sk-openai"), ("OPENROUTER_API_KEY", "sk-or-abc")]),
            None,
        )
        .unwrap();
        assert_eq!(creds.api_key, "sk-or-abc");
        assert_eq!(creds.base_url, OPENROUTER_BASE_URL);
    }

    #[test]
    fn test_openai_key_targets_openai_endpoint() {
        let creds =
            ApiCredentials::resolve(lookup_from(&[("OPENAI_API_KEY", "sk-plain")]), None).unwrap();
        assert_eq!(creds.base_url, OPENAI_BASE_URL);
    }

    #[test]
    fn test_openrouter_base_override() {
        let creds = ApiCredentials::resolve(
            lookup_from(&[
                ("OPENROUTER_API_KEY", "sk-or-xyz"),
                ("OPENROUTER_API_BASE", "http://localhost:9999/v1"),
            ]),
            None,
        )
        .unwrap();
        assert_eq!(creds.base_url, "http://localhost:9999/v1");
    }

    #[test]
    fn test_bashrc_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let rc = dir.path().join(".bashrc");
        std::fs::write(
            &rc,
            "alias ll='ls -l'\nexport OPENAI_API_KEY=\"sk-from-rc\"\nexport OPENROUTER_API_KEY=\"sk-or-rc\"\n",
        )
        .unwrap();

        let creds = ApiCredentials::resolve(lookup_from(&[]), Some(&rc)).unwrap();
        assert_eq!(creds.api_key, "sk-or-rc");
    }

    #[test]
    fn test_missing_credential() {
        let dir = tempfile::tempdir().unwrap();
        let rc = dir.path().join(".bashrc");
        std::fs::write(&rc, "export PATH=\"/usr/bin\"\n").unwrap();

        let err = ApiCredentials::resolve(lookup_from(&[]), Some(&rc)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential));
    }

    #[test]
    fn test_debug_redacts_key() {
        let creds = ApiCredentials {
            api_key: "sk-secret".into(),
            base_url: OPENAI_BASE_URL.into(),
        };
        assert!(!format!("{creds:?}").contains("sk-secret"));
    }
}
