//! Runtime configuration.
//!
//! Values come from command-line overrides first, then environment variables
//! (which may themselves be populated from a `.env` file), then defaults.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{RedhelmError, RedhelmResult};
use crate::llm::{Provider, RetryPolicy};
use crate::prompt::DEFAULT_PERSONA;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Values supplied explicitly by the caller, taking precedence over the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_attempts: Option<u32>,
    pub persona_file: Option<PathBuf>,
}

/// Fully resolved configuration for one run.
#[derive(Clone)]
pub struct Config {
    pub provider: Provider,
    pub model: String,
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub persona: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .field("persona_len", &self.persona.len())
            .finish()
    }
}

impl Config {
    /// Resolve configuration from overrides and the process environment.
    pub fn from_env(overrides: ConfigOverrides) -> RedhelmResult<Self> {
        Self::resolve(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve configuration using `lookup` to read environment variables.
    pub fn resolve<F>(overrides: ConfigOverrides, lookup: F) -> RedhelmResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = match overrides.provider {
            Some(p) => p,
            None => match env("REDHELM_PROVIDER") {
                Some(raw) => raw.parse().map_err(RedhelmError::Config)?,
                None => Provider::default(),
            },
        };

        let api_key = provider
            .api_key_vars()
            .iter()
            .find_map(|&var| env(var))
            .ok_or_else(|| {
                let var = provider.api_key_vars()[0];
                RedhelmError::config(format!(
                    "{var} environment variable not set.\n\
                     Set it with: export {var}=your-key (or add it to a .env file)"
                ))
            })?;

        let model = overrides
            .model
            .or_else(|| env("REDHELM_MODEL"))
            .unwrap_or_else(|| provider.default_model().to_string());

        let base_url = overrides
            .base_url
            .or_else(|| env("REDHELM_BASE_URL"))
            .unwrap_or_else(|| provider.default_base_url().to_string());

        let timeout_secs = match overrides.timeout_secs {
            Some(secs) => secs,
            None => parse_number(env("REDHELM_TIMEOUT_SECS"), "REDHELM_TIMEOUT_SECS")?
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        };
        if timeout_secs == 0 {
            return Err(RedhelmError::config("timeout must be at least 1 second"));
        }

        let max_attempts = match overrides.max_attempts {
            Some(n) => n,
            None => parse_number(env("REDHELM_MAX_ATTEMPTS"), "REDHELM_MAX_ATTEMPTS")?
                .unwrap_or(crate::llm::retry::DEFAULT_MAX_ATTEMPTS),
        };
        if max_attempts == 0 {
            return Err(RedhelmError::config("max attempts must be at least 1"));
        }

        let persona_file = overrides
            .persona_file
            .or_else(|| env("REDHELM_PERSONA_FILE").map(PathBuf::from));
        let persona = match persona_file {
            Some(path) => {
                let text = std::fs::read_to_string(&path).map_err(|e| {
                    RedhelmError::config(format!(
                        "cannot read persona file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                if text.trim().is_empty() {
                    return Err(RedhelmError::config(format!(
                        "persona file {} is empty",
                        path.display()
                    )));
                }
                text
            }
            None => DEFAULT_PERSONA.to_string(),
        };

        Ok(Self {
            provider,
            model,
            api_key,
            base_url,
            timeout: Duration::from_secs(timeout_secs),
            retry: RetryPolicy::with_max_attempts(max_attempts),
            persona,
        })
    }

    #[cfg(test)]
    pub(crate) fn for_tests(provider: Provider) -> Self {
        Self {
            provider,
            model: provider.default_model().to_string(),
            api_key: "test-key".to_string(),
            base_url: "http://localhost:9/".to_string(),
            timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
            persona: DEFAULT_PERSONA.to_string(),
        }
    }
}

fn parse_number<T: FromStr>(raw: Option<String>, var: &str) -> RedhelmResult<Option<T>> {
    raw.map(|v| {
        v.trim().parse::<T>().map_err(|_| {
            RedhelmError::config(format!("{var} must be a positive integer, got '{v}'"))
        })
    })
    .transpose()
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

    fn resolve(vars: &[(&str, &str)]) -> RedhelmResult<Config> {
        Config::resolve(ConfigOverrides::default(), lookup(vars))
    }

    fn resolve_with(overrides: ConfigOverrides) -> RedhelmResult<Config> {
        Config::resolve(overrides, lookup(&[("GOOGLE_API_KEY", "k")]))
    }

    #[test]
    fn test_defaults_with_gemini_key() {
        let config = resolve(&[("GOOGLE_API_KEY", "g-key")]).unwrap();
        assert_eq!(config.provider, Provider::Gemini);
        assert_eq!(config.model, "gemini-2.5-pro");
        assert_eq!(config.api_key, "g-key");
        assert_eq!(config.base_url, "https://generativelanguage.googleapis.com");
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.persona, DEFAULT_PERSONA);
    }

    #[test]
    fn test_gemini_key_fallback_var() {
        let config = resolve(&[("GEMINI_API_KEY", "alt")]).unwrap();
        assert_eq!(config.api_key, "alt");
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let err = resolve(&[]).unwrap_err();
        assert!(matches!(err, RedhelmError::Config(_)));
        assert!(err.to_string().contains("GOOGLE_API_KEY"));

        let blank = resolve(&[("GOOGLE_API_KEY", "  ")]);
        assert!(matches!(blank, Err(RedhelmError::Config(_))));
    }

    #[test]
    fn test_provider_from_env() {
        let config = resolve(&[
            ("REDHELM_PROVIDER", "anthropic"),
            ("ANTHROPIC_API_KEY", "a-key"),
        ])
        .unwrap();
        assert_eq!(config.provider, Provider::Anthropic);
        assert_eq!(config.model, "claude-sonnet-4-20250514");
        assert_eq!(config.base_url, "https://api.anthropic.com");
    }

    #[test]
    fn test_unknown_provider() {
        let vars = [("REDHELM_PROVIDER", "openai"), ("GOOGLE_API_KEY", "k")];
        let err = resolve(&vars).unwrap_err();
        assert!(matches!(err, RedhelmError::Config(_)));
    }

    #[test]
    fn test_overrides_win_over_env() {
        let overrides = ConfigOverrides {
            provider: Some(Provider::Gemini),
            model: Some("gemini-2.5-flash".to_string()),
            base_url: Some("http://proxy.local".to_string()),
            timeout_secs: Some(30),
            max_attempts: Some(4),
            persona_file: None,
        };
        let config = Config::resolve(
            overrides,
            lookup(&[
                ("REDHELM_PROVIDER", "anthropic"),
                ("REDHELM_MODEL", "ignored"),
                ("REDHELM_TIMEOUT_SECS", "999"),
                ("REDHELM_MAX_ATTEMPTS", "9"),
                ("GOOGLE_API_KEY", "k"),
            ]),
        )
        .unwrap();
        assert_eq!(config.provider, Provider::Gemini);
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.base_url, "http://proxy.local");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.retry.max_attempts, 4);
    }

    #[test]
    fn test_numeric_env_values() {
        let config = resolve(&[
            ("GOOGLE_API_KEY", "k"),
            ("REDHELM_TIMEOUT_SECS", " 45 "),
            ("REDHELM_MAX_ATTEMPTS", "3"),
        ])
        .unwrap();
        assert_eq!(config.timeout, Duration::from_secs(45));
        assert_eq!(config.retry.max_attempts, 3);

        let bad = resolve(&[("GOOGLE_API_KEY", "k"), ("REDHELM_TIMEOUT_SECS", "soon")]);
        assert!(matches!(bad, Err(RedhelmError::Config(_))));
    }

    #[test]
    fn test_zero_attempts_and_timeout_rejected() {
        let zero_attempts = ConfigOverrides {
            max_attempts: Some(0),
            ..Default::default()
        };
        assert!(matches!(resolve_with(zero_attempts), Err(RedhelmError::Config(_))));

        let zero_timeout = ConfigOverrides {
            timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(matches!(resolve_with(zero_timeout), Err(RedhelmError::Config(_))));
    }

    #[test]
    fn test_persona_file() {
        let name = format!("redhelm-persona-{}.txt", std::process::id());
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, "You are a blue-team analyst.").unwrap();

        let overrides = ConfigOverrides {
            persona_file: Some(path.clone()),
            ..Default::default()
        };
        let config = resolve_with(overrides).unwrap();
        assert_eq!(config.persona, "You are a blue-team analyst.");

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_persona_file() {
        let overrides = ConfigOverrides {
            persona_file: Some(PathBuf::from("/nonexistent/redhelm/persona.txt")),
            ..Default::default()
        };
        let err = resolve_with(overrides).unwrap_err();
        assert!(err.to_string().contains("persona"));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = resolve(&[("GOOGLE_API_KEY", "super-secret")]).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("redacted"));
    }
}
