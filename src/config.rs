use std::env;

use anyhow::{Context, Result, anyhow};

use crate::path_guard::RedirectPolicy;

const DEFAULT_DISALLOW: &str = "/login,/login/oidc";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_bind_addr: String,
    pub default_redirect_path: String,
    pub redirect_disallow: Vec<String>,
    pub redirect_extra_schemes: Vec<String>,
    pub redirect_decode_passes: usize,
    pub max_redirect_length: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup, e.g. a map in tests.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| optional(&lookup, key);

        let http_bind_addr =
            var("HTTP_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string());
        let redirect_disallow = split_list(
            &var("REDIRECT_DISALLOW").unwrap_or_else(|| DEFAULT_DISALLOW.to_string()),
        );
        let redirect_extra_schemes =
            split_list(&var("REDIRECT_EXTRA_SCHEMES").unwrap_or_default());
        let redirect_decode_passes = var("REDIRECT_DECODE_PASSES")
            .as_deref()
            .unwrap_or("3")
            .parse::<usize>()
            .context("REDIRECT_DECODE_PASSES must be an integer")?;
        let max_redirect_length = var("MAX_REDIRECT_LENGTH")
            .as_deref()
            .unwrap_or("2048")
            .parse::<usize>()
            .context("MAX_REDIRECT_LENGTH must be an integer")?;

        if redirect_decode_passes == 0 {
            return Err(anyhow!("REDIRECT_DECODE_PASSES must be > 0"));
        }
        if max_redirect_length == 0 {
            return Err(anyhow!("MAX_REDIRECT_LENGTH must be > 0"));
        }

        let mut config = Self {
            http_bind_addr,
            default_redirect_path: "/".to_string(),
            redirect_disallow,
            redirect_extra_schemes,
            redirect_decode_passes,
            max_redirect_length,
        };

        // The fallback has to pass the same rules it stands in for.
        let raw_default = var("DEFAULT_REDIRECT_PATH").unwrap_or_else(|| "/".to_string());
        config.default_redirect_path = config
            .policy()
            .sanitize(Some(&raw_default))
            .with_context(|| {
                format!("DEFAULT_REDIRECT_PATH must be a safe, allowed path: {raw_default}")
            })?;

        Ok(config)
    }

    pub fn policy(&self) -> RedirectPolicy {
        RedirectPolicy::new()
            .with_disallow(self.redirect_disallow.iter().cloned())
            .with_extra_schemes(self.redirect_extra_schemes.iter().cloned())
            .with_decode_passes(self.redirect_decode_passes)
            .with_max_length(self.max_redirect_length)
    }
}

fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|v| {
        let trimmed = v.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).expect("valid config");
        assert_eq!(config.http_bind_addr, "0.0.0.0:8080");
        assert_eq!(config.default_redirect_path, "/");
        assert_eq!(config.redirect_disallow, vec!["/login", "/login/oidc"]);
        assert!(config.redirect_extra_schemes.is_empty());
        assert_eq!(config.redirect_decode_passes, 3);
        assert_eq!(config.max_redirect_length, 2048);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = load(&[("HTTP_BIND_ADDR", "   ")]).expect("valid config");
        assert_eq!(config.http_bind_addr, "0.0.0.0:8080");
    }

    #[test]
    fn parses_lists() {
        let config = load(&[
            ("REDIRECT_DISALLOW", " /login , ,/signup"),
            ("REDIRECT_EXTRA_SCHEMES", "intent,mailto"),
        ])
        .expect("valid config");
        assert_eq!(config.redirect_disallow, vec!["/login", "/signup"]);
        assert!(config.policy().is_disallowed("/signup"));
        assert!(config.policy().sanitize(Some("/intent:x")).is_none());
    }

    #[test]
    fn normalizes_default_redirect_path() {
        let config =
            load(&[("DEFAULT_REDIRECT_PATH", "/home/./feed/")]).expect("valid config");
        assert_eq!(config.default_redirect_path, "/home/feed/");
    }

    #[test]
    fn rejects_unsafe_default_redirect_path() {
        assert!(load(&[("DEFAULT_REDIRECT_PATH", "//evil.com")]).is_err());
        assert!(load(&[("DEFAULT_REDIRECT_PATH", "/login")]).is_err());
    }

    #[test]
    fn rejects_zero_limits() {
        assert!(load(&[("REDIRECT_DECODE_PASSES", "0")]).is_err());
        assert!(load(&[("MAX_REDIRECT_LENGTH", "0")]).is_err());
        assert!(load(&[("MAX_REDIRECT_LENGTH", "lots")]).is_err());
    }
}
