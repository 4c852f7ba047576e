//! Runtime configuration from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `REPORTS_API_BASE` | `http://localhost:8080/api` |
//! | `REPORTS_PORT` | `3000` |
//! | `REPORTS_OUT_DIR` | `.` |
//! | `REPORTS_HTTP_TIMEOUT_SECS` | `30` |
//!
//! A `.env` file in the working directory is loaded first. Missing
//! or unparsable values fall back to the default with a warning; the service
//! never refuses to start over configuration.

use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use tracing::{info, warn};

pub const DEFAULT_API_BASE: &str = "http://localhost:8080/api";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_base: String,
    pub port: u16,
    pub out_dir: PathBuf,
    pub http_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            port: DEFAULT_PORT,
            out_dir: PathBuf::from("."),
            http_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl Config {
    /// Load `.env` if present, then read the process environment.
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load using `lookup` to resolve variable names.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base: String = try_load(&lookup, "REPORTS_API_BASE", DEFAULT_API_BASE.to_string());
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            port: try_load(&lookup, "REPORTS_PORT", DEFAULT_PORT),
            out_dir: PathBuf::from(try_load(&lookup, "REPORTS_OUT_DIR", ".".to_string())),
            http_timeout: Duration::from_secs(try_load(
                &lookup,
                "REPORTS_HTTP_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )),
        }
    }
}

fn try_load<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key).filter(|v| !v.trim().is_empty()) else {
        info!("{key} not set, using default: {default}");
        return default;
    };

    raw.trim().parse().unwrap_or_else(|e| {
        warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
        default
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
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        assert_eq!(Config::from_lookup(lookup_from(&[])), Config::default());
    }

    #[test]
    fn test_values_override_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("REPORTS_API_BASE", "https://example.org/api/"),
            ("REPORTS_PORT", "8088"),
            ("REPORTS_OUT_DIR", "/tmp/reports"),
            ("REPORTS_HTTP_TIMEOUT_SECS", "5"),
        ]));

        assert_eq!(config.api_base, "https://example.org/api");
        assert_eq!(config.port, 8088);
        assert_eq!(config.out_dir, PathBuf::from("/tmp/reports"));
        assert_eq!(config.http_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = Config::from_lookup(lookup_from(&[
            ("REPORTS_PORT", "not-a-port"),
            ("REPORTS_HTTP_TIMEOUT_SECS", "-1"),
        ]));

        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.http_timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }
}
