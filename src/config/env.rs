//! Process configuration read from the environment (and `.env`, if present).

use crate::error::ConfigError;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 1234;
pub const DEFAULT_API_PREFIX: &str = "/api/v1";
pub const DEFAULT_LOG_FILTER: &str = "scaffold_sdk=info,tower_http=info";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub api_prefix: String,
    pub database_url: Option<String>,
    pub database_schema: String,
    pub database_max_connections: u32,
    pub json_db_path: PathBuf,
    pub jwt_secret: Option<String>,
    pub token_ttl: Duration,
    pub request_timeout: Duration,
    pub body_limit_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            port: DEFAULT_PORT,
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            database_url: None,
            database_schema: "public".to_string(),
            database_max_connections: 5,
            json_db_path: PathBuf::from("db.json"),
            jwt_secret: None,
            token_ttl: Duration::from_secs(24 * 3600),
            request_timeout: Duration::from_secs(30),
            body_limit_bytes: 1024 * 1024,
        }
    }
}

impl AppConfig {
    /// Load `.env`, then read the process environment. Every name in `required` must be set and non-empty.
    pub fn from_env(required: &[&str]) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
            Err(e) => tracing::debug!(error = %e, "no .env loaded"),
        }
        Self::from_lookup(required, |name| env::var(name).ok())
    }

    /// Same as `from_env` with an explicit variable source.
    pub fn from_lookup<F>(required: &[&str], lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let missing: Vec<String> = required
            .iter()
            .filter(|name| get(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingEnv(missing));
        }

        let defaults = AppConfig::default();
        Ok(AppConfig {
            port: parse_or("APP_PORT", get("APP_PORT"), defaults.port)?,
            api_prefix: get("API_PREFIX").unwrap_or(defaults.api_prefix),
            database_url: get("DATABASE_URL"),
            database_schema: get("DATABASE_SCHEMA").unwrap_or(defaults.database_schema),
            database_max_connections: parse_or(
                "DATABASE_MAX_CONNECTIONS",
                get("DATABASE_MAX_CONNECTIONS"),
                defaults.database_max_connections,
            )?,
            json_db_path: get("JSON_DB_PATH").map(PathBuf::from).unwrap_or(defaults.json_db_path),
            jwt_secret: get("JWT_SECRET"),
            token_ttl: Duration::from_secs(
                parse_or::<u64>("TOKEN_TTL_HOURS", get("TOKEN_TTL_HOURS"), 24)?
                    .checked_mul(3600)
                    .ok_or_else(|| ConfigError::InvalidEnv {
                        name: "TOKEN_TTL_HOURS".into(),
                        reason: "too large".into(),
                    })?,
            ),
            request_timeout: Duration::from_secs(parse_or(
                "REQUEST_TIMEOUT_SECS",
                get("REQUEST_TIMEOUT_SECS"),
                defaults.request_timeout.as_secs(),
            )?),
            body_limit_bytes: parse_or("BODY_LIMIT_BYTES", get("BODY_LIMIT_BYTES"), defaults.body_limit_bytes)?,
        })
    }

    /// `DATABASE_URL`, or a `MissingEnv` error naming it.
    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnv(vec!["DATABASE_URL".into()]))
    }
}

fn parse_or<T>(name: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnv {
            name: name.to_string(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = AppConfig::from_lookup(&[], lookup(&[])).unwrap();
        assert_eq!(cfg.port, 1234);
        assert_eq!(cfg.api_prefix, "/api/v1");
        assert_eq!(cfg.token_ttl, Duration::from_secs(86400));
        assert_eq!(cfg.body_limit_bytes, 1_048_576);
        assert!(cfg.database_url.is_none());
    }

    #[test]
    fn all_missing_names_are_reported() {
        let err = AppConfig::from_lookup(&["DATABASE_URL", "JWT_SECRET", "APP_PORT"], lookup(&[("JWT_SECRET", " ")]))
            .unwrap_err();
        match err {
            ConfigError::MissingEnv(names) => assert_eq!(names, vec!["DATABASE_URL", "JWT_SECRET", "APP_PORT"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn numeric_values_are_parsed() {
        let cfg = AppConfig::from_lookup(
            &[],
            lookup(&[("APP_PORT", "8080"), ("TOKEN_TTL_HOURS", "2"), ("REQUEST_TIMEOUT_SECS", "5")]),
        )
        .unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.token_ttl, Duration::from_secs(7200));
        assert_eq!(cfg.request_timeout, Duration::from_secs(5));

        let err = AppConfig::from_lookup(&[], lookup(&[("APP_PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { ref name, .. } if name == "APP_PORT"));
    }

    #[test]
    fn oversized_token_ttl_is_rejected() {
        let err = AppConfig::from_lookup(&[], lookup(&[("TOKEN_TTL_HOURS", "18446744073709551615")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { ref name, .. } if name == "TOKEN_TTL_HOURS"));
    }
}
