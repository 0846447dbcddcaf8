use axum::http::HeaderName;
use std::{env, path::PathBuf, time::Duration};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MEDIA_ROOT: &str = "media";
const DEFAULT_IDENTITY_HEADER: &str = "x-remote-user";
const DEFAULT_LOGIN_URL: &str = "/auth/login/";
const DEFAULT_INDEX_CACHE_SECONDS: u64 = 20;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set in .env file")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Runtime settings, read from the environment (and `.env` when present).
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Uploaded images live under `<media_root>/posts/`.
    pub media_root: PathBuf,
    /// Header set by the authentication proxy to the signed-in username.
    pub identity_header: HeaderName,
    /// Where anonymous writers are sent; receives `?next=<path>`.
    pub login_url: String,
    /// Lifetime of a cached index page. Zero disables the cache.
    pub index_cache_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_owned());
        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;
        let media_root = lookup("MEDIA_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MEDIA_ROOT));

        let header = lookup("IDENTITY_HEADER").unwrap_or_else(|| DEFAULT_IDENTITY_HEADER.to_owned());
        let identity_header = HeaderName::try_from(header.as_str()).map_err(|_| {
            ConfigError::Invalid {
                key: "IDENTITY_HEADER",
                value: header.clone(),
            }
        })?;

        let login_url = lookup("LOGIN_URL").unwrap_or_else(|| DEFAULT_LOGIN_URL.to_owned());
        let cache_seconds = parse_or(&lookup, "INDEX_CACHE_SECONDS", DEFAULT_INDEX_CACHE_SECONDS)?;

        Ok(Self {
            database_url,
            host,
            port,
            media_root,
            identity_header,
            login_url,
            index_cache_ttl: Duration::from_secs(cache_seconds),
        })
    }

    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_fill_everything_but_the_database() {
        let config = Config::from_lookup(lookup(&[("DATABASE_URL", "sqlite::memory:")])).unwrap();
        assert_eq!(config.server_url(), "127.0.0.1:8000");
        assert_eq!(config.media_root, PathBuf::from("media"));
        assert_eq!(config.identity_header.as_str(), "x-remote-user");
        assert_eq!(config.login_url, "/auth/login/");
        assert_eq!(config.index_cache_ttl, Duration::from_secs(20));
    }

    #[test]
    fn database_url_is_required() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert_eq!(err.to_string(), "invalid value \"eighty\" for PORT");

        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("IDENTITY_HEADER", "not a header"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "IDENTITY_HEADER", .. }));
    }

    #[test]
    fn overrides_are_applied() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/yatube"),
            ("HOST", "0.0.0.0"),
            ("PORT", "3000"),
            ("INDEX_CACHE_SECONDS", "0"),
            ("IDENTITY_HEADER", "X-Forwarded-User"),
        ]))
        .unwrap();
        assert_eq!(config.server_url(), "0.0.0.0:3000");
        assert_eq!(config.index_cache_ttl, Duration::ZERO);
        assert_eq!(config.identity_header.as_str(), "x-forwarded-user");
    }
}
