//! Process configuration.
//!
//! Read once at startup and handed down immutably; nothing reads the
//! environment after `AppConfig::from_env` returns.

use std::net::SocketAddr;

use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:9090";
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 10_000_000;
pub const MAX_TOKEN_TTL_MINUTES: i64 = 100_000_000;

const MIN_BCRYPT_COST: u32 = 4;
const MAX_BCRYPT_COST: u32 = 31;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub database_url: Option<String>,
    pub bind_addr: SocketAddr,
    pub token_ttl: chrono::Duration,
    pub bcrypt_cost: u32,
}

impl core::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppConfig")
            .field("jwt_secret", &"<redacted>")
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("bind_addr", &self.bind_addr)
            .field("token_ttl_minutes", &self.token_ttl.num_minutes())
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                key: "BIND_ADDR",
                reason: e.to_string(),
            })?;

        let ttl_minutes = match get("TOKEN_TTL_MINUTES") {
            Some(raw) => parse_positive_minutes(&raw)?,
            None => DEFAULT_TOKEN_TTL_MINUTES,
        };
        let token_ttl = chrono::Duration::try_minutes(ttl_minutes).ok_or_else(|| ConfigError::Invalid {
            key: "TOKEN_TTL_MINUTES",
            reason: format!("{ttl_minutes} minutes is out of range"),
        })?;

        let bcrypt_cost = match get("BCRYPT_COST") {
            Some(raw) => parse_bcrypt_cost(&raw)?,
            None => bcrypt::DEFAULT_COST,
        };

        Ok(Self {
            jwt_secret,
            database_url: get("DATABASE_URL"),
            bind_addr,
            token_ttl,
            bcrypt_cost,
        })
    }
}

fn parse_positive_minutes(raw: &str) -> Result<i64, ConfigError> {
    match raw.trim().parse::<i64>() {
        Ok(minutes) if (1..=MAX_TOKEN_TTL_MINUTES).contains(&minutes) => Ok(minutes),
        Ok(minutes) => Err(ConfigError::Invalid {
            key: "TOKEN_TTL_MINUTES",
            reason: format!("must be within 1..={MAX_TOKEN_TTL_MINUTES}, got {minutes}"),
        }),
        Err(e) => Err(ConfigError::Invalid {
            key: "TOKEN_TTL_MINUTES",
            reason: e.to_string(),
        }),
    }
}

fn parse_bcrypt_cost(raw: &str) -> Result<u32, ConfigError> {
    let cost = raw.trim().parse::<u32>().map_err(|e| ConfigError::Invalid {
        key: "BCRYPT_COST",
        reason: e.to_string(),
    })?;

    if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
        return Err(ConfigError::Invalid {
            key: "BCRYPT_COST",
            reason: format!("must be within {MIN_BCRYPT_COST}..={MAX_BCRYPT_COST}, got {cost}"),
        });
    }
    Ok(cost)
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
    fn defaults_apply_when_only_secret_is_set() {
        let config = AppConfig::from_lookup(lookup(&[("JWT_SECRET", "s3cret")])).unwrap();

        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.database_url, None);
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR.parse().unwrap());
        assert_eq!(config.token_ttl.num_minutes(), DEFAULT_TOKEN_TTL_MINUTES);
        assert_eq!(config.bcrypt_cost, bcrypt::DEFAULT_COST);
    }

    #[test]
    fn missing_or_blank_secret_fails() {
        assert_eq!(
            AppConfig::from_lookup(lookup(&[])).unwrap_err(),
            ConfigError::Missing("JWT_SECRET")
        );
        assert_eq!(
            AppConfig::from_lookup(lookup(&[("JWT_SECRET", "  ")])).unwrap_err(),
            ConfigError::Missing("JWT_SECRET")
        );
    }

    #[test]
    fn overrides_are_parsed() {
        let config = AppConfig::from_lookup(lookup(&[
            ("JWT_SECRET", "s"),
            ("DATABASE_URL", "postgres://localhost/blog"),
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("TOKEN_TTL_MINUTES", "15"),
            ("BCRYPT_COST", "6"),
        ]))
        .unwrap();

        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/blog"));
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.token_ttl, chrono::Duration::minutes(15));
        assert_eq!(config.bcrypt_cost, 6);
    }

    #[test]
    fn invalid_values_name_their_key() {
        for (key, value) in [
            ("BIND_ADDR", "not-an-addr"),
            ("TOKEN_TTL_MINUTES", "0"),
            ("TOKEN_TTL_MINUTES", "ten"),
            ("TOKEN_TTL_MINUTES", "100000000000000"),
            ("BCRYPT_COST", "3"),
            ("BCRYPT_COST", "32"),
        ] {
            let err = AppConfig::from_lookup(lookup(&[("JWT_SECRET", "s"), (key, value)])).unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { key: k, .. } if k == key),
                "{key}={value} gave {err:?}"
            );
        }
    }

    #[test]
    fn largest_accepted_ttl_still_issues_tokens() {
        let config = AppConfig::from_lookup(lookup(&[
            ("JWT_SECRET", "s"),
            ("TOKEN_TTL_MINUTES", MAX_TOKEN_TTL_MINUTES.to_string().as_str()),
        ]))
        .unwrap();

        let service = quill_auth::Hs256TokenService::new(config.jwt_secret.as_bytes(), config.token_ttl);
        let issued = quill_auth::TokenIssuer::issue(&service, "alice", &quill_auth::Role::USER, chrono::Utc::now());
        assert!(issued.is_ok(), "{issued:?}");
    }

    #[test]
    fn debug_output_redacts_secret() {
        let config = AppConfig::from_lookup(lookup(&[
            ("JWT_SECRET", "top-secret-value"),
            ("DATABASE_URL", "postgres://user:pw@db/blog"),
        ]))
        .unwrap();

        let rendered = format!("{config:?}");
        assert!(!rendered.contains("top-secret-value"));
        assert!(!rendered.contains("pw@db"));
    }
}
