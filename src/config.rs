use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use log::{info, warn};
use rand::RngCore;

use crate::{constants::SESSION_TTL_MAX_HOURS, error::ConfigError, validation::ValueLimits};

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub session_secret: Vec<u8>,
    pub session_ttl_hours: i64,
    pub media_root: PathBuf,
    pub limits: ValueLimits,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup instead of the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| ConfigError::new("DATABASE_URL must be set"))?;

        let session_secret = match lookup("SESSION_SECRET") {
            Some(secret) if !secret.is_empty() => secret.into_bytes(),
            _ => {
                warn!("SESSION_SECRET not set, sessions will not survive a restart");
                let mut secret = vec![0u8; 32];
                rand::thread_rng().fill_bytes(&mut secret);
                secret
            }
        };

        let min = try_load(&lookup, "RECIPE_MIN_VALUE", "1")?;
        let max = match lookup("RECIPE_MAX_VALUE") {
            Some(value) => Some(parse("RECIPE_MAX_VALUE", &value)?),
            None => None,
        };

        let session_ttl_hours: i64 = try_load(&lookup, "SESSION_TTL_HOURS", "1")?;
        if !(1..=SESSION_TTL_MAX_HOURS).contains(&session_ttl_hours) {
            warn!("Invalid SESSION_TTL_HOURS value: {session_ttl_hours}");
            return Err(ConfigError::new(&format!(
                "SESSION_TTL_HOURS must be between 1 and {SESSION_TTL_MAX_HOURS}"
            )));
        }

        Ok(Self {
            database_url,
            database_max_connections: try_load(&lookup, "DATABASE_MAX_CONNECTIONS", "5")?,
            session_secret,
            session_ttl_hours,
            media_root: PathBuf::from(
                lookup("MEDIA_ROOT").unwrap_or_else(|| "media".to_owned()),
            ),
            limits: ValueLimits::new(min, max),
        })
    }
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    parse(key, &value)
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    value.parse().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        ConfigError::new(&format!("Invalid {key} value: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://db")])).unwrap();
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.session_ttl_hours, 1);
        assert_eq!(config.session_secret.len(), 32);
        assert_eq!(config.media_root, PathBuf::from("media"));
        assert_eq!(config.limits, ValueLimits::default());
    }

    #[test]
    fn upper_bound_is_read_from_environment() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db"),
            ("RECIPE_MAX_VALUE", "32000"),
            ("SESSION_SECRET", "hunter2"),
        ]))
        .unwrap();
        assert_eq!(config.limits.max, Some(32000));
        assert_eq!(config.session_secret, b"hunter2".to_vec());
    }

    #[test]
    fn missing_database_url_is_an_error() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
    }

    #[test]
    fn session_lifetime_must_be_in_range() {
        for ttl in ["0", "-3", "3000000000"] {
            let result = Config::from_lookup(lookup(&[
                ("DATABASE_URL", "postgres://db"),
                ("SESSION_TTL_HOURS", ttl),
            ]));
            assert!(result.is_err(), "{ttl}");
        }

        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db"),
            ("SESSION_TTL_HOURS", "720"),
        ]))
        .unwrap();
        assert_eq!(config.session_ttl_hours, 720);
    }

    #[test]
    fn malformed_number_is_an_error() {
        let result = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db"),
            ("DATABASE_MAX_CONNECTIONS", "many"),
        ]));
        assert!(result.is_err());
    }
}
