//! Environment-driven API configuration, read once at startup.

use std::net::{AddrParseError, SocketAddr};

use thiserror::Error;

use feedforge_formulation::{DEFAULT_MAX_ROUNDS, OptimizerConfig};

pub const BIND_ADDR_ENV: &str = "FEEDFORGE_BIND_ADDR";
pub const MAX_ROUNDS_ENV: &str = "FEEDFORGE_MAX_ROUNDS";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("FEEDFORGE_BIND_ADDR=`{value}` is not a socket address: {source}")]
    InvalidBindAddr {
        value: String,
        #[source]
        source: AddrParseError,
    },

    #[error("FEEDFORGE_MAX_ROUNDS=`{value}` must be a positive integer")]
    InvalidMaxRounds { value: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub optimizer: OptimizerConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            optimizer: OptimizerConfig::default(),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_addr = lookup(BIND_ADDR_ENV).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr
            .trim()
            .parse()
            .map_err(|source| ConfigError::InvalidBindAddr {
                value: raw_addr.clone(),
                source,
            })?;

        let max_rounds = match lookup(MAX_ROUNDS_ENV) {
            None => DEFAULT_MAX_ROUNDS,
            Some(value) => match value.trim().parse::<usize>() {
                Ok(n) if n >= 1 => n,
                _ => return Err(ConfigError::InvalidMaxRounds { value }),
            },
        };

        Ok(Self {
            bind_addr,
            optimizer: OptimizerConfig::default().with_max_rounds(max_rounds),
        })
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
    fn defaults_apply_when_unset() {
        let config = ApiConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ApiConfig::default());
        assert_eq!(config.optimizer.max_rounds, 25);
    }

    #[test]
    fn reads_overrides() {
        let config = ApiConfig::from_lookup(lookup(&[
            (BIND_ADDR_ENV, "127.0.0.1:9000"),
            (MAX_ROUNDS_ENV, " 5 "),
        ]))
        .unwrap();
        assert_eq!(
            config.bind_addr,
            "127.0.0.1:9000".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(config.optimizer.max_rounds, 5);
    }

    #[test]
    fn zero_rounds_is_rejected() {
        let err = ApiConfig::from_lookup(lookup(&[(MAX_ROUNDS_ENV, "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMaxRounds { .. }));
    }

    #[test]
    fn malformed_address_is_rejected() {
        let err = ApiConfig::from_lookup(lookup(&[(BIND_ADDR_ENV, "localhost")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBindAddr { .. }));
    }
}
