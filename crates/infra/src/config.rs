//! Storage configuration loaded from the environment.

use thiserror::Error;

/// Default size of the Postgres connection pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub database_url: String,
    pub max_connections: u32,
}

impl StoreConfig {
    /// Read `DATABASE_URL` (required) and `ECOFINDS_DB_MAX_CONNECTIONS` (optional).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let max_connections = match lookup("ECOFINDS_DB_MAX_CONNECTIONS") {
            None => DEFAULT_MAX_CONNECTIONS,
            Some(raw) => {
                let parsed: u32 = raw.trim().parse().map_err(|e| ConfigError::Invalid {
                    name: "ECOFINDS_DB_MAX_CONNECTIONS",
                    reason: format!("{e}"),
                })?;
                if parsed == 0 {
                    return Err(ConfigError::Invalid {
                        name: "ECOFINDS_DB_MAX_CONNECTIONS",
                        reason: "must be at least 1".to_string(),
                    });
                }
                parsed
            }
        };

        Ok(Self {
            database_url,
            max_connections,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn database_url_is_required() {
        assert_eq!(
            StoreConfig::from_lookup(lookup(&[])),
            Err(ConfigError::Missing("DATABASE_URL"))
        );
        assert_eq!(
            StoreConfig::from_lookup(lookup(&[("DATABASE_URL", "  ")])),
            Err(ConfigError::Missing("DATABASE_URL"))
        );
    }

    #[test]
    fn pool_size_defaults_and_parses() {
        let cfg = StoreConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/eco")]))
            .unwrap();
        assert_eq!(cfg.max_connections, DEFAULT_MAX_CONNECTIONS);

        let cfg = StoreConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/eco"),
            ("ECOFINDS_DB_MAX_CONNECTIONS", "12"),
        ]))
        .unwrap();
        assert_eq!(cfg.max_connections, 12);
    }

    #[test]
    fn bad_pool_size_is_rejected() {
        for raw in ["0", "many"] {
            let err = StoreConfig::from_lookup(lookup(&[
                ("DATABASE_URL", "postgres://localhost/eco"),
                ("ECOFINDS_DB_MAX_CONNECTIONS", raw),
            ]))
            .unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { .. }), "{raw}: {err:?}");
        }
    }
}
