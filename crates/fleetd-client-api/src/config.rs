//! Startup configuration, read once from the environment.
//!
//! Mirrors `original_source/app/config.py`'s `Settings`: three independent,
//! optional gates (`jwt_algo`/`jwt_verif_key`, `api_key`) plus the bind
//! address and log filter this workspace's transport needs that the
//! original left to its process manager.

use std::env;

/// A configuration value failed validation at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("JWT_VERIF_KEY must be set and non-empty when JWT_ALGO is set")]
    MissingJwtVerifKey,
    #[error("JWT_ALGO {0:?} is not a supported algorithm")]
    UnsupportedJwtAlgo(String),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub jwt_algo: Option<jsonwebtoken::Algorithm>,
    pub jwt_verif_key: String,
    pub api_key: Option<String>,
    pub bind_addr: String,
}

impl Config {
    /// Read `JWT_ALGO`, `JWT_VERIF_KEY`, `API_KEY`, and `BIND_ADDR` from the
    /// environment. Empty strings are treated the same as unset, matching
    /// pydantic-settings' `env_ignore_empty`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_algo_raw = non_empty(env::var("JWT_ALGO").ok());
        let jwt_verif_key = non_empty(env::var("JWT_VERIF_KEY").ok()).unwrap_or_default();
        let api_key = non_empty(env::var("API_KEY").ok());
        let bind_addr = non_empty(env::var("BIND_ADDR").ok()).unwrap_or_else(|| "0.0.0.0:8080".to_string());

        let jwt_algo = match jwt_algo_raw {
            Some(raw) => {
                if jwt_verif_key.trim().is_empty() {
                    return Err(ConfigError::MissingJwtVerifKey);
                }
                Some(parse_algorithm(&raw)?)
            }
            None => None,
        };

        Ok(Self { jwt_algo, jwt_verif_key, api_key, bind_addr })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

fn parse_algorithm(raw: &str) -> Result<jsonwebtoken::Algorithm, ConfigError> {
    use jsonwebtoken::Algorithm::*;
    match raw {
        "HS256" => Ok(HS256),
        "HS384" => Ok(HS384),
        "HS512" => Ok(HS512),
        "RS256" => Ok(RS256),
        "RS384" => Ok(RS384),
        "RS512" => Ok(RS512),
        "ES256" => Ok(ES256),
        "ES384" => Ok(ES384),
        other => Err(ConfigError::UnsupportedJwtAlgo(other.to_string())),
    }
}
