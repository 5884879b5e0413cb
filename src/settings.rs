// src/settings.rs
//! Runtime configuration.
//!
//! Read from the process environment (a `.env` file is loaded first by
//! `main`):
//! - `CERAMIC_URL`: remote document service (default `http://localhost:7007`)
//! - `INDEXER_URL`: EAS attestation indexer (default `https://easscan.org`)
//! - `BIND_ADDRESS`: HTTP listen address (default `127.0.0.1:3000`)
//! - `PRIVATE_KEY`: optional secp256k1 key for the wallet session
//! - `SECRET_KEY`: hex Ed25519 seed of the issuing session, re-read on every
//!   request (see [`secret_key`])

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

pub const DEFAULT_CERAMIC_URL: &str = "http://localhost:7007";
pub const DEFAULT_INDEXER_URL: &str = "https://easscan.org";
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:3000";

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Settings {
    pub ceramic_url: String,
    pub indexer_url: String,
    pub bind_address: String,
    #[serde(default)]
    pub private_key: Option<String>,
}

impl Settings {
    /// Loads settings from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_environment(Environment::default())
    }

    fn from_environment(environment: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("ceramic_url", DEFAULT_CERAMIC_URL)?
            .set_default("indexer_url", DEFAULT_INDEXER_URL)?
            .set_default("bind_address", DEFAULT_BIND_ADDRESS)?
            .add_source(environment)
            .build()?
            .try_deserialize()
    }
}

/// The issuing seed, read fresh so it can be rotated without a restart.
pub fn secret_key() -> Option<String> {
    std::env::var("SECRET_KEY")
        .ok()
        .filter(|key| !key.trim().is_empty())
}
