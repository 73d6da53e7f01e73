//! Client configuration
//!
//! Read from the environment:
//! - `KEYSTONE_API_URL`: base URL of the token endpoint
//! - `KEYSTONE_PROFILE_URL`: base URL of the profile endpoint, defaults to the API URL
//! - `KEYSTONE_DATA_DIR`: directory holding `keystone.db`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

use crate::error::CoreError;
use crate::Result;

pub const API_URL_VAR: &str = "KEYSTONE_API_URL";
pub const PROFILE_URL_VAR: &str = "KEYSTONE_PROFILE_URL";
pub const DATA_DIR_VAR: &str = "KEYSTONE_DATA_DIR";

const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file
    pub database_path: PathBuf,
    /// Base URL for `/api/auth/login/access-token`
    pub api_url: Url,
    /// Base URL for `/api/users/me`
    pub profile_url: Url,
}

impl Config {
    pub fn new(data_dir: PathBuf, api_url: Url) -> Self {
        Self {
            database_path: data_dir.join("keystone.db"),
            profile_url: api_url.clone(),
            api_url,
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_url = match var(API_URL_VAR) {
            Some(raw) => parse_url(API_URL_VAR, &raw)?,
            None => parse_url(API_URL_VAR, DEFAULT_API_URL)?,
        };

        let data_dir = var(DATA_DIR_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(Self::data_dir);

        let mut config = Self::new(data_dir, api_url);
        if let Some(raw) = var(PROFILE_URL_VAR) {
            config.profile_url = parse_url(PROFILE_URL_VAR, &raw)?;
        }

        Ok(config)
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("keystone"))
            .unwrap_or_else(|| PathBuf::from(".keystone"))
    }
}

fn parse_url(var: &str, raw: &str) -> Result<Url> {
    Url::parse(raw.trim()).map_err(|e| CoreError::Config(format!("{var}={raw}: {e}")))
}
