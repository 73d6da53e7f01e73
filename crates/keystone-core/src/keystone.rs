//! Application container
//!
//! Owns the store and wires the HTTP backend into a `SessionManager`.

use std::sync::Arc;

use keystone_auth::{Endpoints, HttpBackend, SessionManager};
use keystone_storage::Database;

use crate::config::Config;
use crate::Result;

pub struct Keystone {
    config: Config,
    db: Database,
    session_manager: SessionManager,
}

impl Keystone {
    pub fn new(config: Config) -> Result<Self> {
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&config.database_path)?;
        Self::with_database(config, db)
    }

    /// Build on an already opened database.
    pub fn with_database(config: Config, db: Database) -> Result<Self> {
        let endpoints = Endpoints::new(&config.api_url, &config.profile_url)?;

        tracing::info!(
            token_url = %endpoints.token_url,
            profile_url = %endpoints.profile_url,
            database = %config.database_path.display(),
            "Initialized session client"
        );

        let backend = Arc::new(HttpBackend::new(endpoints));
        let session_manager = SessionManager::new(backend, Arc::new(db.clone()));

        Ok(Self {
            config,
            db,
            session_manager,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn session_manager(&self) -> &SessionManager {
        &self.session_manager
    }
}
