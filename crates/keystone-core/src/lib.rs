//! Keystone Core
//!
//! Configuration, logging and the `Keystone` container that wires the
//! SQLite store and HTTP backend into a session manager.

mod config;
mod error;
mod keystone;

pub use config::{Config, API_URL_VAR, DATA_DIR_VAR, PROFILE_URL_VAR};
pub use error::CoreError;
pub use keystone::Keystone;

// Re-export core components
pub use keystone_auth::{
    ActionResult, AuthBackend, AuthError, AuthState, Endpoints, HttpBackend, LoginCredentials,
    SessionManager, StoredSession, TokenResponse, User,
};
pub use keystone_storage::{Database, KeyValueStore, StorageError};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
