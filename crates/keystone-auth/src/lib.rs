//! Keystone Auth
//!
//! Client-side session state:
//! - `login` exchanges credentials for a token, then fetches the profile
//! - Token and profile are committed together, and mirrored to the store
//! - `logout` clears memory and store without a network call
//! - `loading` is raised for exactly the duration of an operation

mod api;
mod error;
mod manager;
mod user;

pub use api::{AuthBackend, Endpoints, HttpBackend};
pub use error::AuthError;
pub use manager::{
    AuthState, SessionManager, StoredSession, AUTH_TOKEN_KEY, AUTH_USER_KEY, TOKEN_TYPE_KEY,
};
pub use user::{ActionResult, LoginCredentials, TokenResponse, User};

pub type Result<T> = std::result::Result<T, AuthError>;
