//! Session Manager
//!
//! Holds the authentication state and runs `login` / `logout` against an
//! `AuthBackend`, mirroring the committed session into a `KeyValueStore`.

use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::Mutex;

use keystone_storage::KeyValueStore;

use crate::api::AuthBackend;
use crate::error::AuthError;
use crate::user::{ActionResult, LoginCredentials, TokenResponse, User};
use crate::Result;

pub const AUTH_TOKEN_KEY: &str = "auth_token";
pub const TOKEN_TYPE_KEY: &str = "token_type";
pub const AUTH_USER_KEY: &str = "auth_user";

const SESSION_KEYS: [&str; 3] = [AUTH_TOKEN_KEY, TOKEN_TYPE_KEY, AUTH_USER_KEY];

/// Point-in-time copy of the manager's state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<User>,
    pub token: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.token.is_some()
    }
}

/// What the persistent store currently holds for the session keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredSession {
    pub token: Option<String>,
    pub token_type: Option<String>,
    pub user: Option<User>,
}

impl StoredSession {
    pub fn is_empty(&self) -> bool {
        self.token.is_none() && self.token_type.is_none() && self.user.is_none()
    }
}

/// Raises `loading` on creation and lowers it on drop, whatever the exit path.
struct LoadingGuard {
    state: Arc<RwLock<AuthState>>,
}

impl LoadingGuard {
    fn raise(state: &Arc<RwLock<AuthState>>) -> Self {
        state.write().loading = true;
        Self {
            state: Arc::clone(state),
        }
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.state.write().loading = false;
    }
}

pub struct SessionManager {
    state: Arc<RwLock<AuthState>>,
    backend: Arc<dyn AuthBackend>,
    store: Arc<dyn KeyValueStore>,
    /// Serializes login/logout so their writes never interleave
    operation: Arc<Mutex<()>>,
}

impl SessionManager {
    pub fn new(backend: Arc<dyn AuthBackend>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            state: Arc::new(RwLock::new(AuthState::default())),
            backend,
            store,
            operation: Arc::new(Mutex::new(())),
        }
    }

    /// Log in with `credentials`.
    ///
    /// Token and user are committed together only once both requests have
    /// succeeded; a failure leaves any previous session in place. Failures
    /// are reported in the returned result and mirrored into `error`.
    pub async fn login(&self, credentials: &LoginCredentials) -> ActionResult {
        let _serial = self.operation.lock().await;
        let _loading = LoadingGuard::raise(&self.state);
        self.state.write().error = None;

        match self.authenticate(credentials).await {
            Ok((token, user)) => {
                {
                    let mut state = self.state.write();
                    state.token = Some(token.access_token.clone());
                    state.user = Some(user.clone());
                }

                self.persist(&token, &user);

                tracing::info!(
                    username = %credentials.username,
                    user_id = %user.id,
                    "Logged in"
                );

                ActionResult::ok()
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(
                    username = %credentials.username,
                    error = %message,
                    "Login failed"
                );

                self.state.write().error = Some(message.clone());
                ActionResult::failed(message)
            }
        }
    }

    async fn authenticate(&self, credentials: &LoginCredentials) -> Result<(TokenResponse, User)> {
        let token = self.backend.request_token(credentials).await?;
        let user = self.backend.fetch_current_user(&token.access_token).await?;
        Ok((token, user))
    }

    /// Mirror the session into the store. Failures only degrade the
    /// session to memory-only.
    fn persist(&self, token: &TokenResponse, user: &User) {
        let write = || -> Result<()> {
            let user_json = serde_json::to_string(user)?;
            self.store.set(AUTH_TOKEN_KEY, &token.access_token)?;
            self.store.set(TOKEN_TYPE_KEY, &token.token_type)?;
            self.store.set(AUTH_USER_KEY, &user_json)?;
            Ok(())
        };

        if let Err(e) = write() {
            tracing::warn!("Failed to store auth data: {}", e);
            // A partial write would pair this token with an older user
            self.clear_store();
        }
    }

    /// Remove every session key, attempting all of them. Returns the first
    /// failure message.
    fn clear_store(&self) -> Option<String> {
        let mut failure: Option<String> = None;
        for key in SESSION_KEYS {
            if let Err(e) = self.store.remove(key) {
                tracing::warn!(key = %key, "Failed to remove auth data: {}", e);
                failure.get_or_insert_with(|| AuthError::from(e).to_string());
            }
        }
        failure
    }

    /// Log out: clear the in-memory session and remove every session key
    /// from the store. No request is sent to the server.
    pub async fn logout(&self) -> ActionResult {
        let _serial = self.operation.lock().await;
        let _loading = LoadingGuard::raise(&self.state);

        {
            let mut state = self.state.write();
            state.user = None;
            state.token = None;
            state.error = None;
        }

        match self.clear_store() {
            None => {
                tracing::info!("Logged out");
                ActionResult::ok()
            }
            Some(message) => {
                self.state.write().error = Some(message.clone());
                ActionResult::failed(message)
            }
        }
    }

    pub fn snapshot(&self) -> AuthState {
        self.state.read().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.state.read().user.clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.user()
    }

    pub fn token(&self) -> Option<String> {
        self.state.read().token.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.state.read().error.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().loading
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().is_authenticated()
    }

    /// Read the session record from the store without touching memory.
    pub fn stored_session(&self) -> Result<StoredSession> {
        let user = match self.store.get(AUTH_USER_KEY)? {
            Some(json) => Some(serde_json::from_str(&json)?),
            None => None,
        };

        Ok(StoredSession {
            token: self.store.get(AUTH_TOKEN_KEY)?,
            token_type: self.store.get(TOKEN_TYPE_KEY)?,
            user,
        })
    }
}

impl Clone for SessionManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            backend: Arc::clone(&self.backend),
            store: Arc::clone(&self.store),
            operation: Arc::clone(&self.operation),
        }
    }
}
