//! Auth error types
//!
//! The `Display` output of each variant is the message surfaced to callers
//! through `ActionResult::error`.

use thiserror::Error;

/// Fallback message when the token endpoint gives no usable `detail`.
pub const LOGIN_FAILED: &str = "Login failed";

#[derive(Error, Debug)]
pub enum AuthError {
    /// Token endpoint answered with a non-success status.
    #[error("{0}")]
    Rejected(String),

    #[error("Failed to fetch user data")]
    ProfileFetch,

    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Storage error: {0}")]
    Storage(#[from] keystone_storage::StorageError),
}

impl AuthError {
    /// Build a rejection from the token endpoint's error body.
    ///
    /// Uses the string `detail` field when present, otherwise `"Login failed"`.
    pub fn from_rejection_body(body: &[u8]) -> Self {
        let detail = serde_json::from_slice::<serde_json::Value>(body)
            .ok()
            .and_then(|value| {
                value
                    .get("detail")
                    .and_then(|d| d.as_str())
                    .filter(|d| !d.is_empty())
                    .map(str::to_string)
            });

        AuthError::Rejected(detail.unwrap_or_else(|| LOGIN_FAILED.to_string()))
    }
}
