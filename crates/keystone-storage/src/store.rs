//! Key-value store contract

use crate::Result;

/// Minimal string key-value contract used to mirror session state.
///
/// Implementations must be usable from multiple threads; the session
/// manager shares one store behind an `Arc`.
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` when the key was never written or was removed.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or overwrite a value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}
