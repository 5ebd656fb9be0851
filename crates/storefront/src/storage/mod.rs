//! Key-value persistence for session and cart state.
//!
//! Stands in for browser local storage: three string values under fixed keys
//! (see [`keys`]). Writes are synchronous and complete before the mutating
//! call returns, so a reload immediately afterwards observes the new state.
//!
//! There is no cross-process coordination. Two clients sharing one state
//! directory may overwrite each other's cart or session.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::path::PathBuf;

use thiserror::Error;

/// Storage keys.
pub mod keys {
    /// Key for the raw bearer token.
    pub const AUTH_TOKEN: &str = "auth_token";

    /// Key for the JSON-encoded identity derived from the token.
    pub const USER_INFO: &str = "user_info";

    /// Key for the JSON-encoded cart ledger.
    pub const CART: &str = "cart";
}

/// Errors raised while writing persisted state.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("storage I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// State could not be serialized.
    #[error("failed to serialize {key}: {source}")]
    Serialize {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// A synchronous string key-value store.
///
/// Reads never fail: unreadable state is reported as absent.
pub trait KeyValueStore: Send + Sync {
    /// Get the value stored under `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value could not be made durable.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal could not be made durable.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
