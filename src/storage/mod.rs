//! Credential storage
//!
//! This module owns the session credentials (an access/refresh bearer pair).
//! Credentials are kept in memory behind a [`TokenStore`] and written through
//! to a pluggable [`TokenBackend`]:
//! - [`FileTokenBackend`] - JSON document on disk, survives restarts
//! - [`MemoryTokenBackend`] - process-local, used by tests and throwaway sessions
//!
//! Consumers that care about "is somebody signed in" subscribe to the store
//! instead of polling it. Changes made by other processes sharing the same
//! backend are picked up by [`TokenStore::sync`].

mod file;
mod memory;

pub use file::FileTokenBackend;
pub use memory::MemoryTokenBackend;

use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Access/refresh token pair
///
/// Either token may be absent. The pair is considered signed in only when
/// an access token is present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
}

impl Credentials {
    /// Build a full pair as returned by a successful login
    pub fn pair(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: Some(access.into()),
            refresh: Some(refresh.into()),
        }
    }

    /// Whether an access token is present
    pub fn is_signed_in(&self) -> bool {
        self.access.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.access.is_none() && self.refresh.is_none()
    }
}

/// Error type for credential persistence
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to access session file '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Session file '{path}' is corrupt: {message}")]
    Corrupt { path: String, message: String },
    #[error("Failed to encode session: {0}")]
    Encode(String),
}

/// Persistence backend for credentials
///
/// Backends are dumb key-value sinks; all policy lives in [`TokenStore`].
pub trait TokenBackend: Send + Sync {
    /// Load the persisted credentials (empty if nothing was stored yet)
    fn load(&self) -> Result<Credentials, StorageError>;

    /// Persist the given credentials, replacing whatever was stored
    fn save(&self, credentials: &Credentials) -> Result<(), StorageError>;
}

/// Process-wide credential store
///
/// Reads are served from memory. Every write goes to the backend first and
/// is only applied in memory once persisted, so a failed write never leaves
/// the two out of step.
pub struct TokenStore {
    backend: Box<dyn TokenBackend>,
    current: RwLock<Credentials>,
    signed_in: watch::Sender<bool>,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("signed_in", &*self.signed_in.borrow())
            .finish()
    }
}

impl TokenStore {
    /// Open a store over the given backend, loading whatever it holds
    pub fn open(backend: impl TokenBackend + 'static) -> Result<Self, StorageError> {
        let credentials = backend.load()?;
        let (signed_in, _) = watch::channel(credentials.is_signed_in());
        Ok(Self {
            backend: Box::new(backend),
            current: RwLock::new(credentials),
            signed_in,
        })
    }

    /// Empty in-memory store
    pub fn in_memory() -> Self {
        Self {
            backend: Box::new(MemoryTokenBackend::new()),
            current: RwLock::new(Credentials::default()),
            signed_in: watch::channel(false).0,
        }
    }

    /// In-memory store pre-populated with credentials
    pub fn in_memory_with(credentials: Credentials) -> Self {
        let signed_in = credentials.is_signed_in();
        Self {
            backend: Box::new(MemoryTokenBackend::with(credentials.clone())),
            current: RwLock::new(credentials),
            signed_in: watch::channel(signed_in).0,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Credentials> {
        self.current.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Credentials> {
        self.current.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn access(&self) -> Option<String> {
        self.read().access.clone()
    }

    pub fn refresh(&self) -> Option<String> {
        self.read().refresh.clone()
    }

    /// Snapshot of both tokens
    pub fn credentials(&self) -> Credentials {
        self.read().clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.read().is_signed_in()
    }

    /// Store a freshly issued pair (login)
    pub fn store_pair(&self, access: &str, refresh: &str) -> Result<(), StorageError> {
        self.replace(Credentials::pair(access, refresh))
    }

    /// Store whatever the backend issued, even without a refresh token
    pub fn store(&self, credentials: Credentials) -> Result<(), StorageError> {
        self.replace(credentials)
    }

    /// Replace only the access token (refresh)
    pub fn set_access(&self, access: &str) -> Result<(), StorageError> {
        let mut next = self.credentials();
        next.access = Some(access.to_string());
        self.replace(next)
    }

    /// Forget both tokens (logout or dead session)
    pub fn clear(&self) -> Result<(), StorageError> {
        self.replace(Credentials::default())
    }

    fn replace(&self, next: Credentials) -> Result<(), StorageError> {
        self.backend.save(&next)?;
        let signed_in = next.is_signed_in();
        *self.write() = next;
        self.publish(signed_in);
        Ok(())
    }

    fn publish(&self, next: bool) {
        self.signed_in.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    /// Subscribe to the signed-in flag
    ///
    /// Receivers are notified only when the flag flips, not on every write.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.signed_in.subscribe()
    }

    /// Re-read the backend and adopt whatever another process stored there
    ///
    /// Returns `true` when the in-memory credentials changed.
    pub fn sync(&self) -> Result<bool, StorageError> {
        let loaded = self.backend.load()?;
        let changed = {
            let mut current = self.write();
            if *current == loaded {
                false
            } else {
                *current = loaded.clone();
                true
            }
        };
        if changed {
            tracing::debug!("Session changed externally (signed in: {})", loaded.is_signed_in());
            self.publish(loaded.is_signed_in());
        }
        Ok(changed)
    }

    /// Poll the backend for external changes on a background task
    pub fn spawn_sync(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                if let Err(e) = store.sync() {
                    tracing::warn!("Failed to sync session: {}", e);
                }
            }
        })
    }
}
