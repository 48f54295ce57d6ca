//! In-memory credential backend

use super::{Credentials, StorageError, TokenBackend};
use std::sync::{Arc, Mutex};

/// Backend that keeps credentials in process memory
///
/// Clones share the same slot, which lets tests play "another tab" against
/// a [`super::TokenStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenBackend {
    slot: Arc<Mutex<Credentials>>,
}

impl MemoryTokenBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(credentials: Credentials) -> Self {
        Self {
            slot: Arc::new(Mutex::new(credentials)),
        }
    }
}

impl TokenBackend for MemoryTokenBackend {
    fn load(&self) -> Result<Credentials, StorageError> {
        Ok(self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, credentials: &Credentials) -> Result<(), StorageError> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = credentials.clone();
        Ok(())
    }
}
