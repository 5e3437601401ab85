use std::sync::{Mutex, PoisonError};

use super::SessionData;
use crate::errors::ServiceError;

/// Persistence backend for session data across process restarts.
///
/// Only the `Session` calls into the store; the locator just hands it over.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<SessionData>, ServiceError>;
    fn save(&self, data: &SessionData) -> Result<(), ServiceError>;
    fn clear(&self) -> Result<(), ServiceError>;
}

/// Volatile store; data lives as long as the value does.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<SessionData>>,
}

impl MemoryCredentialStore {
    pub fn with_data(data: SessionData) -> Self {
        Self { slot: Mutex::new(Some(data)) }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<SessionData>, ServiceError> {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(slot.clone())
    }

    fn save(&self, data: &SessionData) -> Result<(), ServiceError> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(data.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), ServiceError> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
        Ok(())
    }
}
