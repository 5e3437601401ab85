//! Shared authentication session.
//!
//! One `Session` exists per locator and is handed out by reference. The auth
//! client holds the full `Session` and is the only writer; storage and
//! functions clients receive a `SessionReader`, which exposes reads only.

pub mod store;

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

pub use store::{CredentialStore, MemoryCredentialStore};

pub type SharedSession = Arc<Session>;

/// Token state of an authenticated session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub access_token_expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user: Option<serde_json::Value>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl SessionData {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            access_token_expires_at: None,
            user: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    pub fn expiring_at(mut self, at: DateTime<Utc>) -> Self {
        self.access_token_expires_at = Some(at);
        self
    }

    /// Tokens without a known expiry are treated as live.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.access_token_expires_at.map(|at| at <= now).unwrap_or(false)
    }

    /// True when the access token expires within `margin` of `now`.
    pub fn expires_within(&self, now: DateTime<Utc>, margin: ChronoDuration) -> bool {
        self.access_token_expires_at.map(|at| at - now <= margin).unwrap_or(false)
    }
}

pub struct Session {
    current: ArcSwapOption<SessionData>,
    store: Arc<dyn CredentialStore>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.current.load().is_some())
            .finish()
    }
}

impl Session {
    /// Empty, unauthenticated session backed by `store`. Does not read the store.
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { current: ArcSwapOption::empty(), store }
    }

    /// Session backed by a store that keeps nothing beyond process lifetime.
    pub fn volatile() -> Self {
        Self::new(Arc::new(MemoryCredentialStore::default()))
    }

    pub fn current(&self) -> Option<Arc<SessionData>> {
        self.current.load_full()
    }

    pub fn access_token(&self) -> Option<String> {
        self.current.load().as_ref().map(|s| s.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.current.load().as_ref().and_then(|s| s.refresh_token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.current
            .load()
            .as_ref()
            .map(|s| !s.is_expired(Utc::now()))
            .unwrap_or(false)
    }

    /// Persist `data` and make it visible to every holder of this session.
    pub fn set(&self, data: SessionData) -> Result<Arc<SessionData>, ServiceError> {
        self.store.save(&data)?;
        let data = Arc::new(data);
        self.current.store(Some(Arc::clone(&data)));
        Ok(data)
    }

    /// Forget the in-memory tokens and the persisted copy.
    pub fn clear(&self) -> Result<(), ServiceError> {
        self.store.clear()?;
        self.current.store(None);
        Ok(())
    }

    /// Load persisted data into memory; returns whether anything was found.
    pub fn restore(&self) -> Result<bool, ServiceError> {
        match self.store.load()? {
            Some(data) => {
                self.current.store(Some(Arc::new(data)));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn reader(self: &Arc<Self>) -> SessionReader {
        SessionReader { inner: Arc::clone(self) }
    }
}

/// Read-only view of a shared `Session`.
#[derive(Debug, Clone)]
pub struct SessionReader {
    inner: SharedSession,
}

impl SessionReader {
    pub fn current(&self) -> Option<Arc<SessionData>> {
        self.inner.current()
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner.access_token()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.is_authenticated()
    }

    /// `Authorization` header value for the current token, if any.
    pub fn bearer(&self) -> Option<String> {
        self.inner.access_token().map(|t| format!("Bearer {t}"))
    }

    /// Whether this view observes exactly `session`.
    pub fn is_view_of(&self, session: &SharedSession) -> bool {
        Arc::ptr_eq(&self.inner, session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_empty_and_does_not_read_store() -> Result<(), ServiceError> {
        let store = Arc::new(MemoryCredentialStore::with_data(SessionData::new("persisted")));
        let session = Session::new(store.clone());
        assert!(session.current().is_none());
        assert!(!session.is_authenticated());
        assert!(session.restore()?);
        assert_eq!(session.access_token().as_deref(), Some("persisted"));
        Ok(())
    }

    #[test]
    fn reader_observes_writes_through_shared_session() -> Result<(), ServiceError> {
        let session = Arc::new(Session::volatile());
        let reader = session.reader();
        assert!(reader.bearer().is_none());

        session.set(SessionData::new("t1").with_refresh_token("r1"))?;
        assert_eq!(reader.bearer().as_deref(), Some("Bearer t1"));

        session.set(SessionData::new("t2"))?;
        assert_eq!(reader.access_token().as_deref(), Some("t2"));
        assert!(reader.is_view_of(&session));
        Ok(())
    }

    #[test]
    fn set_and_clear_go_through_store() -> Result<(), ServiceError> {
        let store = Arc::new(MemoryCredentialStore::default());
        let session = Session::new(store.clone());
        session.set(SessionData::new("abc"))?;
        assert_eq!(store.load()?.map(|d| d.access_token), Some("abc".to_string()));
        session.clear()?;
        assert!(store.load()?.is_none());
        assert!(session.current().is_none());
        Ok(())
    }

    #[test]
    fn expired_token_is_not_authenticated() -> Result<(), ServiceError> {
        let session = Session::volatile();
        session.set(SessionData::new("old").expiring_at(Utc::now() - ChronoDuration::seconds(5)))?;
        assert!(!session.is_authenticated());
        Ok(())
    }

    #[test]
    fn expiry_margin() {
        let now = Utc::now();
        let data = SessionData::new("t").expiring_at(now + ChronoDuration::seconds(60));
        assert!(data.expires_within(now, ChronoDuration::seconds(120)));
        assert!(!data.expires_within(now, ChronoDuration::seconds(30)));
        assert!(!SessionData::new("t").expires_within(now, ChronoDuration::seconds(30)));
    }
}
