use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use reqwest::Method;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::domain::{RefreshTokenInput, SessionPayload, SignInInput, SignInResponse};
use crate::errors::ServiceError;
use crate::session::{SessionData, SharedSession};
use crate::transport::{join_path, parse_endpoint, SharedTransport, Transport};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(300);

/// Auth sub-client. Reads and writes the shared session.
pub struct AuthClient {
    instance_id: Uuid,
    endpoint: String,
    session: SharedSession,
    transport: SharedTransport,
    refresh_interval: Duration,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl std::fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthClient")
            .field("instance_id", &self.instance_id)
            .field("endpoint", &self.endpoint)
            .field("refresh_interval", &self.refresh_interval)
            .finish()
    }
}

impl AuthClient {
    /// Wire the client; performs no I/O. A zero refresh interval is rejected.
    pub fn new(
        endpoint: &str,
        session: SharedSession,
        transport: SharedTransport,
        refresh_interval: Option<Duration>,
    ) -> Result<Self, ServiceError> {
        parse_endpoint(endpoint)?;
        let refresh_interval = refresh_interval.unwrap_or(DEFAULT_REFRESH_INTERVAL);
        if refresh_interval.is_zero() {
            return Err(ServiceError::InvalidRefreshInterval);
        }
        Ok(Self {
            instance_id: Uuid::new_v4(),
            endpoint: endpoint.to_string(),
            session,
            transport,
            refresh_interval,
            refresh_task: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }

    pub fn instance_id(&self) -> Uuid { self.instance_id }
    pub fn endpoint(&self) -> &str { &self.endpoint }
    pub fn refresh_interval(&self) -> Duration { self.refresh_interval }
    pub fn session(&self) -> &SharedSession { &self.session }
    pub fn transport(&self) -> &SharedTransport { &self.transport }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Load a previously persisted session from the credential store.
    pub fn restore_session(&self) -> Result<bool, ServiceError> {
        self.ensure_open()?;
        let restored = self.session.restore()?;
        debug!(instance_id = %self.instance_id, restored, "session restore");
        Ok(restored)
    }

    #[instrument(skip(self, password), fields(instance_id = %self.instance_id))]
    pub async fn sign_in_email_password(&self, email: &str, password: &str) -> Result<Arc<SessionData>, ServiceError> {
        self.ensure_open()?;
        let url = join_path(&self.endpoint, "signin/email-password");
        let body = SignInInput { email: email.to_string(), password: password.to_string() };
        let response = self.transport.request(Method::POST, &url)?.json(&body).send().await?;
        let resp: SignInResponse = Transport::handle_response(response).await?;
        let payload = resp.session.ok_or(ServiceError::Unauthenticated)?;
        let data = self.session.set(payload.into_session_data(Utc::now()))?;
        info!(instance_id = %self.instance_id, "signed_in");
        Ok(data)
    }

    #[instrument(skip(self), fields(instance_id = %self.instance_id))]
    pub async fn refresh_session(&self) -> Result<Arc<SessionData>, ServiceError> {
        self.ensure_open()?;
        refresh_with(&self.transport, &self.session, &self.endpoint).await
    }

    /// Revoke the refresh token server-side (best effort) and clear the session.
    #[instrument(skip(self), fields(instance_id = %self.instance_id))]
    pub async fn sign_out(&self) -> Result<(), ServiceError> {
        self.ensure_open()?;
        if let Some(refresh_token) = self.session.refresh_token() {
            let url = join_path(&self.endpoint, "signout");
            let sent = self
                .transport
                .request(Method::POST, &url)?
                .json(&RefreshTokenInput { refresh_token })
                .send()
                .await;
            match sent {
                Ok(response) => {
                    if let Err(e) = Transport::check_response(response).await {
                        warn!(error = %e, "sign-out rejected by server; clearing local session anyway");
                    }
                }
                Err(e) => warn!(error = %e, "sign-out request failed; clearing local session anyway"),
            }
        }
        self.session.clear()?;
        info!(instance_id = %self.instance_id, "signed_out");
        Ok(())
    }

    /// Spawn the refresh loop on the current tokio runtime. No-op if already running.
    pub fn start_auto_refresh(&self) -> Result<(), ServiceError> {
        self.ensure_open()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| ServiceError::Runtime(e.to_string()))?;
        let mut slot = self.refresh_task.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().map(|t| !t.is_finished()).unwrap_or(false) {
            return Ok(());
        }

        let transport = Arc::clone(&self.transport);
        let session = Arc::clone(&self.session);
        let endpoint = self.endpoint.clone();
        let interval = self.refresh_interval;
        let margin = ChronoDuration::from_std(interval).unwrap_or_else(|_| ChronoDuration::zero());
        let instance_id = self.instance_id;

        *slot = Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let due = session
                    .current()
                    .map(|s| s.refresh_token.is_some() && s.expires_within(Utc::now(), margin))
                    .unwrap_or(false);
                if !due {
                    continue;
                }
                match refresh_with(&transport, &session, &endpoint).await {
                    Ok(_) => debug!(%instance_id, "session refreshed"),
                    Err(ServiceError::TransportClosed) => break,
                    Err(e) => warn!(%instance_id, error = %e, code = e.code(), "session refresh failed"),
                }
            }
        }));
        debug!(%instance_id, ?interval, "auto refresh started");
        Ok(())
    }

    pub fn is_auto_refreshing(&self) -> bool {
        let slot = self.refresh_task.lock().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }

    /// Stop the refresh loop. Returns `true` only for the first call.
    /// The shared transport is left open.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        let task = self.refresh_task.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(task) = task {
            task.abort();
        }
        debug!(instance_id = %self.instance_id, "auth client closed");
        true
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<(), ServiceError> {
        if self.is_closed() {
            return Err(ServiceError::ClientClosed("auth"));
        }
        Ok(())
    }
}

async fn refresh_with(
    transport: &Transport,
    session: &crate::session::Session,
    endpoint: &str,
) -> Result<Arc<SessionData>, ServiceError> {
    let refresh_token = session.refresh_token().ok_or(ServiceError::Unauthenticated)?;
    let url = join_path(endpoint, "token");
    let response = transport
        .request(Method::POST, &url)?
        .json(&RefreshTokenInput { refresh_token })
        .send()
        .await?;
    let payload: SessionPayload = Transport::handle_response(response).await?;
    session.set(payload.into_session_data(Utc::now()))
}
