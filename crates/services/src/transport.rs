//! Shared HTTP transport.
//!
//! A single `reqwest::Client` (connection pool, cookie jar) reused by every
//! sub-client. Only the owner that created it may close it. `close()` drops
//! the client, and with it every pooled connection, even while sub-clients
//! still hold the `Arc<Transport>`; later requests fail fast with
//! `ServiceError::TransportClosed`.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use reqwest::{Client, Method, Request, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use crate::errors::ServiceError;

pub type SharedTransport = Arc<Transport>;

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
            user_agent: None,
        }
    }
}

pub struct Transport {
    id: Uuid,
    client: ArcSwapOption<Client>,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Transport {
    pub fn new(config: &TransportConfig) -> Result<Self, ServiceError> {
        let user_agent = config
            .user_agent
            .clone()
            .unwrap_or_else(|| format!("nexus-client/{}", env!("CARGO_PKG_VERSION")));
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(user_agent)
            .cookie_store(true)
            .build()
            .map_err(|e| ServiceError::TransportBuild(e.to_string()))?;
        Ok(Self { id: Uuid::new_v4(), client: ArcSwapOption::from_pointee(client) })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.client.load().is_none()
    }

    /// Drop the client and its connection pool. Returns `true` only for the
    /// call that closed it. Requests already in flight keep their own handle
    /// and finish normally.
    pub fn close(&self) -> bool {
        let released = self.client.swap(None);
        if released.is_some() {
            debug!(transport_id = %self.id, "transport closed");
        }
        released.is_some()
    }

    pub fn request(&self, method: Method, url: &str) -> Result<RequestBuilder, ServiceError> {
        Ok(self.client()?.request(method, url))
    }

    pub async fn execute(&self, request: Request) -> Result<Response, ServiceError> {
        let client = self.client()?;
        Ok(client.execute(request).await?)
    }

    /// Map non-2xx responses to `ServiceError::Server`.
    pub async fn check_response(response: Response) -> Result<Response, ServiceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(ServiceError::Server { status: status.as_u16(), message })
    }

    pub async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, ServiceError> {
        let response = Self::check_response(response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn client(&self) -> Result<Arc<Client>, ServiceError> {
        self.client.load_full().ok_or(ServiceError::TransportClosed)
    }
}

/// Parse and check a service base URL.
pub fn parse_endpoint(url: &str) -> Result<Url, ServiceError> {
    let parsed = Url::parse(url).map_err(|e| ServiceError::invalid_endpoint(url, e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(ServiceError::invalid_endpoint(url, format!("unsupported scheme `{other}`"))),
    }
}

/// Join a relative path onto a base endpoint without doubling slashes.
pub fn join_path(endpoint: &str, path: &str) -> String {
    format!("{}/{}", endpoint.trim_end_matches('/'), path.trim_start_matches('/'))
}
