use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid endpoint {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },
    #[error("transport build failed: {0}")]
    TransportBuild(String),
    #[error("transport is closed")]
    TransportClosed,
    #[error("{0} client is closed")]
    ClientClosed(&'static str),
    #[error("no authenticated session")]
    Unauthenticated,
    #[error("refresh interval must be non-zero")]
    InvalidRefreshInterval,
    #[error("no async runtime available: {0}")]
    Runtime(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },
    #[error("credential store error: {0}")]
    CredentialStore(String),
}

impl ServiceError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            ServiceError::InvalidEndpoint { .. } => 1001,
            ServiceError::TransportBuild(_) => 1002,
            ServiceError::TransportClosed => 1003,
            ServiceError::ClientClosed(_) => 1004,
            ServiceError::Unauthenticated => 1005,
            ServiceError::Runtime(_) => 1006,
            ServiceError::InvalidRefreshInterval => 1007,
            ServiceError::Http(_) => 1101,
            ServiceError::Json(_) => 1102,
            ServiceError::Server { .. } => 1103,
            ServiceError::CredentialStore(_) => 1200,
        }
    }

    pub fn invalid_endpoint(url: &str, reason: impl Into<String>) -> Self {
        Self::InvalidEndpoint { url: url.to_string(), reason: reason.into() }
    }
}
