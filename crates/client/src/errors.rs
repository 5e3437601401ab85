use common::types::ServiceKind;
use services::ServiceError;
use thiserror::Error;

/// Missing or ambiguous addressing; the locator is never created.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("no addressing configured: supply either a subdomain or explicit service URLs")]
    MissingAddressing,
    #[error("ambiguous addressing: supply either a subdomain or explicit service URLs, not both")]
    AmbiguousAddressing,
    #[error("subdomain must not be empty")]
    EmptySubdomain,
}

/// Lazy sub-client construction failed; the handle stays uninitialized.
#[derive(Debug, Error)]
pub enum ServiceConstructionError {
    #[error("failed to construct {service} client: {source}")]
    Failed {
        service: ServiceKind,
        #[source]
        source: ServiceError,
    },
    #[error("cannot construct {service} client: locator is closed")]
    LocatorClosed { service: ServiceKind },
}

impl ServiceConstructionError {
    pub fn service(&self) -> ServiceKind {
        match self {
            ServiceConstructionError::Failed { service, .. } => *service,
            ServiceConstructionError::LocatorClosed { service } => *service,
        }
    }
}

#[derive(Debug, Error)]
pub enum LocatorError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Construction(#[from] ServiceConstructionError),
}
