use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::diagnostics::{DiagnosticsSink, LocatorEvent, NoopDiagnostics};
use common::types::ServiceKind;
use services::{
    AuthClient, FunctionsClient, MemoryCredentialStore, ServiceError, Session, SharedSession,
    SharedTransport, StorageClient, Transport, TransportConfig,
};

use crate::addressing::AddressingStrategy;
use crate::errors::{ConfigurationError, ServiceConstructionError};
use crate::handle::ServiceHandle;
use crate::options::{LocatorConfig, LocatorOptions};
use crate::resolver::resolve_endpoint;

/// Shared-session coordinator for the auth, storage and functions sub-clients.
///
/// Nothing is allocated eagerly: the transport and each sub-client are built
/// on first access and memoized for the lifetime of the locator. All
/// sub-clients share the same `Session` and `Transport`. Call [`close`] to
/// release them; dropping the locator closes it as well.
///
/// ```
/// use client::{AddressingStrategy, LocatorOptions, ServiceLocator, SubdomainAddress};
///
/// let addressing = AddressingStrategy::from_subdomain(SubdomainAddress::new("myapp", "eu-west-1")).unwrap();
/// let locator = ServiceLocator::new(addressing, LocatorOptions::default());
/// assert_eq!(locator.graphql_endpoint_url(), "https://myapp.graphql.eu-west-1.nhost.run/v1");
/// let auth = locator.auth().unwrap();
/// assert!(std::sync::Arc::ptr_eq(&auth, &locator.auth().unwrap()));
/// locator.close();
/// ```
///
/// [`close`]: ServiceLocator::close
pub struct ServiceLocator {
    addressing: AddressingStrategy,
    session: SharedSession,
    refresh_interval: Option<Duration>,
    transport_config: TransportConfig,
    transport_override: Option<SharedTransport>,
    transport: ServiceHandle<Transport>,
    auth: ServiceHandle<AuthClient>,
    storage: ServiceHandle<StorageClient>,
    functions: ServiceHandle<FunctionsClient>,
    diagnostics: Arc<dyn DiagnosticsSink>,
    closed: AtomicBool,
}

impl std::fmt::Debug for ServiceLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceLocator")
            .field("addressing", &self.addressing)
            .field("transport", &self.transport)
            .field("auth", &self.auth)
            .field("storage", &self.storage)
            .field("functions", &self.functions)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl ServiceLocator {
    /// Validate addressing eagerly and build the locator.
    pub fn create(config: LocatorConfig) -> Result<Self, ConfigurationError> {
        let addressing = AddressingStrategy::try_from_parts(config.subdomain, config.service_urls)?;
        Ok(Self::new(addressing, config.options))
    }

    pub fn new(addressing: AddressingStrategy, options: LocatorOptions) -> Self {
        let store = options
            .credential_store
            .unwrap_or_else(|| Arc::new(MemoryCredentialStore::default()));
        let diagnostics = options.diagnostics.unwrap_or_else(|| Arc::new(NoopDiagnostics));
        diagnostics.record(&LocatorEvent::Created { strategy: addressing.kind() });
        Self {
            addressing,
            session: Arc::new(Session::new(store)),
            refresh_interval: options.refresh_interval,
            transport_config: options.transport_config,
            transport_override: options.transport_override,
            transport: ServiceHandle::new(),
            auth: ServiceHandle::new(),
            storage: ServiceHandle::new(),
            functions: ServiceHandle::new(),
            diagnostics,
            closed: AtomicBool::new(false),
        }
    }

    pub fn addressing(&self) -> &AddressingStrategy {
        &self.addressing
    }

    /// The shared session. The locator never mutates it.
    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    pub fn endpoint(&self, service: ServiceKind) -> String {
        resolve_endpoint(&self.addressing, service)
    }

    pub fn graphql_endpoint_url(&self) -> String {
        self.endpoint(ServiceKind::Graphql)
    }

    pub fn auth(&self) -> Result<Arc<AuthClient>, ServiceConstructionError> {
        let refresh_interval = self.refresh_interval;
        self.lazy(ServiceKind::Auth, &self.auth, |endpoint, transport| {
            AuthClient::new(endpoint, Arc::clone(&self.session), transport, refresh_interval)
        })
    }

    pub fn storage(&self) -> Result<Arc<StorageClient>, ServiceConstructionError> {
        self.lazy(ServiceKind::Storage, &self.storage, |endpoint, transport| {
            StorageClient::new(endpoint, self.session.reader(), transport)
        })
    }

    pub fn functions(&self) -> Result<Arc<FunctionsClient>, ServiceConstructionError> {
        self.lazy(ServiceKind::Functions, &self.functions, |endpoint, transport| {
            FunctionsClient::new(endpoint, self.session.reader(), transport)
        })
    }

    /// The shared transport: the caller-supplied one, or a locator-owned one
    /// created on first use.
    pub fn transport(&self) -> Result<SharedTransport, ServiceError> {
        if let Some(transport) = &self.transport_override {
            return Ok(Arc::clone(transport));
        }
        self.transport.get_or_try_init(|| {
            if self.is_closed() {
                return Err(ServiceError::TransportClosed);
            }
            let transport = Transport::new(&self.transport_config)?;
            self.diagnostics.record(&LocatorEvent::TransportCreated);
            Ok(transport)
        })
    }

    pub fn is_initialized(&self, service: ServiceKind) -> bool {
        match service {
            ServiceKind::Auth => self.auth.is_initialized(),
            ServiceKind::Storage => self.storage.is_initialized(),
            ServiceKind::Functions => self.functions.is_initialized(),
            ServiceKind::Graphql => false,
        }
    }

    /// Whether the locator created its own transport.
    pub fn owns_transport(&self) -> bool {
        self.transport.is_initialized()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Release every resource the locator caused to exist. Idempotent.
    ///
    /// Auth and storage are closed before the transport; handles that were
    /// never initialized are left alone. A caller-supplied transport stays
    /// open. The session and credential store are not touched.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(auth) = self.auth.settle() {
            if auth.close() {
                self.diagnostics.record(&LocatorEvent::ServiceClosed { service: ServiceKind::Auth });
            }
        }
        if let Some(storage) = self.storage.settle() {
            if storage.close() {
                self.diagnostics.record(&LocatorEvent::ServiceClosed { service: ServiceKind::Storage });
            }
        }
        if let Some(transport) = self.transport.settle() {
            if transport.close() {
                self.diagnostics.record(&LocatorEvent::TransportClosed);
            }
        }
        if self.transport_override.is_some() {
            self.diagnostics.record(&LocatorEvent::TransportRetained);
        }
        self.diagnostics.record(&LocatorEvent::Closed);
    }

    fn lazy<T, F>(
        &self,
        service: ServiceKind,
        handle: &ServiceHandle<T>,
        build: F,
    ) -> Result<Arc<T>, ServiceConstructionError>
    where
        F: FnOnce(&str, SharedTransport) -> Result<T, ServiceError>,
    {
        handle.get_or_try_init(|| {
            if self.is_closed() {
                return Err(ServiceConstructionError::LocatorClosed { service });
            }
            let endpoint = self.endpoint(service);
            match self.transport().and_then(|transport| build(&endpoint, transport)) {
                Ok(client) => {
                    self.diagnostics.record(&LocatorEvent::ServiceInitialized { service, endpoint });
                    Ok(client)
                }
                Err(source) => {
                    self.diagnostics.record(&LocatorEvent::ServiceInitFailed {
                        service,
                        error: source.to_string(),
                    });
                    Err(ServiceConstructionError::Failed { service, source })
                }
            }
        })
    }
}

impl Drop for ServiceLocator {
    fn drop(&mut self) {
        self.close();
    }
}
