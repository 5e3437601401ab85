use std::sync::Arc;
use std::time::Duration;

use common::diagnostics::DiagnosticsSink;
use configs::ClientConfig;
use services::{CredentialStore, SharedTransport, TransportConfig};

use crate::addressing::{ServiceUrls, SubdomainAddress};

/// Per-locator configuration besides addressing.
#[derive(Clone, Default)]
pub struct LocatorOptions {
    /// Session persistence; a volatile in-memory store when absent.
    pub credential_store: Option<Arc<dyn CredentialStore>>,
    pub refresh_interval: Option<Duration>,
    /// Caller-owned transport. Used as-is and never closed by the locator.
    pub transport_override: Option<SharedTransport>,
    /// Settings for a locator-created transport.
    pub transport_config: TransportConfig,
    /// Lifecycle event sink; no-op when absent.
    pub diagnostics: Option<Arc<dyn DiagnosticsSink>>,
}

impl std::fmt::Debug for LocatorOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocatorOptions")
            .field("credential_store", &self.credential_store.is_some())
            .field("refresh_interval", &self.refresh_interval)
            .field("transport_override", &self.transport_override.as_ref().map(|t| t.id()))
            .field("transport_config", &self.transport_config)
            .field("diagnostics", &self.diagnostics.is_some())
            .finish()
    }
}

impl LocatorOptions {
    pub fn with_credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credential_store = Some(store);
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = Some(interval);
        self
    }

    pub fn with_transport(mut self, transport: SharedTransport) -> Self {
        self.transport_override = Some(transport);
        self
    }

    pub fn with_transport_config(mut self, config: TransportConfig) -> Self {
        self.transport_config = config;
        self
    }

    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = Some(sink);
        self
    }
}

/// Untyped construction input: at most one of `subdomain`/`service_urls`
/// may be set, which `ServiceLocator::create` enforces.
#[derive(Debug, Clone, Default)]
pub struct LocatorConfig {
    pub subdomain: Option<SubdomainAddress>,
    pub service_urls: Option<ServiceUrls>,
    pub options: LocatorOptions,
}

impl LocatorConfig {
    pub fn from_client_config(cfg: &ClientConfig) -> Self {
        let subdomain = cfg.addressing.as_ref().map(|a| {
            SubdomainAddress::new(a.subdomain.clone(), a.region.clone())
                .with_platform_domain(a.platform_domain.clone())
        });
        let service_urls = cfg.service_urls.as_ref().map(|u| {
            ServiceUrls::new(
                u.auth_url.clone(),
                u.storage_url.clone(),
                u.functions_url.clone(),
                u.graphql_url.clone(),
            )
        });
        let transport_config = TransportConfig {
            connect_timeout: Duration::from_secs(cfg.transport.connect_timeout_secs),
            request_timeout: Duration::from_secs(cfg.transport.request_timeout_secs),
            user_agent: cfg.transport.user_agent.clone(),
        };
        let options = LocatorOptions {
            refresh_interval: cfg.auth.refresh_interval_secs.map(Duration::from_secs),
            transport_config,
            ..LocatorOptions::default()
        };
        Self { subdomain, service_urls, options }
    }
}
