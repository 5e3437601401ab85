//! Endpoint resolution: strategy + logical service name to base URL.
//!
//! Pure and deterministic; safe to call any number of times.

use common::types::ServiceKind;

use crate::addressing::AddressingStrategy;

pub const API_VERSION: &str = "v1";

pub fn resolve_endpoint(strategy: &AddressingStrategy, service: ServiceKind) -> String {
    match strategy {
        AddressingStrategy::BySubdomain(addr) => {
            if addr.region.is_empty() {
                format!("https://{}.{}.{}/{API_VERSION}", addr.subdomain, service, addr.platform_domain)
            } else {
                format!(
                    "https://{}.{}.{}.{}/{API_VERSION}",
                    addr.subdomain, service, addr.region, addr.platform_domain
                )
            }
        }
        AddressingStrategy::ByExplicitUrls(urls) => match service {
            ServiceKind::Auth => urls.auth_url.clone(),
            ServiceKind::Storage => urls.storage_url.clone(),
            ServiceKind::Functions => urls.functions_url.clone(),
            ServiceKind::Graphql => urls.graphql_url.clone(),
        },
    }
}

impl AddressingStrategy {
    pub fn endpoint(&self, service: ServiceKind) -> String {
        resolve_endpoint(self, service)
    }
}
