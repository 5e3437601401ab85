use configs::DEFAULT_PLATFORM_DOMAIN;

use crate::errors::ConfigurationError;

/// Platform-convention addressing. An empty `region` denotes a local or
/// self-hosted deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubdomainAddress {
    pub subdomain: String,
    pub region: String,
    pub platform_domain: String,
}

impl SubdomainAddress {
    pub fn new(subdomain: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            subdomain: subdomain.into(),
            region: region.into(),
            platform_domain: DEFAULT_PLATFORM_DOMAIN.to_string(),
        }
    }

    pub fn with_platform_domain(mut self, domain: impl Into<String>) -> Self {
        self.platform_domain = domain.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceUrls {
    pub auth_url: String,
    pub storage_url: String,
    pub functions_url: String,
    pub graphql_url: String,
}

impl ServiceUrls {
    pub fn new(
        auth_url: impl Into<String>,
        storage_url: impl Into<String>,
        functions_url: impl Into<String>,
        graphql_url: impl Into<String>,
    ) -> Self {
        Self {
            auth_url: auth_url.into(),
            storage_url: storage_url.into(),
            functions_url: functions_url.into(),
            graphql_url: graphql_url.into(),
        }
    }
}

/// How service URLs are determined. Exactly one variant per locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressingStrategy {
    BySubdomain(SubdomainAddress),
    ByExplicitUrls(ServiceUrls),
}

impl AddressingStrategy {
    pub fn from_subdomain(address: SubdomainAddress) -> Result<Self, ConfigurationError> {
        if address.subdomain.trim().is_empty() {
            return Err(ConfigurationError::EmptySubdomain);
        }
        Ok(Self::BySubdomain(address))
    }

    pub fn from_service_urls(urls: ServiceUrls) -> Self {
        Self::ByExplicitUrls(urls)
    }

    /// Resolve the two-optionals input shape; exactly one must be present.
    pub fn try_from_parts(
        subdomain: Option<SubdomainAddress>,
        service_urls: Option<ServiceUrls>,
    ) -> Result<Self, ConfigurationError> {
        match (subdomain, service_urls) {
            (Some(_), Some(_)) => Err(ConfigurationError::AmbiguousAddressing),
            (None, None) => Err(ConfigurationError::MissingAddressing),
            (Some(address), None) => Self::from_subdomain(address),
            (None, Some(urls)) => Ok(Self::from_service_urls(urls)),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AddressingStrategy::BySubdomain(_) => "subdomain",
            AddressingStrategy::ByExplicitUrls(_) => "service_urls",
        }
    }
}
