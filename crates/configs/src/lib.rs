use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

pub const DEFAULT_PLATFORM_DOMAIN: &str = "nhost.run";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ClientConfig {
    #[serde(default)]
    pub addressing: Option<AddressingConfig>,
    #[serde(default)]
    pub service_urls: Option<ServiceUrlsConfig>,
    #[serde(default)]
    pub transport: TransportSettings,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AddressingConfig {
    #[serde(default)]
    pub subdomain: String,
    #[serde(default)]
    pub region: String,
    #[serde(default = "default_platform_domain")]
    pub platform_domain: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServiceUrlsConfig {
    #[serde(default)]
    pub auth_url: String,
    #[serde(default)]
    pub storage_url: String,
    #[serde(default)]
    pub functions_url: String,
    #[serde(default)]
    pub graphql_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransportSettings {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthSettings {
    #[serde(default)]
    pub refresh_interval_secs: Option<u64>,
    #[serde(default)]
    pub auto_refresh: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub json: bool,
}

fn default_platform_domain() -> String { DEFAULT_PLATFORM_DOMAIN.to_string() }
fn default_connect_timeout() -> u64 { 5 }
fn default_request_timeout() -> u64 { 30 }

pub fn config_path() -> String {
    std::env::var("CONFIG_PATH").unwrap_or_else(|_| "nexus.toml".to_string())
}

pub fn load_default() -> Result<ClientConfig> {
    load_from_file(&config_path())
}

pub fn load_from_file(path: &str) -> Result<ClientConfig> {
    let content = std::fs::read_to_string(path)?;
    load_from_str(&content)
}

pub fn load_from_str(content: &str) -> Result<ClientConfig> {
    let cfg: ClientConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl ClientConfig {
    /// Load `CONFIG_PATH` if it exists, otherwise start from defaults; then normalize.
    pub fn load_and_validate() -> Result<Self> {
        let path = config_path();
        let mut cfg = if std::path::Path::new(&path).exists() {
            load_from_file(&path)?
        } else {
            ClientConfig::default()
        };
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Fill empty fields from the environment and reject malformed sections.
    ///
    /// Does not decide between `addressing` and `service_urls`; a config with
    /// both or neither is passed through so the locator reports it.
    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.normalize_from_env();
        if let Some(addr) = self.addressing.as_mut() {
            addr.normalize();
        }
        if let Some(urls) = &self.service_urls {
            urls.validate()?;
        }
        self.transport.validate()?;
        self.auth.validate()?;
        Ok(())
    }

    fn normalize_from_env(&mut self) {
        if self.addressing.is_none() {
            if let Ok(subdomain) = std::env::var("NEXUS_SUBDOMAIN") {
                self.addressing = Some(AddressingConfig {
                    subdomain,
                    region: std::env::var("NEXUS_REGION").unwrap_or_default(),
                    platform_domain: default_platform_domain(),
                });
            }
        }
        if self.service_urls.is_none() {
            if let Ok(auth_url) = std::env::var("NEXUS_AUTH_URL") {
                self.service_urls = Some(ServiceUrlsConfig {
                    auth_url,
                    storage_url: std::env::var("NEXUS_STORAGE_URL").unwrap_or_default(),
                    functions_url: std::env::var("NEXUS_FUNCTIONS_URL").unwrap_or_default(),
                    graphql_url: std::env::var("NEXUS_GRAPHQL_URL").unwrap_or_default(),
                });
            }
        }
    }
}

impl AddressingConfig {
    fn normalize(&mut self) {
        self.subdomain = self.subdomain.trim().to_string();
        self.region = self.region.trim().to_string();
        if self.platform_domain.trim().is_empty() {
            self.platform_domain = default_platform_domain();
        }
    }
}

impl ServiceUrlsConfig {
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("auth_url", &self.auth_url),
            ("storage_url", &self.storage_url),
            ("functions_url", &self.functions_url),
            ("graphql_url", &self.graphql_url),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(anyhow!("service_urls.{name} is empty; all four service URLs are required"));
            }
        }
        Ok(())
    }
}

impl TransportSettings {
    fn validate(&self) -> Result<()> {
        if self.connect_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err(anyhow!("transport timeouts must be positive seconds"));
        }
        Ok(())
    }
}

impl AuthSettings {
    fn validate(&self) -> Result<()> {
        if self.refresh_interval_secs == Some(0) {
            return Err(anyhow!("auth.refresh_interval_secs must be >= 1"));
        }
        Ok(())
    }
}
