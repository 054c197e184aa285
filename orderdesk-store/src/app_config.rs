use orderdesk_shared::Masked;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub provider: ProviderSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: Masked<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

/// Fulfillment provider endpoint and credentials.
///
/// Both values are optional here so the service can still start and serve
/// local edits; pushes fail with a configuration error until they are set.
#[derive(Debug, Deserialize, Clone)]
pub struct ProviderSettings {
    pub base_url: Option<String>,
    pub api_key: Option<Masked<String>>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 { 10 }

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ProviderSettings {
    pub fn is_complete(&self) -> bool {
        let has_url = self.base_url.as_deref().is_some_and(|u| !u.trim().is_empty());
        let has_key = self.api_key.as_ref().is_some_and(|k| !k.expose().trim().is_empty());
        has_url && has_key
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Developer overrides, never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg.. `ORDERDESK__PROVIDER__API_KEY=...` sets `provider.api_key`
            .add_source(config::Environment::with_prefix("ORDERDESK").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
