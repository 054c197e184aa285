use async_trait::async_trait;
use orderdesk_core::{
    ExternalOrderId, ProviderAck, ProviderClient, ProviderError, ProviderStatus, StatusExtras,
};
use orderdesk_shared::Masked;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Path of the provider's admin status endpoint, relative to the base URL.
pub const STATUS_PATH: &str = "/adminapi/v2/orders/status";

const API_KEY_HEADER: &str = "X-Api-Key";

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Base URL of the provider API (e.g. "https://permjai.com").
    pub base_url: Option<String>,

    /// Pre-shared key sent with every request.
    pub api_key: Option<Masked<String>>,

    /// Upper bound on a single status push, connect through response body.
    pub timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            timeout: Duration::from_secs(10),
        }
    }
}

impl ProviderConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(Masked(api_key.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Serialize)]
struct StatusRequest {
    order_id: ExternalOrderId,
    status: ProviderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remains: Option<i64>,
}

/// Provider envelope. The provider can answer 200 with a non-zero `error_code`,
/// so the code is checked regardless of HTTP status.
#[derive(Deserialize)]
struct StatusResponse {
    error_code: Option<i64>,
    error_message: Option<String>,
    message: Option<String>,
    #[serde(default)]
    data: Value,
}

/// HTTP client for the provider's status API.
///
/// Built once at startup and shared; the underlying connection pool is reused
/// across pushes.
pub struct HttpProviderClient {
    client: Client,
    endpoint: Option<String>,
    api_key: Option<Masked<String>>,
}

impl HttpProviderClient {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Config(format!("failed to build HTTP client: {}", e)))?;

        let endpoint = config
            .base_url
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .map(|url| format!("{}{}", url, STATUS_PATH));

        let api_key = config.api_key.filter(|key| !key.expose().trim().is_empty());

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some() && self.api_key.is_some()
    }

    fn credentials(&self) -> Result<(&str, &str), ProviderError> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or_else(|| ProviderError::Config("provider base URL is not set".to_string()))?;
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| ProviderError::Config("provider API key is not set".to_string()))?;
        Ok((endpoint, api_key.expose().as_str()))
    }
}

fn transport(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Transport(format!("request timed out: {}", err))
    } else {
        ProviderError::Transport(err.to_string())
    }
}

#[async_trait]
impl ProviderClient for HttpProviderClient {
    async fn push_status(
        &self,
        external_order_id: ExternalOrderId,
        status: ProviderStatus,
        extras: StatusExtras,
    ) -> Result<ProviderAck, ProviderError> {
        let (endpoint, api_key) = self.credentials()?;

        let payload = StatusRequest {
            order_id: external_order_id,
            status,
            start_count: extras.start_count,
            remains: extras.remains,
        };
        debug!("Pushing status '{}' for provider order {}", status, external_order_id);

        let response = self
            .client
            .post(endpoint)
            .header(API_KEY_HEADER, api_key)
            .json(&payload)
            .send()
            .await
            .map_err(transport)?;

        let http_status = response.status();
        let body = response.bytes().await.map_err(transport)?;
        let parsed = serde_json::from_slice::<StatusResponse>(&body);

        if !http_status.is_success() {
            let reason = parsed
                .ok()
                .and_then(|r| r.error_message.or(r.message))
                .unwrap_or_else(|| format!("HTTP {}", http_status));
            warn!("Provider returned {} for order {}: {}", http_status, external_order_id, reason);
            return Err(ProviderError::Rejected(reason));
        }

        let envelope = parsed.map_err(|e| {
            ProviderError::Rejected(format!("invalid response body: {}", e))
        })?;

        match envelope.error_code {
            Some(0) => {
                info!("Provider accepted status '{}' for order {}", status, external_order_id);
                Ok(ProviderAck {
                    message: envelope.message,
                    data: envelope.data,
                })
            }
            Some(code) => {
                let reason = envelope
                    .error_message
                    .unwrap_or_else(|| format!("error code {}", code));
                warn!("Provider error code {} for order {}: {}", code, external_order_id, reason);
                Err(ProviderError::Rejected(reason))
            }
            None => Err(ProviderError::Rejected(
                envelope
                    .error_message
                    .unwrap_or_else(|| "response carried no error_code".to_string()),
            )),
        }
    }
}
