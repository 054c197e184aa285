use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::models::{ExternalOrderId, ProviderStatus};

/// Optional counters sent along with a status push
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusExtras {
    pub start_count: Option<i64>,
    pub remains: Option<i64>,
}

/// Acknowledgement returned by the provider for an accepted status change
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderAck {
    pub message: Option<String>,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Credentials or endpoint missing; raised before any network I/O.
    #[error("provider not configured: {0}")]
    Config(String),

    /// The provider answered and refused the change.
    #[error("provider rejected status change: {0}")]
    Rejected(String),

    /// The provider could not be reached or did not answer in time.
    #[error("provider unreachable: {0}")]
    Transport(String),
}

/// Pushes status changes to the external fulfillment provider.
///
/// Implementations make exactly one remote call per invocation and never touch
/// local order state.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    async fn push_status(
        &self,
        external_order_id: ExternalOrderId,
        status: ProviderStatus,
        extras: StatusExtras,
    ) -> Result<ProviderAck, ProviderError>;
}
