pub mod models;
pub mod repository;
pub mod provider;

pub use models::{ExternalOrderId, Order, OrderId, OrderPatch, OrderStatus, ProviderStatus};
pub use provider::{ProviderAck, ProviderClient, ProviderError, StatusExtras};
pub use repository::{OrderStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
