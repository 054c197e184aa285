use async_trait::async_trait;
use rust_decimal::Decimal;
use crate::models::{Order, OrderId, OrderPatch};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// Failure reported by the underlying store, message kept verbatim.
    #[error("{0}")]
    Backend(String),
}

/// Point reads and writes against the order store, keyed by internal id
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Read the authoritative sale price of an order.
    async fn fetch_charge(&self, id: OrderId) -> Result<Decimal, StoreError>;

    /// Apply a partial update in a single row write and return the row as it
    /// stands afterwards.
    async fn update_order(&self, id: OrderId, patch: &OrderPatch) -> Result<Order, StoreError>;

    async fn get_order(&self, id: OrderId) -> Result<Order, StoreError>;
}
