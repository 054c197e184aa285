//! In-memory order store.
//!
//! Mirrors the partial-update semantics of [`crate::PgOrderStore`] without a
//! database. Used by tests and for running the API locally against seeded rows.

use async_trait::async_trait;
use orderdesk_core::{Order, OrderId, OrderPatch, OrderStore, StoreError};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct MemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a row, replacing any existing order with the same id.
    pub async fn insert(&self, order: Order) {
        let mut orders = self.orders.write().await;
        orders.insert(order.id, order);
    }

    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn fetch_charge(&self, id: OrderId) -> Result<Decimal, StoreError> {
        let orders = self.orders.read().await;
        orders
            .get(&id)
            .map(|order| order.charge)
            .ok_or(StoreError::NotFound(id))
    }

    async fn update_order(&self, id: OrderId, patch: &OrderPatch) -> Result<Order, StoreError> {
        if patch.is_empty() {
            return Err(StoreError::Backend("empty update".to_string()));
        }

        let mut orders = self.orders.write().await;
        let order = orders.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        order.apply(patch);
        Ok(order.clone())
    }

    async fn get_order(&self, id: OrderId) -> Result<Order, StoreError> {
        let orders = self.orders.read().await;
        orders.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }
}
