use std::sync::Arc;
use orderdesk_core::{OrderStore, ProviderClient};
use orderdesk_order::Reconciler;

#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<dyn OrderStore>,
    pub reconciler: Arc<Reconciler>,
}

impl AppState {
    /// Wire the workflow over one shared store and one shared provider client.
    pub fn new(orders: Arc<dyn OrderStore>, provider: Arc<dyn ProviderClient>) -> Self {
        let reconciler = Arc::new(Reconciler::new(orders.clone(), provider));
        Self { orders, reconciler }
    }
}
