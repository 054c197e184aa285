use crate::models::{Propagation, ReconcileOutcome, ReconcileRequest};
use orderdesk_core::{
    ExternalOrderId, Order, OrderId, OrderStore, ProviderClient, ProviderStatus, StatusExtras,
    StoreError,
};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    #[error("Request does not change any field")]
    NoOp,

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Local update failed: {0}")]
    LocalUpdateFailed(String),
}

impl ReconcileError {
    fn from_store(id: OrderId, err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => ReconcileError::OrderNotFound(id),
            StoreError::Backend(msg) => ReconcileError::LocalUpdateFailed(msg),
        }
    }
}

/// Applies order edits locally and mirrors eligible status changes to the
/// fulfillment provider.
///
/// Steps run strictly in sequence: charge read, local write, provider push.
/// A failed push never undoes or fails the local write; it is reported in the
/// outcome's `propagation` instead.
pub struct Reconciler {
    store: Arc<dyn OrderStore>,
    provider: Arc<dyn ProviderClient>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn OrderStore>, provider: Arc<dyn ProviderClient>) -> Self {
        Self { store, provider }
    }

    pub async fn reconcile(
        &self,
        request: ReconcileRequest,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let id = request.internal_id;
        if !request.has_changes() {
            return Err(ReconcileError::NoOp);
        }

        // Charge is always re-read; the request never carries it.
        let profit = match request.cost {
            Some(cost) => {
                let charge = self
                    .store
                    .fetch_charge(id)
                    .await
                    .map_err(|e| ReconcileError::from_store(id, e))?;
                Some(Order::derive_profit(charge, cost))
            }
            None => None,
        };

        let patch = request.to_patch(profit);
        let order = self.store.update_order(id, &patch).await.map_err(|e| {
            error!("Failed to update order {}: {}", id, e);
            ReconcileError::from_store(id, e)
        })?;
        info!("Order {} updated locally (status: {:?})", id, order.status);

        let propagation = match request.status.and_then(|s| s.provider_status()) {
            Some(provider_status) => {
                let external_id = request.external_order_id.unwrap_or(order.external_order_id);
                let extras = StatusExtras {
                    start_count: request.start_count,
                    remains: request.remains,
                };
                self.propagate(id, external_id, provider_status, extras).await
            }
            None => Propagation::skipped(),
        };

        Ok(ReconcileOutcome { order, propagation })
    }

    /// Re-push the stored status of an order without writing anything locally.
    ///
    /// This is the retry path for a propagation that failed earlier.
    pub async fn resync(&self, id: OrderId) -> Result<ReconcileOutcome, ReconcileError> {
        let order = self
            .store
            .get_order(id)
            .await
            .map_err(|e| ReconcileError::from_store(id, e))?;

        let propagation = match order.status.and_then(|s| s.provider_status()) {
            Some(provider_status) => {
                let extras = StatusExtras {
                    start_count: order.start_count,
                    remains: order.remains,
                };
                self.propagate(id, order.external_order_id, provider_status, extras)
                    .await
            }
            None => {
                info!("Order {} has no provider-side status to resync", id);
                Propagation::skipped()
            }
        };

        Ok(ReconcileOutcome { order, propagation })
    }

    async fn propagate(
        &self,
        id: OrderId,
        external_id: ExternalOrderId,
        status: ProviderStatus,
        extras: StatusExtras,
    ) -> Propagation {
        let result = self.provider.push_status(external_id, status, extras).await;
        match &result {
            Ok(_) => info!(
                "Order {} propagated to provider as '{}' (provider order {})",
                id, status, external_id
            ),
            Err(e) => warn!(
                "Order {} saved locally but provider sync failed: {}",
                id, e
            ),
        }
        Propagation::from_result(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PropagationErrorKind;
    use async_trait::async_trait;
    use orderdesk_core::{
        OrderPatch, OrderStatus, ProviderAck, ProviderError,
    };
    use orderdesk_store::MemoryOrderStore;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Wraps the in-memory store, counting calls and optionally failing writes.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryOrderStore,
        reads: AtomicUsize,
        writes: AtomicUsize,
        fail_writes: bool,
    }

    impl CountingStore {
        fn failing_writes() -> Self {
            Self {
                fail_writes: true,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl OrderStore for CountingStore {
        async fn fetch_charge(&self, id: OrderId) -> Result<Decimal, StoreError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.fetch_charge(id).await
        }

        async fn update_order(&self, id: OrderId, patch: &OrderPatch) -> Result<Order, StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail_writes {
                return Err(StoreError::Backend("deadlock detected".to_string()));
            }
            self.inner.update_order(id, patch).await
        }

        async fn get_order(&self, id: OrderId) -> Result<Order, StoreError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.get_order(id).await
        }
    }

    /// Records every push and answers with a fixed result.
    struct RecordingProvider {
        calls: Mutex<Vec<(ExternalOrderId, ProviderStatus, StatusExtras)>>,
        response: Result<ProviderAck, ProviderError>,
    }

    impl RecordingProvider {
        fn accepting() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                response: Ok(ProviderAck {
                    message: Some("ok".to_string()),
                    data: serde_json::json!({"accepted": true}),
                }),
            }
        }

        fn failing(err: ProviderError) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                response: Err(err),
            }
        }

        fn calls(&self) -> Vec<(ExternalOrderId, ProviderStatus, StatusExtras)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProviderClient for RecordingProvider {
        async fn push_status(
            &self,
            external_order_id: ExternalOrderId,
            status: ProviderStatus,
            extras: StatusExtras,
        ) -> Result<ProviderAck, ProviderError> {
            self.calls
                .lock()
                .unwrap()
                .push((external_order_id, status, extras));
            self.response.clone()
        }
    }

    async fn setup(
        store: CountingStore,
        provider: RecordingProvider,
    ) -> (Reconciler, Arc<CountingStore>, Arc<RecordingProvider>) {
        let mut order = Order::new(42, 9001, dec!(1000));
        order.status = Some(OrderStatus::Pending);
        store.inner.insert(order).await;

        let store = Arc::new(store);
        let provider = Arc::new(provider);
        let reconciler = Reconciler::new(store.clone(), provider.clone());
        (reconciler, store, provider)
    }

    #[tokio::test]
    async fn test_end_to_end_completion() {
        let (reconciler, _store, provider) =
            setup(CountingStore::default(), RecordingProvider::accepting()).await;

        let request = ReconcileRequest {
            internal_id: 42,
            external_order_id: Some(9001),
            cost: Some(dec!(400)),
            status: Some(OrderStatus::Completed),
            start_count: Some(100),
            remains: Some(0),
            ..Default::default()
        };
        let outcome = reconciler.reconcile(request).await.unwrap();

        assert_eq!(outcome.order.cost, Some(dec!(400)));
        assert_eq!(outcome.order.profit, Some(dec!(600)));
        assert_eq!(outcome.order.status, Some(OrderStatus::Completed));
        assert_eq!(outcome.order.start_count, Some(100));
        assert_eq!(outcome.order.remains, Some(0));
        assert!(outcome.propagation.attempted);
        assert!(outcome.propagation.success);
        assert!(outcome.in_sync());

        assert_eq!(
            provider.calls(),
            vec![(
                9001,
                ProviderStatus::Completed,
                StatusExtras {
                    start_count: Some(100),
                    remains: Some(0)
                }
            )]
        );
    }

    #[tokio::test]
    async fn test_profit_uses_stored_charge() {
        let (reconciler, store, _provider) =
            setup(CountingStore::default(), RecordingProvider::accepting()).await;

        for (cost, expected) in [(dec!(200), dec!(800)), (dec!(1250.50), dec!(-250.50))] {
            let mut request = ReconcileRequest::new(42);
            request.cost = Some(cost);
            let outcome = reconciler.reconcile(request).await.unwrap();
            assert_eq!(outcome.order.profit, Some(expected));
            assert_eq!(outcome.order.charge, dec!(1000));
        }
        assert_eq!(store.reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_status_without_cost_leaves_profit_alone() {
        let (reconciler, store, _provider) =
            setup(CountingStore::default(), RecordingProvider::accepting()).await;

        let mut request = ReconcileRequest::new(42);
        request.cost = Some(dec!(300));
        reconciler.reconcile(request).await.unwrap();

        let mut request = ReconcileRequest::new(42);
        request.status = Some(OrderStatus::Canceled);
        let outcome = reconciler.reconcile(request).await.unwrap();

        assert_eq!(outcome.order.profit, Some(dec!(700)));
        assert_eq!(outcome.order.cost, Some(dec!(300)));
        // charge is read only for the request that carried a cost
        assert_eq!(store.reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_local_only_statuses_are_not_propagated() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::InProgress,
            OrderStatus::Processing,
            OrderStatus::Error,
        ] {
            let (reconciler, _store, provider) =
                setup(CountingStore::default(), RecordingProvider::accepting()).await;

            let mut request = ReconcileRequest::new(42);
            request.status = Some(status);
            let outcome = reconciler.reconcile(request).await.unwrap();

            assert_eq!(outcome.order.status, Some(status));
            assert!(!outcome.propagation.attempted, "{} must stay local", status);
            assert!(provider.calls().is_empty());
        }
    }

    #[tokio::test]
    async fn test_provider_statuses_are_propagated() {
        for status in [
            OrderStatus::Completed,
            OrderStatus::Partial,
            OrderStatus::Canceled,
        ] {
            let (reconciler, _store, provider) =
                setup(CountingStore::default(), RecordingProvider::accepting()).await;

            let mut request = ReconcileRequest::new(42);
            request.status = Some(status);
            let outcome = reconciler.reconcile(request).await.unwrap();

            assert!(outcome.propagation.attempted);
            let calls = provider.calls();
            assert_eq!(calls.len(), 1);
            assert_eq!(OrderStatus::from(calls[0].1), status);
        }
    }

    #[tokio::test]
    async fn test_noop_request_touches_nothing() {
        let (reconciler, store, provider) =
            setup(CountingStore::default(), RecordingProvider::accepting()).await;

        let mut request = ReconcileRequest::new(42);
        request.external_order_id = Some(9001);
        let err = reconciler.reconcile(request).await.unwrap_err();

        assert_eq!(err, ReconcileError::NoOp);
        assert_eq!(store.reads.load(Ordering::SeqCst), 0);
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_never_reaches_provider() {
        let (reconciler, store, provider) =
            setup(CountingStore::failing_writes(), RecordingProvider::accepting()).await;

        let mut request = ReconcileRequest::new(42);
        request.status = Some(OrderStatus::Completed);
        let err = reconciler.reconcile(request).await.unwrap_err();

        assert_eq!(
            err,
            ReconcileError::LocalUpdateFailed("deadlock detected".to_string())
        );
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_push_is_partial_success() {
        let (reconciler, store, _provider) = setup(
            CountingStore::default(),
            RecordingProvider::failing(ProviderError::Rejected("Invalid status".to_string())),
        )
        .await;

        let mut request = ReconcileRequest::new(42);
        request.status = Some(OrderStatus::Partial);
        request.remains = Some(35);
        let outcome = reconciler.reconcile(request).await.unwrap();

        assert_eq!(outcome.order.status, Some(OrderStatus::Partial));
        assert_eq!(outcome.order.remains, Some(35));
        assert!(outcome.propagation.attempted);
        assert!(!outcome.propagation.success);
        assert_eq!(outcome.propagation.error_kind, Some(PropagationErrorKind::Rejected));
        assert!(!outcome.propagation.error.clone().unwrap_or_default().is_empty());

        let stored = store.inner.get_order(42).await.unwrap();
        assert_eq!(stored.status, Some(OrderStatus::Partial));
    }

    #[tokio::test]
    async fn test_unconfigured_provider_is_reported_not_thrown() {
        let (reconciler, _store, _provider) = setup(
            CountingStore::default(),
            RecordingProvider::failing(ProviderError::Config("provider API key is not set".into())),
        )
        .await;

        let mut request = ReconcileRequest::new(42);
        request.status = Some(OrderStatus::Completed);
        let outcome = reconciler.reconcile(request).await.unwrap();

        assert_eq!(outcome.propagation.error_kind, Some(PropagationErrorKind::Config));
        assert_eq!(outcome.order.status, Some(OrderStatus::Completed));
    }

    #[tokio::test]
    async fn test_missing_order_with_cost_short_circuits() {
        let (reconciler, store, provider) =
            setup(CountingStore::default(), RecordingProvider::accepting()).await;

        let mut request = ReconcileRequest::new(404);
        request.cost = Some(dec!(10));
        request.status = Some(OrderStatus::Completed);
        let err = reconciler.reconcile(request).await.unwrap_err();

        assert_eq!(err, ReconcileError::OrderNotFound(404));
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_order_without_cost_is_not_found() {
        let (reconciler, _store, provider) =
            setup(CountingStore::default(), RecordingProvider::accepting()).await;

        let mut request = ReconcileRequest::new(404);
        request.status = Some(OrderStatus::Completed);
        let err = reconciler.reconcile(request).await.unwrap_err();

        assert_eq!(err, ReconcileError::OrderNotFound(404));
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_external_id_falls_back_to_stored_row() {
        let (reconciler, _store, provider) =
            setup(CountingStore::default(), RecordingProvider::accepting()).await;

        let mut request = ReconcileRequest::new(42);
        request.status = Some(OrderStatus::Canceled);
        reconciler.reconcile(request).await.unwrap();

        let calls = provider.calls();
        assert_eq!(calls[0].0, 9001);
        assert_eq!(calls[0].2, StatusExtras::default());
    }

    #[tokio::test]
    async fn test_non_terminal_status_keeps_remains() {
        let (reconciler, _store, _provider) =
            setup(CountingStore::default(), RecordingProvider::accepting()).await;

        let mut request = ReconcileRequest::new(42);
        request.remains = Some(12);
        reconciler.reconcile(request).await.unwrap();

        let mut request = ReconcileRequest::new(42);
        request.status = Some(OrderStatus::InProgress);
        let outcome = reconciler.reconcile(request).await.unwrap();

        assert_eq!(outcome.order.remains, Some(12));
    }

    #[tokio::test]
    async fn test_resync_pushes_stored_state_without_writing() {
        let (reconciler, store, provider) =
            setup(CountingStore::default(), RecordingProvider::accepting()).await;

        let mut request = ReconcileRequest::new(42);
        request.status = Some(OrderStatus::Partial);
        request.start_count = Some(50);
        request.remains = Some(5);
        reconciler.reconcile(request).await.unwrap();
        let writes_before = store.writes.load(Ordering::SeqCst);

        let outcome = reconciler.resync(42).await.unwrap();

        assert!(outcome.propagation.success);
        assert_eq!(store.writes.load(Ordering::SeqCst), writes_before);
        let calls = provider.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[1],
            (
                9001,
                ProviderStatus::Partial,
                StatusExtras {
                    start_count: Some(50),
                    remains: Some(5)
                }
            )
        );
    }

    #[tokio::test]
    async fn test_resync_of_local_only_status_is_skipped() {
        let (reconciler, _store, provider) =
            setup(CountingStore::default(), RecordingProvider::accepting()).await;

        let outcome = reconciler.resync(42).await.unwrap();
        assert!(!outcome.propagation.attempted);
        assert!(provider.calls().is_empty());

        assert_eq!(
            reconciler.resync(7).await.unwrap_err(),
            ReconcileError::OrderNotFound(7)
        );
    }
}
