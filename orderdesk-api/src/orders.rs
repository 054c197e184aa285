use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use orderdesk_core::{ExternalOrderId, Order, OrderId, OrderStatus};
use orderdesk_order::{ReconcileOutcome, ReconcileRequest};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{error::AppError, state::AppState};

// ============================================================================
// Request Types
// ============================================================================

/// Body of `POST /v1/orders/{id}/reconcile`; the internal id comes from the path.
///
/// Unknown fields such as `charge` or `profit` are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct ReconcileBody {
    #[serde(default, alias = "externalOrderId")]
    pub external_order_id: Option<ExternalOrderId>,
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub cost: Option<Decimal>,
    #[serde(default)]
    pub start_count: Option<i64>,
    #[serde(default)]
    pub remains: Option<i64>,
    #[serde(default)]
    pub slip_url: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl ReconcileBody {
    pub fn into_request(self, internal_id: OrderId) -> ReconcileRequest {
        ReconcileRequest {
            internal_id,
            external_order_id: self.external_order_id,
            status: self.status,
            cost: self.cost,
            start_count: self.start_count,
            remains: self.remains,
            slip_url: self.slip_url,
            note: self.note,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/orders/{id}", get(get_order))
        .route("/v1/orders/{id}/reconcile", post(reconcile_order))
        .route("/v1/orders/{id}/resync", post(resync_order))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /v1/orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<OrderId>,
) -> Result<Json<Order>, AppError> {
    let order = state.orders.get_order(order_id).await?;
    Ok(Json(order))
}

/// POST /v1/orders/{id}/reconcile
/// Save an edit locally and push eligible status changes to the provider
pub async fn reconcile_order(
    State(state): State<AppState>,
    Path(order_id): Path<OrderId>,
    payload: Result<Json<ReconcileBody>, JsonRejection>,
) -> Result<Json<ReconcileOutcome>, AppError> {
    let Json(body) = payload?;
    let outcome = state.reconciler.reconcile(body.into_request(order_id)).await?;

    if outcome.propagation.attempted && !outcome.propagation.success {
        tracing::warn!(
            "Order {} saved but not in sync with provider: {}",
            order_id,
            outcome.propagation.error.as_deref().unwrap_or("unknown error")
        );
    }

    Ok(Json(outcome))
}

/// POST /v1/orders/{id}/resync
/// Re-push the stored status after an earlier propagation failure
pub async fn resync_order(
    State(state): State<AppState>,
    Path(order_id): Path<OrderId>,
) -> Result<Json<ReconcileOutcome>, AppError> {
    let outcome = state.reconciler.resync(order_id).await?;
    Ok(Json(outcome))
}
