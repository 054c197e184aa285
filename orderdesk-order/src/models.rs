use orderdesk_core::{
    ExternalOrderId, Order, OrderId, OrderPatch, OrderStatus, ProviderAck, ProviderError,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A user-initiated edit of an order's fulfillment fields.
///
/// There is no `charge` or `profit` here: the former is read from the store,
/// the latter is derived.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReconcileRequest {
    #[serde(alias = "internalId")]
    pub internal_id: OrderId,
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

impl ReconcileRequest {
    pub fn new(internal_id: OrderId) -> Self {
        Self {
            internal_id,
            ..Default::default()
        }
    }

    pub fn has_changes(&self) -> bool {
        self.status.is_some()
            || self.cost.is_some()
            || self.start_count.is_some()
            || self.remains.is_some()
            || self.slip_url.is_some()
            || self.note.is_some()
    }

    /// The local write: supplied fields only, plus the derived profit if any.
    pub fn to_patch(&self, profit: Option<Decimal>) -> OrderPatch {
        OrderPatch {
            status: self.status,
            cost: self.cost,
            profit,
            start_count: self.start_count,
            remains: self.remains,
            slip_url: self.slip_url.clone(),
            note: self.note.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PropagationErrorKind {
    Config,
    Rejected,
    Transport,
}

/// Outcome of pushing a status to the provider after the local write.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Propagation {
    pub attempted: bool,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<PropagationErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_response: Option<Value>,
}

impl Propagation {
    /// Local-only update; the provider was deliberately not contacted.
    pub fn skipped() -> Self {
        Self::default()
    }

    pub fn from_result(result: Result<ProviderAck, ProviderError>) -> Self {
        match result {
            Ok(ack) => Self {
                attempted: true,
                success: true,
                error: None,
                error_kind: None,
                provider_response: Some(ack.data),
            },
            Err(err) => {
                let kind = match &err {
                    ProviderError::Config(_) => PropagationErrorKind::Config,
                    ProviderError::Rejected(_) => PropagationErrorKind::Rejected,
                    ProviderError::Transport(_) => PropagationErrorKind::Transport,
                };
                Self {
                    attempted: true,
                    success: false,
                    error: Some(err.to_string()),
                    error_kind: Some(kind),
                    provider_response: None,
                }
            }
        }
    }
}

/// The authoritative local order plus the remote sync result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcileOutcome {
    pub order: Order,
    pub propagation: Propagation,
}

impl ReconcileOutcome {
    /// True only when the provider confirmed the change.
    pub fn in_sync(&self) -> bool {
        self.propagation.success
    }
}
