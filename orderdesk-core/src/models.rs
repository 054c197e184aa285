use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CoreError;

/// Primary key of an order row in the local store
pub type OrderId = i64;

/// Identifier of the same order at the fulfillment provider
pub type ExternalOrderId = i64;

/// Order status in the internal vocabulary.
///
/// Stored and rendered in canonical capitalised form; parsed case-insensitively
/// so that legacy rows written as `pending` or `cancelled` still load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OrderStatus {
    Pending,
    InProgress,
    Processing,
    Completed,
    Partial,
    Canceled,
    Error,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::InProgress,
        OrderStatus::Processing,
        OrderStatus::Completed,
        OrderStatus::Partial,
        OrderStatus::Canceled,
        OrderStatus::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::InProgress => "In progress",
            OrderStatus::Processing => "Processing",
            OrderStatus::Completed => "Completed",
            OrderStatus::Partial => "Partial",
            OrderStatus::Canceled => "Canceled",
            OrderStatus::Error => "Error",
        }
    }

    /// The provider-side equivalent, if the provider accepts this status at all.
    pub fn provider_status(&self) -> Option<ProviderStatus> {
        match self {
            OrderStatus::Completed => Some(ProviderStatus::Completed),
            OrderStatus::Partial => Some(ProviderStatus::Partial),
            OrderStatus::Canceled => Some(ProviderStatus::Canceled),
            OrderStatus::Pending
            | OrderStatus::InProgress
            | OrderStatus::Processing
            | OrderStatus::Error => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.provider_status().is_some()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "in progress" | "in_progress" | "inprogress" => Ok(OrderStatus::InProgress),
            "processing" => Ok(OrderStatus::Processing),
            "completed" => Ok(OrderStatus::Completed),
            "partial" => Ok(OrderStatus::Partial),
            "canceled" | "cancelled" => Ok(OrderStatus::Canceled),
            "error" => Ok(OrderStatus::Error),
            _ => Err(CoreError::ValidationError(format!("unknown order status '{}'", s))),
        }
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, <OrderStatus as TryFrom<String>>::Error> {
        value.parse()
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.as_str().to_string()
    }
}

/// The subset of statuses the fulfillment provider accepts, in its lower-case vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    Completed,
    Partial,
    Canceled,
}

impl ProviderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderStatus::Completed => "completed",
            ProviderStatus::Partial => "partial",
            ProviderStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ProviderStatus> for OrderStatus {
    fn from(status: ProviderStatus) -> Self {
        match status {
            ProviderStatus::Completed => OrderStatus::Completed,
            ProviderStatus::Partial => OrderStatus::Partial,
            ProviderStatus::Canceled => OrderStatus::Canceled,
        }
    }
}

/// A fulfillment order as held in the local store.
///
/// `charge` is set by ingestion and never written here; `profit` is only ever
/// derived from `charge - cost`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub external_order_id: ExternalOrderId,
    pub created_at: DateTime<Utc>,
    pub customer: Option<String>,
    pub link: Option<String>,
    pub quantity: Option<i64>,
    pub service_id: Option<i64>,
    pub service_name: Option<String>,
    pub charge: Decimal,
    pub cost: Option<Decimal>,
    pub profit: Option<Decimal>,
    pub status: Option<OrderStatus>,
    pub start_count: Option<i64>,
    pub remains: Option<i64>,
    pub slip_url: Option<String>,
    pub note: Option<String>,
}

impl Order {
    pub fn new(id: OrderId, external_order_id: ExternalOrderId, charge: Decimal) -> Self {
        Self {
            id,
            external_order_id,
            created_at: Utc::now(),
            customer: None,
            link: None,
            quantity: None,
            service_id: None,
            service_name: None,
            charge,
            cost: None,
            profit: None,
            status: Some(OrderStatus::Pending),
            start_count: None,
            remains: None,
            slip_url: None,
            note: None,
        }
    }

    pub fn derive_profit(charge: Decimal, cost: Decimal) -> Decimal {
        charge - cost
    }

    /// Apply a partial update in place. Fields absent from the patch are left untouched.
    pub fn apply(&mut self, patch: &OrderPatch) {
        if let Some(status) = patch.status {
            self.status = Some(status);
        }
        if let Some(cost) = patch.cost {
            self.cost = Some(cost);
        }
        if let Some(profit) = patch.profit {
            self.profit = Some(profit);
        }
        if let Some(start_count) = patch.start_count {
            self.start_count = Some(start_count);
        }
        if let Some(remains) = patch.remains {
            self.remains = Some(remains);
        }
        if let Some(slip_url) = &patch.slip_url {
            self.slip_url = Some(slip_url.clone());
        }
        if let Some(note) = &patch.note {
            self.note = Some(note.clone());
        }
    }
}

/// Column-level partial update of an order. There is deliberately no `charge` here.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrderPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remains: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slip_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl OrderPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.cost.is_none()
            && self.profit.is_none()
            && self.start_count.is_none()
            && self.remains.is_none()
            && self.slip_url.is_none()
            && self.note.is_none()
    }
}
