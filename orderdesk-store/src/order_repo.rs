use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orderdesk_core::{Order, OrderId, OrderPatch, OrderStatus, OrderStore, StoreError};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;

const ORDER_COLUMNS: &str = "id, external_order_id, created_at, customer, link, quantity, \
    service_id, service_name, charge, cost, profit, status, start_count, remains, slip_url, note";

pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    external_order_id: i64,
    created_at: DateTime<Utc>,
    customer: Option<String>,
    link: Option<String>,
    quantity: Option<i64>,
    service_id: Option<i64>,
    service_name: Option<String>,
    charge: Decimal,
    cost: Option<Decimal>,
    profit: Option<Decimal>,
    status: Option<String>,
    start_count: Option<i64>,
    remains: Option<i64>,
    slip_url: Option<String>,
    note: Option<String>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .as_deref()
            .map(str::parse::<OrderStatus>)
            .transpose()
            .map_err(|e| StoreError::Backend(format!("order {}: {}", row.id, e)))?;

        Ok(Order {
            id: row.id,
            external_order_id: row.external_order_id,
            created_at: row.created_at,
            customer: row.customer,
            link: row.link,
            quantity: row.quantity,
            service_id: row.service_id,
            service_name: row.service_name,
            charge: row.charge,
            cost: row.cost,
            profit: row.profit,
            status,
            start_count: row.start_count,
            remains: row.remains,
            slip_url: row.slip_url,
            note: row.note,
        })
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// Build `UPDATE orders SET ... WHERE id = $n RETURNING ...` touching only the
/// columns present in the patch.
fn build_update(id: OrderId, patch: &OrderPatch) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("UPDATE orders SET ");
    {
        let mut set = qb.separated(", ");
        if let Some(status) = patch.status {
            set.push("status = ").push_bind_unseparated(status.as_str());
        }
        if let Some(cost) = patch.cost {
            set.push("cost = ").push_bind_unseparated(cost);
        }
        if let Some(profit) = patch.profit {
            set.push("profit = ").push_bind_unseparated(profit);
        }
        if let Some(start_count) = patch.start_count {
            set.push("start_count = ").push_bind_unseparated(start_count);
        }
        if let Some(remains) = patch.remains {
            set.push("remains = ").push_bind_unseparated(remains);
        }
        if let Some(slip_url) = &patch.slip_url {
            set.push("slip_url = ").push_bind_unseparated(slip_url.clone());
        }
        if let Some(note) = &patch.note {
            set.push("note = ").push_bind_unseparated(note.clone());
        }
    }
    qb.push(" WHERE id = ").push_bind(id);
    qb.push(" RETURNING ").push(ORDER_COLUMNS);
    qb
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn fetch_charge(&self, id: OrderId) -> Result<Decimal, StoreError> {
        sqlx::query_scalar::<_, Decimal>("SELECT charge FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or(StoreError::NotFound(id))
    }

    async fn update_order(&self, id: OrderId, patch: &OrderPatch) -> Result<Order, StoreError> {
        if patch.is_empty() {
            return Err(StoreError::Backend("empty update".to_string()));
        }

        let mut qb = build_update(id, patch);
        debug!("Updating order {}: {}", id, qb.sql());

        let row = qb
            .build_query_as::<OrderRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or(StoreError::NotFound(id))?;

        Order::try_from(row)
    }

    async fn get_order(&self, id: OrderId) -> Result<Order, StoreError> {
        let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or(StoreError::NotFound(id))?;

        Order::try_from(row)
    }
}
