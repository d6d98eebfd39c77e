//! Append-only audit trail of status transitions.
//!
//! Rows are only ever written inside the transaction that changes the order
//! status, so the trail and the order row cannot disagree.

use kanau::processor::Processor;
use sqlx::{PgExecutor, Postgres};

use crate::entities::OrderStatus;
use crate::entities::order::fetch_snapshot;
use crate::error::OrderError;
use crate::framework::DatabaseProcessor;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct OrderStatusHistory {
    pub id: i64,
    pub order_id: i64,
    pub actor_id: Option<i64>,
    pub from_status: OrderStatus,
    pub to_status: OrderStatus,
    pub notes: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: time::PrimitiveDateTime,
}

/// Data for appending one history row.
#[derive(Debug, Clone)]
pub(crate) struct NewHistoryEntry {
    pub order_id: i64,
    pub actor_id: Option<i64>,
    pub from_status: OrderStatus,
    pub to_status: OrderStatus,
    pub notes: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

pub(crate) async fn append(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    entry: NewHistoryEntry,
) -> Result<OrderStatusHistory, sqlx::Error> {
    sqlx::query_as::<_, OrderStatusHistory>(
        r#"
        INSERT INTO order_status_history (order_id, actor_id, from_status, to_status, notes, metadata)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(entry.order_id)
    .bind(entry.actor_id)
    .bind(entry.from_status)
    .bind(entry.to_status)
    .bind(entry.notes)
    .bind(entry.metadata)
    .fetch_one(&mut **tx)
    .await
}

pub(crate) async fn fetch_by_order<'e, E: PgExecutor<'e>>(
    executor: E,
    order_id: i64,
) -> Result<Vec<OrderStatusHistory>, sqlx::Error> {
    sqlx::query_as::<_, OrderStatusHistory>(
        "SELECT * FROM order_status_history WHERE order_id = $1 ORDER BY created_at ASC, id ASC",
    )
    .bind(order_id)
    .fetch_all(executor)
    .await
}

#[derive(Debug, Clone, Copy)]
/// Full history of one order, oldest first.
pub struct ListHistoryByOrder {
    pub order_id: i64,
}

impl Processor<ListHistoryByOrder> for DatabaseProcessor {
    type Output = Vec<OrderStatusHistory>;
    type Error = OrderError;
    #[tracing::instrument(skip_all, err, name = "SQL:ListHistoryByOrder")]
    async fn process(
        &self,
        query: ListHistoryByOrder,
    ) -> Result<Vec<OrderStatusHistory>, OrderError> {
        if fetch_snapshot(&self.pool, query.order_id).await?.is_none() {
            return Err(OrderError::NotFound);
        }
        Ok(fetch_by_order(&self.pool, query.order_id).await?)
    }
}

#[derive(Debug, Clone, Copy)]
/// Transitions performed by one actor, newest first.
pub struct ListHistoryByActor {
    pub actor_id: i64,
    pub limit: i64,
    pub offset: i64,
}

impl Processor<ListHistoryByActor> for DatabaseProcessor {
    type Output = Vec<OrderStatusHistory>;
    type Error = OrderError;
    #[tracing::instrument(skip_all, err, name = "SQL:ListHistoryByActor")]
    async fn process(
        &self,
        query: ListHistoryByActor,
    ) -> Result<Vec<OrderStatusHistory>, OrderError> {
        let entries = sqlx::query_as::<_, OrderStatusHistory>(
            r#"
            SELECT * FROM order_status_history
            WHERE actor_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(query.actor_id)
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}
