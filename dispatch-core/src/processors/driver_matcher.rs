//! DriverMatcher.
//!
//! Many drivers may try to claim the same ready order at once. The claim is a
//! single conditional `UPDATE`; the database serialises competing writers on
//! the row, so exactly one sees `driver_id IS NULL` and wins. Losers re-read
//! the row to learn why they lost.

use kanau::processor::Processor;

use crate::entities::order::{Order, fetch_snapshot};
use crate::entities::status_history::{self, NewHistoryEntry};
use crate::entities::OrderStatus;
use crate::error::OrderError;
use crate::framework::DatabaseProcessor;
use crate::lifecycle::classify_assignment_failure;

pub(crate) const SELF_ASSIGN_NOTE: &str = "driver self-assigned";

#[derive(Debug, Clone, Copy)]
/// Unassigned active orders a driver could pick up, most ready first.
///
/// Ordered by tier (ready, preparing, confirmed), then oldest first.
pub struct ListAvailableOrders {
    pub limit: i64,
    pub offset: i64,
}

impl Processor<ListAvailableOrders> for DatabaseProcessor {
    type Output = Vec<Order>;
    type Error = OrderError;
    #[tracing::instrument(skip_all, err, name = "SQL:ListAvailableOrders")]
    async fn process(&self, query: ListAvailableOrders) -> Result<Vec<Order>, OrderError> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT * FROM orders
            WHERE is_active
              AND driver_id IS NULL
              AND status IN ('ready', 'preparing', 'confirmed')
            ORDER BY
              CASE status
                WHEN 'ready' THEN 1
                WHEN 'preparing' THEN 2
                ELSE 3
              END,
              created_at ASC,
              id ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }
}

#[derive(Debug, Clone, Copy)]
/// Claim a `ready` order for a driver.
///
/// `driver_id` is the driver profile written to the order; `driver_user_id`
/// is the user recorded as the history actor.
pub struct AssignDriver {
    pub order_id: i64,
    pub driver_id: i64,
    pub driver_user_id: i64,
}

impl AssignDriver {
    pub(crate) fn history_entry(&self) -> NewHistoryEntry {
        NewHistoryEntry {
            order_id: self.order_id,
            actor_id: Some(self.driver_user_id),
            from_status: OrderStatus::Ready,
            to_status: OrderStatus::DriverAssigned,
            notes: Some(SELF_ASSIGN_NOTE.to_string()),
            metadata: Some(serde_json::json!({ "driver_id": self.driver_id })),
        }
    }
}

impl Processor<AssignDriver> for DatabaseProcessor {
    type Output = Order;
    type Error = OrderError;
    #[tracing::instrument(skip_all, err, name = "SQL:AssignDriver")]
    async fn process(&self, cmd: AssignDriver) -> Result<Order, OrderError> {
        let mut tx = self.pool.begin().await?;

        let claimed = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET driver_id = $2,
                status = 'driver_assigned',
                updated_at = timezone('utc', now())
            WHERE id = $1
              AND status = 'ready'
              AND driver_id IS NULL
              AND is_active
            RETURNING *
            "#,
        )
        .bind(cmd.order_id)
        .bind(cmd.driver_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(order) = claimed else {
            let snapshot = fetch_snapshot(&mut *tx, cmd.order_id).await?;
            let err = classify_assignment_failure(snapshot);
            tracing::debug!(order_id = cmd.order_id, driver_id = cmd.driver_id, error = %err, "Driver assignment rejected");
            return Err(err);
        };

        status_history::append(&mut tx, cmd.history_entry()).await?;
        tx.commit().await?;

        tracing::info!(
            order_id = order.id,
            driver_id = cmd.driver_id,
            "Driver assigned"
        );
        Ok(order)
    }
}
