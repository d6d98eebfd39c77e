//! StatusTransitionEngine.
//!
//! A transition is one transaction: a compare-and-swap `UPDATE` conditioned on
//! the status the order was read at, plus exactly one history row. If the
//! conditional write matches nothing the order is re-read to explain why.

use kanau::processor::Processor;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::entities::order::{Order, fetch_snapshot};
use crate::entities::status_history::{self, NewHistoryEntry};
use crate::entities::OrderStatus;
use crate::error::OrderError;
use crate::framework::DatabaseProcessor;
use crate::lifecycle::{check_cancellation, check_transition, classify_cas_failure};

/// Travel allowance added to a preparation estimate to project delivery.
pub const DELIVERY_ALLOWANCE_MINUTES: i32 = 30;
/// Upper bound on a preparation estimate (one day).
pub const MAX_PREPARATION_MINUTES: i32 = 24 * 60;

#[derive(Debug, Clone)]
/// Move an order one step along the state machine, or cancel it.
///
/// `driver_assigned` is rejected here; use
/// [`AssignDriver`](crate::processors::AssignDriver).
pub struct TransitionOrderStatus {
    pub order_id: i64,
    pub target: OrderStatus,
    pub actor_id: Option<i64>,
    pub notes: Option<String>,
    /// Restaurant estimate, usually given when confirming or preparing.
    /// Supplying one also sets `estimated_delivery_at` to now plus the
    /// estimate plus [`DELIVERY_ALLOWANCE_MINUTES`].
    pub estimated_preparation_minutes: Option<i32>,
}

impl TransitionOrderStatus {
    pub(crate) fn validate(&self) -> Result<(), OrderError> {
        if self
            .estimated_preparation_minutes
            .is_some_and(|m| m <= 0 || m > MAX_PREPARATION_MINUTES)
        {
            return Err(OrderError::validation(format!(
                "estimated preparation minutes must be between 1 and {MAX_PREPARATION_MINUTES}"
            )));
        }
        Ok(())
    }

    pub(crate) fn into_change(self, from: OrderStatus) -> StatusChange {
        let cancellation_reason = if self.target == OrderStatus::Cancelled {
            self.notes.clone()
        } else {
            None
        };
        StatusChange {
            order_id: self.order_id,
            from,
            to: self.target,
            actor_id: self.actor_id,
            notes: self.notes,
            cancellation_reason,
            estimated_preparation_minutes: self.estimated_preparation_minutes,
        }
    }
}

#[derive(Debug, Clone)]
/// Cancel an order, recording the reason.
///
/// Staff may cancel from any non-terminal status. A customer cancellation
/// (`by_customer`) is only accepted before a driver is assigned; the check
/// runs against the same status the conditional write replaces.
pub struct CancelOrder {
    pub order_id: i64,
    pub reason: String,
    pub actor_id: Option<i64>,
    pub by_customer: bool,
}

impl CancelOrder {
    pub(crate) fn validate(&self) -> Result<(), OrderError> {
        if self.reason.trim().is_empty() {
            return Err(OrderError::validation("cancellation reason must not be empty"));
        }
        Ok(())
    }

    pub(crate) fn into_change(self, from: OrderStatus) -> StatusChange {
        StatusChange {
            order_id: self.order_id,
            from,
            to: OrderStatus::Cancelled,
            actor_id: self.actor_id,
            notes: Some(self.reason.clone()),
            cancellation_reason: Some(self.reason),
            estimated_preparation_minutes: None,
        }
    }
}

/// A validated status change, ready to be applied.
#[derive(Debug, Clone)]
pub(crate) struct StatusChange {
    pub order_id: i64,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub actor_id: Option<i64>,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub estimated_preparation_minutes: Option<i32>,
}

impl StatusChange {
    pub(crate) fn history_entry(&self) -> NewHistoryEntry {
        NewHistoryEntry {
            order_id: self.order_id,
            actor_id: self.actor_id,
            from_status: self.from,
            to_status: self.to,
            notes: self.notes.clone(),
            metadata: None,
        }
    }
}

async fn apply_transition(pool: &PgPool, change: StatusChange) -> Result<Order, OrderError> {
    let mut tx = pool.begin().await?;

    let mut query_builder = QueryBuilder::<Postgres>::new("UPDATE orders SET status = ");
    query_builder.push_bind(change.to);
    if let Some(phase) = change.to.phase() {
        let column = phase.column();
        query_builder.push(format!(
            ", {column} = COALESCE({column}, timezone('utc', now()))"
        ));
    }
    if let Some(reason) = change.cancellation_reason.clone() {
        query_builder
            .push(", cancellation_reason = ")
            .push_bind(reason);
    }
    if let Some(minutes) = change.estimated_preparation_minutes {
        query_builder
            .push(", estimated_preparation_minutes = ")
            .push_bind(minutes)
            .push(", estimated_delivery_at = timezone('utc', now()) + make_interval(mins => ")
            .push_bind(minutes + DELIVERY_ALLOWANCE_MINUTES)
            .push(")");
    }
    query_builder
        .push(", updated_at = timezone('utc', now()) WHERE id = ")
        .push_bind(change.order_id)
        .push(" AND status = ")
        .push_bind(change.from)
        .push(" AND is_active RETURNING *");

    let updated = query_builder
        .build_query_as::<Order>()
        .fetch_optional(&mut *tx)
        .await?;

    let Some(order) = updated else {
        let snapshot = fetch_snapshot(&mut *tx, change.order_id).await?;
        let err = classify_cas_failure(snapshot);
        tracing::warn!(order_id = change.order_id, from = %change.from, to = %change.to, error = %err, "Status transition lost a race");
        return Err(err);
    };

    status_history::append(&mut tx, change.history_entry()).await?;
    tx.commit().await?;

    tracing::info!(
        order_id = order.id,
        from = %change.from,
        to = %change.to,
        "Order status changed"
    );
    Ok(order)
}

impl Processor<TransitionOrderStatus> for DatabaseProcessor {
    type Output = Order;
    type Error = OrderError;
    #[tracing::instrument(skip_all, err, name = "SQL:TransitionOrderStatus")]
    async fn process(&self, cmd: TransitionOrderStatus) -> Result<Order, OrderError> {
        cmd.validate()?;
        let snapshot = fetch_snapshot(&self.pool, cmd.order_id)
            .await?
            .ok_or(OrderError::NotFound)?;
        check_transition(&snapshot, cmd.target)?;
        apply_transition(&self.pool, cmd.into_change(snapshot.status)).await
    }
}

impl Processor<CancelOrder> for DatabaseProcessor {
    type Output = Order;
    type Error = OrderError;
    #[tracing::instrument(skip_all, err, name = "SQL:CancelOrder")]
    async fn process(&self, cmd: CancelOrder) -> Result<Order, OrderError> {
        cmd.validate()?;
        let snapshot = fetch_snapshot(&self.pool, cmd.order_id)
            .await?
            .ok_or(OrderError::NotFound)?;
        check_cancellation(&snapshot, cmd.by_customer)?;
        apply_transition(&self.pool, cmd.into_change(snapshot.status)).await
    }
}
