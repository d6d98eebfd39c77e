//! Order state machine.
//!
//! ```text
//! pending → confirmed → preparing → ready → driver_assigned → picked_up → en_route → delivered
//!    └──────────┴───────────┴─────────┴──────────┴─────────────┴───────────┴──→ cancelled
//! ```
//!
//! These rules are shared by every storage backend; the backends only decide
//! how the check and the conditional write are made atomic.

use crate::entities::OrderStatus;
use crate::error::OrderError;

/// Phase timestamp column stamped the first time a status is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Placed,
    Confirmed,
    Ready,
    Delivered,
    Cancelled,
}

impl Phase {
    pub fn column(self) -> &'static str {
        match self {
            Phase::Placed => "placed_at",
            Phase::Confirmed => "confirmed_at",
            Phase::Ready => "ready_at",
            Phase::Delivered => "delivered_at",
            Phase::Cancelled => "cancelled_at",
        }
    }
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// The single forward successor in the happy path.
    pub fn successor(self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Confirmed),
            OrderStatus::Confirmed => Some(OrderStatus::Preparing),
            OrderStatus::Preparing => Some(OrderStatus::Ready),
            OrderStatus::Ready => Some(OrderStatus::DriverAssigned),
            OrderStatus::DriverAssigned => Some(OrderStatus::PickedUp),
            OrderStatus::PickedUp => Some(OrderStatus::EnRoute),
            OrderStatus::EnRoute => Some(OrderStatus::Delivered),
            OrderStatus::Delivered | OrderStatus::Cancelled => None,
        }
    }

    /// Whether `self → target` is an edge of the state machine.
    pub fn can_transition_to(self, target: OrderStatus) -> bool {
        if target == OrderStatus::Cancelled {
            return !self.is_terminal();
        }
        self.successor() == Some(target)
    }

    /// Timestamp column to stamp when entering this status, if any.
    pub fn phase(self) -> Option<Phase> {
        match self {
            OrderStatus::Pending => Some(Phase::Placed),
            OrderStatus::Confirmed => Some(Phase::Confirmed),
            OrderStatus::Ready => Some(Phase::Ready),
            OrderStatus::Delivered => Some(Phase::Delivered),
            OrderStatus::Cancelled => Some(Phase::Cancelled),
            _ => None,
        }
    }

    /// Position in the driver feed: ready first, then preparing, then confirmed.
    /// `None` for orders drivers cannot see.
    pub fn availability_tier(self) -> Option<i32> {
        match self {
            OrderStatus::Ready => Some(1),
            OrderStatus::Preparing => Some(2),
            OrderStatus::Confirmed => Some(3),
            _ => None,
        }
    }

    /// Customers may cancel until a driver has picked the order up.
    pub fn customer_can_cancel(self) -> bool {
        matches!(
            self,
            OrderStatus::Pending
                | OrderStatus::Confirmed
                | OrderStatus::Preparing
                | OrderStatus::Ready
        )
    }

    /// Whether a driver must be attached while the order is in this status.
    pub fn requires_driver(self) -> bool {
        matches!(
            self,
            OrderStatus::DriverAssigned
                | OrderStatus::PickedUp
                | OrderStatus::EnRoute
                | OrderStatus::Delivered
        )
    }
}

/// The columns needed to decide whether a conditional write may proceed, or
/// why it did not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct OrderSnapshot {
    pub status: OrderStatus,
    pub driver_id: Option<i64>,
    pub is_active: bool,
}

/// Validate a generic status change requested through the transition engine.
///
/// `driver_assigned` needs a driver and is only reachable through assignment.
pub fn check_transition(snapshot: &OrderSnapshot, target: OrderStatus) -> Result<(), OrderError> {
    if !snapshot.is_active {
        return Err(OrderError::NotActive);
    }
    if target == OrderStatus::DriverAssigned {
        return Err(OrderError::validation(
            "driver_assigned can only be reached by assigning a driver",
        ));
    }
    if !snapshot.status.can_transition_to(target) {
        return Err(OrderError::InvalidTransition {
            from: snapshot.status,
            to: target,
        });
    }
    Ok(())
}

/// Validate a cancellation. Customers get a narrower window than staff.
pub fn check_cancellation(snapshot: &OrderSnapshot, by_customer: bool) -> Result<(), OrderError> {
    check_transition(snapshot, OrderStatus::Cancelled)?;
    if by_customer && !snapshot.status.customer_can_cancel() {
        return Err(OrderError::InvalidTransition {
            from: snapshot.status,
            to: OrderStatus::Cancelled,
        });
    }
    Ok(())
}

/// Check that an order is still editable (items, pricing).
pub fn check_editable(snapshot: &OrderSnapshot) -> Result<(), OrderError> {
    if !snapshot.is_active {
        return Err(OrderError::NotActive);
    }
    if snapshot.status != OrderStatus::Pending {
        return Err(OrderError::OrderLocked(snapshot.status));
    }
    Ok(())
}

/// Explain why a status compare-and-swap matched no row.
pub fn classify_cas_failure(snapshot: Option<OrderSnapshot>) -> OrderError {
    match snapshot {
        None => OrderError::NotFound,
        Some(s) if !s.is_active => OrderError::NotActive,
        Some(_) => OrderError::Conflict,
    }
}

/// Explain why the conditional assignment matched no row.
///
/// Priority: missing, soft-deleted, taken by a driver, wrong status.
pub fn classify_assignment_failure(snapshot: Option<OrderSnapshot>) -> OrderError {
    match snapshot {
        None => OrderError::NotFound,
        Some(s) if !s.is_active => OrderError::NotActive,
        Some(s) if s.driver_id.is_some() => OrderError::AlreadyAssigned,
        Some(s) if s.status != OrderStatus::Ready => OrderError::NotReady(s.status),
        // Row matched on re-read; the write lost a race that has since settled.
        Some(_) => OrderError::Conflict,
    }
}
