//! Domain errors shared by every order command.

use crate::entities::OrderStatus;

/// Outcome of a failed order command.
///
/// Everything except [`OrderError::Database`] is an expected business outcome
/// that callers should surface as-is rather than retry.
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("order not found")]
    NotFound,

    #[error("order item not found")]
    ItemNotFound,

    /// The order has been soft-deleted.
    #[error("order is no longer active")]
    NotActive,

    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Another driver already holds the order.
    #[error("order already has a driver assigned")]
    AlreadyAssigned,

    #[error("order is not ready for pickup (current status: {0})")]
    NotReady(OrderStatus),

    /// A concurrent writer changed the order between read and write.
    #[error("order was modified concurrently")]
    Conflict,

    /// Items can only be edited while the order is pending.
    #[error("order can no longer be edited (current status: {0})")]
    OrderLocked(OrderStatus),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl OrderError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Stable machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            OrderError::NotFound => "not_found",
            OrderError::ItemNotFound => "item_not_found",
            OrderError::NotActive => "not_active",
            OrderError::InvalidTransition { .. } => "invalid_transition",
            OrderError::AlreadyAssigned => "already_assigned",
            OrderError::NotReady(_) => "not_ready",
            OrderError::Conflict => "conflict",
            OrderError::OrderLocked(_) => "order_locked",
            OrderError::Validation(_) => "validation_error",
            OrderError::Database(_) => "internal_error",
        }
    }
}
