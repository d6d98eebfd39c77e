//! Order workflow processors.
//!
//! Each submodule owns one part of the order workflow:
//!
//! - `status_engine`: enforces the state machine and records every transition
//! - `driver_matcher`: driver feed and race-safe self-assignment
//! - `order_stats`: read-only aggregation over active orders

pub mod driver_matcher;
pub mod order_stats;
pub mod status_engine;

pub use driver_matcher::{AssignDriver, ListAvailableOrders};
pub use order_stats::{GetOrderStats, OrderStats, StatsFilter};
pub use status_engine::{CancelOrder, TransitionOrderStatus};
