//! Admin API request and response types.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{OrderStatus, default_limit};

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Aggregate order statistics over active orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatsResponse {
    pub total_orders: i64,
    /// Count per status; every status is present, zero when unused.
    pub status_counts: BTreeMap<String, i64>,
    /// Sum of `total_amount` over delivered orders.
    pub total_revenue: Decimal,
    /// Mean `total_amount` over delivered orders, zero when there are none.
    pub average_order_value: Decimal,
}

impl OrderStatsResponse {
    pub fn count_for(&self, status: OrderStatus) -> i64 {
        self.status_counts
            .get(status.as_str())
            .copied()
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

/// Query parameters for order statistics.
///
/// `restaurant_ids` is comma separated; timestamps are unix seconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsQuery {
    pub restaurant_ids: Option<String>,
    pub customer_id: Option<i64>,
    pub created_from: Option<i64>,
    pub created_to: Option<i64>,
}

/// Query parameters for the CSV order export.
///
/// Same filters as the order listing, without pagination; the export is
/// capped at [`EXPORT_ROW_LIMIT`] rows, newest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportOrdersQuery {
    pub status: Option<OrderStatus>,
    pub restaurant_ids: Option<String>,
    pub customer_id: Option<i64>,
    pub driver_id: Option<i64>,
    pub created_from: Option<i64>,
    pub created_to: Option<i64>,
}

pub const EXPORT_ROW_LIMIT: i64 = 10_000;

/// Query parameters for history-by-actor review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorHistoryQuery {
    pub actor_id: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}
