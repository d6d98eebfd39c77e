//! StatsAggregator: counts and delivered revenue over active orders.

use std::collections::BTreeMap;

use kanau::processor::Processor;
use rust_decimal::Decimal;
use sqlx::{Postgres, QueryBuilder};

use crate::entities::order::{OrderFilter, push_filters};
use crate::entities::OrderStatus;
use crate::error::OrderError;
use crate::framework::DatabaseProcessor;
use crate::money::round_cents;

/// Filters for statistics. All optional; an empty `restaurant_ids` matches
/// nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsFilter {
    pub restaurant_ids: Option<Vec<i64>>,
    pub customer_id: Option<i64>,
    pub created_from: Option<time::PrimitiveDateTime>,
    pub created_to: Option<time::PrimitiveDateTime>,
}

impl From<&StatsFilter> for OrderFilter {
    fn from(value: &StatsFilter) -> Self {
        OrderFilter {
            customer_id: value.customer_id,
            restaurant_ids: value.restaurant_ids.clone(),
            driver_id: None,
            status: None,
            created_from: value.created_from,
            created_to: value.created_to,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderStats {
    pub total_orders: i64,
    /// Every status is present, zero when no order has it.
    pub status_counts: BTreeMap<OrderStatus, i64>,
    /// Sum of `total_amount` over delivered orders.
    pub delivered_revenue: Decimal,
    /// Mean delivered order value, rounded to cents; zero when none.
    pub average_delivered_value: Decimal,
}

/// Per-status aggregate row.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub(crate) struct StatusGroup {
    pub status: OrderStatus,
    pub order_count: i64,
    pub revenue: Decimal,
}

impl OrderStats {
    pub(crate) fn from_groups(groups: impl IntoIterator<Item = StatusGroup>) -> Self {
        let mut status_counts: BTreeMap<OrderStatus, i64> =
            OrderStatus::ALL.into_iter().map(|s| (s, 0)).collect();
        let mut delivered_revenue = Decimal::ZERO;

        for group in groups {
            *status_counts.entry(group.status).or_default() += group.order_count;
            if group.status == OrderStatus::Delivered {
                delivered_revenue += group.revenue;
            }
        }

        let total_orders = status_counts.values().sum();
        let delivered = status_counts
            .get(&OrderStatus::Delivered)
            .copied()
            .unwrap_or_default();
        let average_delivered_value = if delivered > 0 {
            round_cents(delivered_revenue / Decimal::from(delivered))
        } else {
            Decimal::ZERO
        };

        Self {
            total_orders,
            status_counts,
            delivered_revenue,
            average_delivered_value,
        }
    }

    pub fn count(&self, status: OrderStatus) -> i64 {
        self.status_counts.get(&status).copied().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct GetOrderStats {
    pub filter: StatsFilter,
}

impl Processor<GetOrderStats> for DatabaseProcessor {
    type Output = OrderStats;
    type Error = OrderError;
    #[tracing::instrument(skip_all, err, name = "SQL:GetOrderStats")]
    async fn process(&self, query: GetOrderStats) -> Result<OrderStats, OrderError> {
        let filter = OrderFilter::from(&query.filter);
        let mut query_builder = QueryBuilder::<Postgres>::new(
            "SELECT status, COUNT(*) AS order_count, \
             COALESCE(SUM(total_amount), 0) AS revenue FROM orders",
        );
        push_filters(&mut query_builder, &filter);
        query_builder.push(" GROUP BY status");

        let groups = query_builder
            .build_query_as::<StatusGroup>()
            .fetch_all(&self.pool)
            .await?;
        Ok(OrderStats::from_groups(groups))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_stats_are_zero_filled() {
        let stats = OrderStats::from_groups(Vec::new());
        assert_eq!(stats.total_orders, 0);
        assert_eq!(stats.status_counts.len(), OrderStatus::ALL.len());
        assert!(stats.status_counts.values().all(|c| *c == 0));
        assert_eq!(stats.delivered_revenue, Decimal::ZERO);
        assert_eq!(stats.average_delivered_value, Decimal::ZERO);
    }

    #[test]
    fn test_only_delivered_orders_count_as_revenue() {
        let stats = OrderStats::from_groups(vec![
            StatusGroup {
                status: OrderStatus::Delivered,
                order_count: 3,
                revenue: dec!(100.00),
            },
            StatusGroup {
                status: OrderStatus::Cancelled,
                order_count: 2,
                revenue: dec!(40.00),
            },
            StatusGroup {
                status: OrderStatus::Pending,
                order_count: 1,
                revenue: dec!(12.00),
            },
        ]);
        assert_eq!(stats.total_orders, 6);
        assert_eq!(stats.count(OrderStatus::Delivered), 3);
        assert_eq!(stats.count(OrderStatus::Ready), 0);
        assert_eq!(stats.delivered_revenue, dec!(100.00));
        assert_eq!(stats.average_delivered_value, dec!(33.33));
    }
}
