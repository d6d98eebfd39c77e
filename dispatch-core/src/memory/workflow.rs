//! Status transitions, driver matching and statistics for [`MemoryProcessor`].

use std::collections::BTreeMap;

use kanau::processor::Processor;
use rust_decimal::Decimal;

use super::{MemoryProcessor, MemoryStore, paginate, stamp_phase};
use crate::entities::order::OrderFilter;
use crate::entities::{Order, OrderStatus};
use crate::error::OrderError;
use crate::lifecycle::{
    check_cancellation, check_transition, classify_assignment_failure, classify_cas_failure,
};
use crate::processors::order_stats::StatusGroup;
use crate::processors::status_engine::{DELIVERY_ALLOWANCE_MINUTES, StatusChange};
use crate::processors::{
    AssignDriver, CancelOrder, GetOrderStats, ListAvailableOrders, OrderStats,
    TransitionOrderStatus,
};

impl MemoryStore {
    fn apply_change(&mut self, change: StatusChange) -> Result<Order, OrderError> {
        let now = self.now();
        let entry = change.history_entry();
        let order = match self.orders.get_mut(&change.order_id) {
            Some(order) if order.is_active && order.status == change.from => order,
            other => return Err(classify_cas_failure(other.map(|o| o.snapshot()))),
        };

        order.status = change.to;
        if let Some(phase) = change.to.phase() {
            stamp_phase(order, phase, now);
        }
        if let Some(reason) = change.cancellation_reason {
            order.cancellation_reason = Some(reason);
        }
        if let Some(minutes) = change.estimated_preparation_minutes {
            order.estimated_preparation_minutes = Some(minutes);
            order.estimated_delivery_at = Some(
                now + time::Duration::minutes(i64::from(minutes + DELIVERY_ALLOWANCE_MINUTES)),
            );
        }
        order.updated_at = now;
        let updated = order.clone();

        self.append_history(entry, now);
        Ok(updated)
    }
}

impl Processor<TransitionOrderStatus> for MemoryProcessor {
    type Output = Order;
    type Error = OrderError;
    async fn process(&self, cmd: TransitionOrderStatus) -> Result<Order, OrderError> {
        cmd.validate()?;
        let mut store = self.store.lock().await;
        let snapshot = store.snapshot(cmd.order_id).ok_or(OrderError::NotFound)?;
        check_transition(&snapshot, cmd.target)?;
        store.apply_change(cmd.into_change(snapshot.status))
    }
}

impl Processor<CancelOrder> for MemoryProcessor {
    type Output = Order;
    type Error = OrderError;
    async fn process(&self, cmd: CancelOrder) -> Result<Order, OrderError> {
        cmd.validate()?;
        let mut store = self.store.lock().await;
        let snapshot = store.snapshot(cmd.order_id).ok_or(OrderError::NotFound)?;
        check_cancellation(&snapshot, cmd.by_customer)?;
        store.apply_change(cmd.into_change(snapshot.status))
    }
}

impl Processor<ListAvailableOrders> for MemoryProcessor {
    type Output = Vec<Order>;
    type Error = OrderError;
    async fn process(&self, query: ListAvailableOrders) -> Result<Vec<Order>, OrderError> {
        let store = self.store.lock().await;
        let mut available: Vec<(i32, &Order)> = store
            .orders
            .values()
            .filter(|order| order.is_active && order.driver_id.is_none())
            .filter_map(|order| order.status.availability_tier().map(|tier| (tier, order)))
            .collect();
        available.sort_by_key(|(tier, order)| (*tier, order.created_at, order.id));

        Ok(paginate(
            available.into_iter().map(|(_, order)| order.clone()),
            query.limit,
            query.offset,
        ))
    }
}

impl Processor<AssignDriver> for MemoryProcessor {
    type Output = Order;
    type Error = OrderError;
    async fn process(&self, cmd: AssignDriver) -> Result<Order, OrderError> {
        let mut store = self.store.lock().await;
        let now = store.now();
        let order = match store.orders.get_mut(&cmd.order_id) {
            Some(order)
                if order.is_active
                    && order.status == OrderStatus::Ready
                    && order.driver_id.is_none() =>
            {
                order
            }
            other => return Err(classify_assignment_failure(other.map(|o| o.snapshot()))),
        };

        order.driver_id = Some(cmd.driver_id);
        order.status = OrderStatus::DriverAssigned;
        order.updated_at = now;
        let updated = order.clone();

        store.append_history(cmd.history_entry(), now);
        Ok(updated)
    }
}

impl Processor<GetOrderStats> for MemoryProcessor {
    type Output = OrderStats;
    type Error = OrderError;
    async fn process(&self, query: GetOrderStats) -> Result<OrderStats, OrderError> {
        let filter = OrderFilter::from(&query.filter);
        let store = self.store.lock().await;

        let mut groups: BTreeMap<OrderStatus, StatusGroup> = BTreeMap::new();
        for order in store.orders.values().filter(|order| filter.matches(order)) {
            let group = groups.entry(order.status).or_insert(StatusGroup {
                status: order.status,
                order_count: 0,
                revenue: Decimal::ZERO,
            });
            group.order_count += 1;
            group.revenue += order.total_amount;
        }
        Ok(OrderStats::from_groups(groups.into_values()))
    }
}
