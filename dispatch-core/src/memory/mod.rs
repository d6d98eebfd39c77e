//! In-process order store.
//!
//! Implements every order command against plain collections behind one
//! `tokio::sync::Mutex`. Each command runs its check and its write inside a
//! single critical section, which gives the same compare-and-swap outcomes
//! as the conditional `UPDATE`s of [`DatabaseProcessor`].
//!
//! [`DatabaseProcessor`]: crate::framework::DatabaseProcessor

mod orders;
mod workflow;

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::Mutex;

use crate::entities::order_item::{NewOrderItem, OrderItem};
use crate::entities::status_history::{NewHistoryEntry, OrderStatusHistory};
use crate::entities::{Order, utc_now};
use crate::error::OrderError;
use crate::lifecycle::{OrderSnapshot, Phase};
use crate::money::OrderAmounts;

/// Order processor backed by process memory. Cheap to clone; clones share
/// the same store.
#[derive(Debug, Clone, Default)]
pub struct MemoryProcessor {
    store: Arc<Mutex<MemoryStore>>,
}

impl MemoryProcessor {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Default)]
struct MemoryStore {
    orders: BTreeMap<i64, Order>,
    items: BTreeMap<i64, OrderItem>,
    history: Vec<OrderStatusHistory>,
    next_order_id: i64,
    next_item_id: i64,
    next_history_id: i64,
    clock: Option<time::PrimitiveDateTime>,
}

impl MemoryStore {
    /// Wall clock that never goes backwards.
    fn now(&mut self) -> time::PrimitiveDateTime {
        let now = match self.clock {
            Some(last) => utc_now().max(last),
            None => utc_now(),
        };
        self.clock = Some(now);
        now
    }

    fn snapshot(&self, order_id: i64) -> Option<OrderSnapshot> {
        self.orders.get(&order_id).map(Order::snapshot)
    }

    fn items_of(&self, order_id: i64) -> Vec<OrderItem> {
        self.items
            .values()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect()
    }

    fn history_of(&self, order_id: i64) -> Vec<OrderStatusHistory> {
        self.history
            .iter()
            .filter(|entry| entry.order_id == order_id)
            .cloned()
            .collect()
    }

    fn insert_item(
        &mut self,
        order_id: i64,
        item: NewOrderItem,
        line_total: Decimal,
        at: time::PrimitiveDateTime,
    ) -> OrderItem {
        self.next_item_id += 1;
        let stored = OrderItem {
            id: self.next_item_id,
            order_id,
            name: item.name,
            description: item.description,
            unit_price: item.unit_price,
            quantity: item.quantity,
            customizations: item.customizations,
            customization_surcharge: item.customization_surcharge,
            line_total,
            created_at: at,
            updated_at: at,
        };
        self.items.insert(stored.id, stored.clone());
        stored
    }

    fn append_history(
        &mut self,
        entry: NewHistoryEntry,
        at: time::PrimitiveDateTime,
    ) -> OrderStatusHistory {
        self.next_history_id += 1;
        let stored = OrderStatusHistory {
            id: self.next_history_id,
            order_id: entry.order_id,
            actor_id: entry.actor_id,
            from_status: entry.from_status,
            to_status: entry.to_status,
            notes: entry.notes,
            metadata: entry.metadata,
            created_at: at,
        };
        self.history.push(stored.clone());
        stored
    }

    /// Validate the order amounts for a prospective subtotal before any item
    /// is touched, so a rejected edit leaves the store unchanged.
    fn amounts_with_subtotal(
        &self,
        order_id: i64,
        subtotal: Decimal,
    ) -> Result<OrderAmounts, OrderError> {
        let order = self.orders.get(&order_id).ok_or(OrderError::NotFound)?;
        OrderAmounts::new(
            subtotal,
            order.tax_amount,
            order.delivery_fee,
            order.discount_amount,
        )
    }

    fn set_amounts(
        &mut self,
        order_id: i64,
        amounts: OrderAmounts,
        at: time::PrimitiveDateTime,
    ) -> Result<(), OrderError> {
        let order = self.orders.get_mut(&order_id).ok_or(OrderError::NotFound)?;
        order.subtotal_amount = amounts.subtotal;
        order.total_amount = amounts.total()?;
        order.updated_at = at;
        Ok(())
    }
}

/// Set a phase timestamp unless it was already stamped.
fn stamp_phase(order: &mut Order, phase: Phase, at: time::PrimitiveDateTime) {
    let slot = match phase {
        Phase::Placed => &mut order.placed_at,
        Phase::Confirmed => &mut order.confirmed_at,
        Phase::Ready => &mut order.ready_at,
        Phase::Delivered => &mut order.delivered_at,
        Phase::Cancelled => &mut order.cancelled_at,
    };
    slot.get_or_insert(at);
}

/// Apply `LIMIT`/`OFFSET` semantics to an already sorted sequence.
fn paginate<T>(items: impl IntoIterator<Item = T>, limit: i64, offset: i64) -> Vec<T> {
    let offset = usize::try_from(offset).unwrap_or(0);
    let limit = usize::try_from(limit).unwrap_or(0);
    items.into_iter().skip(offset).take(limit).collect()
}
