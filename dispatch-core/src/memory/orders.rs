//! OrderStore and HistoryLedger commands for [`MemoryProcessor`].

use std::cmp::Reverse;

use kanau::processor::Processor;

use super::{MemoryProcessor, paginate};
use crate::entities::order::{
    CreateOrderWithItems, DeactivateOrder, GetOrderById, GetOrderDetails, ListOrders,
    UpdateOrderDetails,
};
use crate::entities::order_item::{
    AddOrderItem, GetOrderItems, OrderItem, RemoveOrderItem, UpdateOrderItem,
};
use crate::entities::status_history::{ListHistoryByActor, ListHistoryByOrder, OrderStatusHistory};
use crate::entities::{Order, OrderDetails, OrderStatus, Page};
use crate::error::OrderError;
use crate::lifecycle::check_editable;
use crate::money::subtotal;

impl Processor<CreateOrderWithItems> for MemoryProcessor {
    type Output = OrderDetails;
    type Error = OrderError;
    async fn process(&self, cmd: CreateOrderWithItems) -> Result<OrderDetails, OrderError> {
        let amounts = cmd.amounts()?;
        let priced = cmd
            .items
            .into_iter()
            .map(|item| {
                let line_total = item.line_total()?;
                Ok((item, line_total))
            })
            .collect::<Result<Vec<_>, OrderError>>()?;
        let total_amount = amounts.total()?;
        let mut store = self.store.lock().await;
        let now = store.now();

        store.next_order_id += 1;
        let order = Order {
            id: store.next_order_id,
            customer_id: cmd.customer_id,
            restaurant_id: cmd.restaurant_id,
            restaurant_name: cmd.restaurant_name,
            delivery_address_id: cmd.delivery_address_id,
            driver_id: None,
            status: OrderStatus::Pending,
            subtotal_amount: amounts.subtotal,
            tax_amount: amounts.tax,
            delivery_fee: amounts.delivery_fee,
            discount_amount: amounts.discount,
            total_amount,
            placed_at: Some(now),
            confirmed_at: None,
            ready_at: None,
            delivered_at: None,
            cancelled_at: None,
            special_instructions: cmd.special_instructions,
            cancellation_reason: None,
            estimated_preparation_minutes: None,
            estimated_delivery_at: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        store.orders.insert(order.id, order.clone());

        let items = priced
            .into_iter()
            .map(|(item, line_total)| store.insert_item(order.id, item, line_total, now))
            .collect();

        Ok(OrderDetails {
            order,
            items,
            history: Vec::new(),
        })
    }
}

impl Processor<GetOrderById> for MemoryProcessor {
    type Output = Option<Order>;
    type Error = OrderError;
    async fn process(&self, query: GetOrderById) -> Result<Option<Order>, OrderError> {
        let store = self.store.lock().await;
        Ok(store.orders.get(&query.order_id).cloned())
    }
}

impl Processor<GetOrderDetails> for MemoryProcessor {
    type Output = Option<OrderDetails>;
    type Error = OrderError;
    async fn process(&self, query: GetOrderDetails) -> Result<Option<OrderDetails>, OrderError> {
        let store = self.store.lock().await;
        Ok(store.orders.get(&query.order_id).map(|order| OrderDetails {
            order: order.clone(),
            items: store.items_of(order.id),
            history: store.history_of(order.id),
        }))
    }
}

impl Processor<ListOrders> for MemoryProcessor {
    type Output = Page<Order>;
    type Error = OrderError;
    async fn process(&self, query: ListOrders) -> Result<Page<Order>, OrderError> {
        let store = self.store.lock().await;
        let mut matching: Vec<Order> = store
            .orders
            .values()
            .filter(|order| query.filter.matches(order))
            .cloned()
            .collect();
        matching.sort_by_key(|order| Reverse((order.created_at, order.id)));

        let total = i64::try_from(matching.len()).unwrap_or(i64::MAX);
        Ok(Page {
            items: paginate(matching, query.limit, query.offset),
            total,
        })
    }
}

impl Processor<UpdateOrderDetails> for MemoryProcessor {
    type Output = Order;
    type Error = OrderError;
    async fn process(&self, cmd: UpdateOrderDetails) -> Result<Order, OrderError> {
        let mut store = self.store.lock().await;
        let now = store.now();
        let order = store
            .orders
            .get_mut(&cmd.order_id)
            .ok_or(OrderError::NotFound)?;
        let (mut merged, _) = cmd.merge(order)?;
        merged.updated_at = now;
        *order = merged.clone();
        Ok(merged)
    }
}

impl Processor<DeactivateOrder> for MemoryProcessor {
    type Output = Order;
    type Error = OrderError;
    async fn process(&self, cmd: DeactivateOrder) -> Result<Order, OrderError> {
        let mut store = self.store.lock().await;
        let now = store.now();
        let order = store
            .orders
            .get_mut(&cmd.order_id)
            .ok_or(OrderError::NotFound)?;
        if !order.is_active {
            return Err(OrderError::NotActive);
        }
        order.is_active = false;
        order.updated_at = now;
        Ok(order.clone())
    }
}

impl Processor<GetOrderItems> for MemoryProcessor {
    type Output = Vec<OrderItem>;
    type Error = OrderError;
    async fn process(&self, query: GetOrderItems) -> Result<Vec<OrderItem>, OrderError> {
        let store = self.store.lock().await;
        if !store.orders.contains_key(&query.order_id) {
            return Err(OrderError::NotFound);
        }
        Ok(store.items_of(query.order_id))
    }
}

impl Processor<AddOrderItem> for MemoryProcessor {
    type Output = OrderItem;
    type Error = OrderError;
    async fn process(&self, cmd: AddOrderItem) -> Result<OrderItem, OrderError> {
        cmd.item.validate()?;
        let mut store = self.store.lock().await;
        let snapshot = store.snapshot(cmd.order_id).ok_or(OrderError::NotFound)?;
        check_editable(&snapshot)?;

        let line_total = cmd.item.line_total()?;
        let subtotal = subtotal(
            store
                .items_of(cmd.order_id)
                .iter()
                .map(|item| item.line_total)
                .chain([line_total]),
        )?;
        let amounts = store.amounts_with_subtotal(cmd.order_id, subtotal)?;

        let now = store.now();
        let item = store.insert_item(cmd.order_id, cmd.item, line_total, now);
        store.set_amounts(cmd.order_id, amounts, now)?;
        Ok(item)
    }
}

impl Processor<UpdateOrderItem> for MemoryProcessor {
    type Output = OrderItem;
    type Error = OrderError;
    async fn process(&self, cmd: UpdateOrderItem) -> Result<OrderItem, OrderError> {
        let mut store = self.store.lock().await;
        let snapshot = store.snapshot(cmd.order_id).ok_or(OrderError::NotFound)?;
        check_editable(&snapshot)?;

        let current = store
            .items
            .get(&cmd.item_id)
            .filter(|item| item.order_id == cmd.order_id)
            .cloned()
            .ok_or(OrderError::ItemNotFound)?;
        let merged = cmd.changes.apply(&current)?;
        let line_total = merged.line_total()?;
        let subtotal = subtotal(
            store
                .items_of(cmd.order_id)
                .iter()
                .filter(|item| item.id != cmd.item_id)
                .map(|item| item.line_total)
                .chain([line_total]),
        )?;
        let amounts = store.amounts_with_subtotal(cmd.order_id, subtotal)?;

        let now = store.now();
        let updated = OrderItem {
            line_total,
            name: merged.name,
            description: merged.description,
            unit_price: merged.unit_price,
            quantity: merged.quantity,
            customizations: merged.customizations,
            customization_surcharge: merged.customization_surcharge,
            updated_at: now,
            ..current
        };
        store.items.insert(updated.id, updated.clone());
        store.set_amounts(cmd.order_id, amounts, now)?;
        Ok(updated)
    }
}

impl Processor<RemoveOrderItem> for MemoryProcessor {
    type Output = ();
    type Error = OrderError;
    async fn process(&self, cmd: RemoveOrderItem) -> Result<(), OrderError> {
        let mut store = self.store.lock().await;
        let snapshot = store.snapshot(cmd.order_id).ok_or(OrderError::NotFound)?;
        check_editable(&snapshot)?;

        let items = store.items_of(cmd.order_id);
        if !items.iter().any(|item| item.id == cmd.item_id) {
            return Err(OrderError::ItemNotFound);
        }
        if items.len() <= 1 {
            return Err(OrderError::validation(
                "cannot remove the last item of an order",
            ));
        }
        let subtotal = subtotal(
            items
                .iter()
                .filter(|item| item.id != cmd.item_id)
                .map(|item| item.line_total),
        )?;
        let amounts = store.amounts_with_subtotal(cmd.order_id, subtotal)?;

        let now = store.now();
        store.items.remove(&cmd.item_id);
        store.set_amounts(cmd.order_id, amounts, now)?;
        Ok(())
    }
}

impl Processor<ListHistoryByOrder> for MemoryProcessor {
    type Output = Vec<OrderStatusHistory>;
    type Error = OrderError;
    async fn process(
        &self,
        query: ListHistoryByOrder,
    ) -> Result<Vec<OrderStatusHistory>, OrderError> {
        let store = self.store.lock().await;
        if !store.orders.contains_key(&query.order_id) {
            return Err(OrderError::NotFound);
        }
        Ok(store.history_of(query.order_id))
    }
}

impl Processor<ListHistoryByActor> for MemoryProcessor {
    type Output = Vec<OrderStatusHistory>;
    type Error = OrderError;
    async fn process(
        &self,
        query: ListHistoryByActor,
    ) -> Result<Vec<OrderStatusHistory>, OrderError> {
        let store = self.store.lock().await;
        let mut entries: Vec<OrderStatusHistory> = store
            .history
            .iter()
            .filter(|entry| entry.actor_id == Some(query.actor_id))
            .cloned()
            .collect();
        entries.sort_by_key(|entry| Reverse((entry.created_at, entry.id)));
        Ok(paginate(entries, query.limit, query.offset))
    }
}

