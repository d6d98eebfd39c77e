use kanau::processor::Processor;
use rust_decimal::Decimal;
use sqlx::{PgExecutor, Postgres, QueryBuilder};

use crate::entities::order_item::{self, NewOrderItem, OrderItem};
use crate::entities::status_history::{self, OrderStatusHistory};
use crate::entities::OrderStatus;
use crate::error::OrderError;
use crate::framework::DatabaseProcessor;
use crate::lifecycle::{OrderSnapshot, classify_cas_failure};
use crate::money::{OrderAmounts, subtotal};

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Order {
    pub id: i64,
    pub customer_id: i64,
    pub restaurant_id: i64,
    pub restaurant_name: String,
    pub delivery_address_id: Option<i64>,
    pub driver_id: Option<i64>,
    pub status: OrderStatus,
    pub subtotal_amount: Decimal,
    pub tax_amount: Decimal,
    pub delivery_fee: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
    pub placed_at: Option<time::PrimitiveDateTime>,
    pub confirmed_at: Option<time::PrimitiveDateTime>,
    pub ready_at: Option<time::PrimitiveDateTime>,
    pub delivered_at: Option<time::PrimitiveDateTime>,
    pub cancelled_at: Option<time::PrimitiveDateTime>,
    pub special_instructions: Option<String>,
    pub cancellation_reason: Option<String>,
    pub estimated_preparation_minutes: Option<i32>,
    pub estimated_delivery_at: Option<time::PrimitiveDateTime>,
    pub is_active: bool,
    pub created_at: time::PrimitiveDateTime,
    pub updated_at: time::PrimitiveDateTime,
}

impl Order {
    pub fn snapshot(&self) -> OrderSnapshot {
        OrderSnapshot {
            status: self.status,
            driver_id: self.driver_id,
            is_active: self.is_active,
        }
    }

    pub fn amounts(&self) -> OrderAmounts {
        OrderAmounts {
            subtotal: self.subtotal_amount,
            tax: self.tax_amount,
            delivery_fee: self.delivery_fee,
            discount: self.discount_amount,
        }
    }
}

/// An order together with its line items and, when requested, its history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub history: Vec<OrderStatusHistory>,
}

/// A page of results plus the number of rows matching the filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

/// Optional, combinable filters for order listings.
///
/// Inactive orders never match. An explicitly empty `restaurant_ids` matches
/// nothing. `created_from` is inclusive, `created_to` exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub customer_id: Option<i64>,
    pub restaurant_ids: Option<Vec<i64>>,
    pub driver_id: Option<i64>,
    pub status: Option<OrderStatus>,
    pub created_from: Option<time::PrimitiveDateTime>,
    pub created_to: Option<time::PrimitiveDateTime>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        order.is_active
            && self.customer_id.is_none_or(|id| order.customer_id == id)
            && self
                .restaurant_ids
                .as_ref()
                .is_none_or(|ids| ids.contains(&order.restaurant_id))
            && self.driver_id.is_none_or(|id| order.driver_id == Some(id))
            && self.status.is_none_or(|s| order.status == s)
            && self.created_from.is_none_or(|t| order.created_at >= t)
            && self.created_to.is_none_or(|t| order.created_at < t)
    }
}

/// Append `WHERE is_active` plus one predicate per present filter.
pub(crate) fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &OrderFilter) {
    qb.push(" WHERE is_active");
    if let Some(customer_id) = filter.customer_id {
        qb.push(" AND customer_id = ").push_bind(customer_id);
    }
    if let Some(ids) = &filter.restaurant_ids {
        qb.push(" AND restaurant_id = ANY(")
            .push_bind(ids.clone())
            .push(")");
    }
    if let Some(driver_id) = filter.driver_id {
        qb.push(" AND driver_id = ").push_bind(driver_id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(from) = filter.created_from {
        qb.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.created_to {
        qb.push(" AND created_at < ").push_bind(to);
    }
}

pub(crate) async fn fetch_order<'e, E: PgExecutor<'e>>(
    executor: E,
    order_id: i64,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(order_id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn fetch_snapshot<'e, E: PgExecutor<'e>>(
    executor: E,
    order_id: i64,
) -> Result<Option<OrderSnapshot>, sqlx::Error> {
    sqlx::query_as::<_, OrderSnapshot>(
        "SELECT status, driver_id, is_active FROM orders WHERE id = $1",
    )
    .bind(order_id)
    .fetch_optional(executor)
    .await
}

/// Same as [`fetch_snapshot`] but takes a row lock until the transaction ends.
pub(crate) async fn lock_snapshot(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    order_id: i64,
) -> Result<Option<OrderSnapshot>, sqlx::Error> {
    sqlx::query_as::<_, OrderSnapshot>(
        "SELECT status, driver_id, is_active FROM orders WHERE id = $1 FOR UPDATE",
    )
    .bind(order_id)
    .fetch_optional(&mut **tx)
    .await
}

// ---------------------------------------------------------------------------
// CreateOrderWithItems
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
/// Place a new `pending` order with its items in one transaction.
///
/// Line totals and the subtotal are computed here; tax, delivery fee and
/// discount are supplied by the caller (see `PricingConfig::quote`).
pub struct CreateOrderWithItems {
    pub customer_id: i64,
    pub restaurant_id: i64,
    pub restaurant_name: String,
    pub delivery_address_id: Option<i64>,
    pub special_instructions: Option<String>,
    pub tax_amount: Decimal,
    pub delivery_fee: Decimal,
    pub discount_amount: Decimal,
    pub items: Vec<NewOrderItem>,
}

impl CreateOrderWithItems {
    /// Validate the request and compute the order amounts.
    pub fn amounts(&self) -> Result<OrderAmounts, OrderError> {
        if self.restaurant_name.trim().is_empty() {
            return Err(OrderError::validation("restaurant name must not be empty"));
        }
        if self.items.is_empty() {
            return Err(OrderError::validation("an order needs at least one item"));
        }
        let line_totals = self
            .items
            .iter()
            .map(|item| {
                item.validate()?;
                item.line_total()
            })
            .collect::<Result<Vec<_>, _>>()?;
        OrderAmounts::new(
            subtotal(line_totals)?,
            self.tax_amount,
            self.delivery_fee,
            self.discount_amount,
        )
    }
}

impl Processor<CreateOrderWithItems> for DatabaseProcessor {
    type Output = OrderDetails;
    type Error = OrderError;
    #[tracing::instrument(skip_all, err, name = "SQL:CreateOrderWithItems")]
    async fn process(&self, cmd: CreateOrderWithItems) -> Result<OrderDetails, OrderError> {
        let amounts = cmd.amounts()?;
        let mut tx = self.pool.begin().await?;

        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (
                customer_id, restaurant_id, restaurant_name, delivery_address_id, status,
                subtotal_amount, tax_amount, delivery_fee, discount_amount, total_amount,
                special_instructions, placed_at
            )
            VALUES ($1, $2, $3, $4, 'pending', $5, $6, $7, $8, $9, $10, timezone('utc', now()))
            RETURNING *
            "#,
        )
        .bind(cmd.customer_id)
        .bind(cmd.restaurant_id)
        .bind(&cmd.restaurant_name)
        .bind(cmd.delivery_address_id)
        .bind(amounts.subtotal)
        .bind(amounts.tax)
        .bind(amounts.delivery_fee)
        .bind(amounts.discount)
        .bind(amounts.total()?)
        .bind(&cmd.special_instructions)
        .fetch_one(&mut *tx)
        .await?;

        let items = order_item::insert_items(&mut tx, order.id, &cmd.items).await?;
        tx.commit().await?;

        tracing::info!(
            order_id = order.id,
            customer_id = order.customer_id,
            total = %order.total_amount,
            "Order placed"
        );
        Ok(OrderDetails {
            order,
            items,
            history: Vec::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
/// Point read by id. Soft-deleted orders are still returned.
pub struct GetOrderById {
    pub order_id: i64,
}

impl Processor<GetOrderById> for DatabaseProcessor {
    type Output = Option<Order>;
    type Error = OrderError;
    #[tracing::instrument(skip_all, err, name = "SQL:GetOrderById")]
    async fn process(&self, query: GetOrderById) -> Result<Option<Order>, OrderError> {
        Ok(fetch_order(&self.pool, query.order_id).await?)
    }
}

#[derive(Debug, Clone, Copy)]
/// Order with its items and full status history.
pub struct GetOrderDetails {
    pub order_id: i64,
}

impl Processor<GetOrderDetails> for DatabaseProcessor {
    type Output = Option<OrderDetails>;
    type Error = OrderError;
    #[tracing::instrument(skip_all, err, name = "SQL:GetOrderDetails")]
    async fn process(&self, query: GetOrderDetails) -> Result<Option<OrderDetails>, OrderError> {
        let Some(order) = fetch_order(&self.pool, query.order_id).await? else {
            return Ok(None);
        };
        let items = order_item::fetch_items(&self.pool, order.id).await?;
        let history = status_history::fetch_by_order(&self.pool, order.id).await?;
        Ok(Some(OrderDetails {
            order,
            items,
            history,
        }))
    }
}

#[derive(Debug, Clone)]
/// Paginated listing, newest first (`created_at DESC, id DESC`).
pub struct ListOrders {
    pub filter: OrderFilter,
    pub limit: i64,
    pub offset: i64,
}

impl Processor<ListOrders> for DatabaseProcessor {
    type Output = Page<Order>;
    type Error = OrderError;
    #[tracing::instrument(skip_all, err, name = "SQL:ListOrders")]
    async fn process(&self, query: ListOrders) -> Result<Page<Order>, OrderError> {
        let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM orders");
        push_filters(&mut select, &query.filter);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(query.limit)
            .push(" OFFSET ")
            .push_bind(query.offset);
        let items = select
            .build_query_as::<Order>()
            .fetch_all(&self.pool)
            .await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders");
        push_filters(&mut count, &query.filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok(Page { items, total })
    }
}

// ---------------------------------------------------------------------------
// UpdateOrderDetails
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
/// Change the non-status fields of an order. `None` leaves a field unchanged.
///
/// The write is conditioned on the status and `updated_at` the order was read
/// at; any concurrent change makes it fail with [`OrderError::Conflict`].
pub struct UpdateOrderDetails {
    pub order_id: i64,
    pub delivery_address_id: Option<i64>,
    pub tax_amount: Option<Decimal>,
    pub delivery_fee: Option<Decimal>,
    pub discount_amount: Option<Decimal>,
    pub special_instructions: Option<String>,
}

impl UpdateOrderDetails {
    /// Merge the changes into `current` and validate the result.
    pub(crate) fn merge(&self, current: &Order) -> Result<(Order, OrderAmounts), OrderError> {
        if !current.is_active {
            return Err(OrderError::NotActive);
        }
        if current.status.is_terminal() {
            return Err(OrderError::OrderLocked(current.status));
        }
        let amounts = OrderAmounts::new(
            current.subtotal_amount,
            self.tax_amount.unwrap_or(current.tax_amount),
            self.delivery_fee.unwrap_or(current.delivery_fee),
            self.discount_amount.unwrap_or(current.discount_amount),
        )?;
        let mut merged = current.clone();
        merged.delivery_address_id = self.delivery_address_id.or(current.delivery_address_id);
        merged.special_instructions = self
            .special_instructions
            .clone()
            .or_else(|| current.special_instructions.clone());
        merged.tax_amount = amounts.tax;
        merged.delivery_fee = amounts.delivery_fee;
        merged.discount_amount = amounts.discount;
        merged.total_amount = amounts.total()?;
        Ok((merged, amounts))
    }
}

impl Processor<UpdateOrderDetails> for DatabaseProcessor {
    type Output = Order;
    type Error = OrderError;
    #[tracing::instrument(skip_all, err, name = "SQL:UpdateOrderDetails")]
    async fn process(&self, cmd: UpdateOrderDetails) -> Result<Order, OrderError> {
        let current = fetch_order(&self.pool, cmd.order_id)
            .await?
            .ok_or(OrderError::NotFound)?;
        let (merged, _) = cmd.merge(&current)?;

        let updated = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET delivery_address_id = $4,
                tax_amount = $5,
                delivery_fee = $6,
                discount_amount = $7,
                total_amount = $8,
                special_instructions = $9,
                updated_at = timezone('utc', now())
            WHERE id = $1 AND status = $2 AND updated_at = $3 AND is_active
            RETURNING *
            "#,
        )
        .bind(cmd.order_id)
        .bind(current.status)
        .bind(current.updated_at)
        .bind(merged.delivery_address_id)
        .bind(merged.tax_amount)
        .bind(merged.delivery_fee)
        .bind(merged.discount_amount)
        .bind(merged.total_amount)
        .bind(&merged.special_instructions)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(order) => Ok(order),
            None => Err(classify_cas_failure(
                fetch_snapshot(&self.pool, cmd.order_id).await?,
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// DeactivateOrder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
/// Soft-delete an order. Deactivated orders disappear from listings, the
/// driver feed and statistics, but remain readable by id.
pub struct DeactivateOrder {
    pub order_id: i64,
}

impl Processor<DeactivateOrder> for DatabaseProcessor {
    type Output = Order;
    type Error = OrderError;
    #[tracing::instrument(skip_all, err, name = "SQL:DeactivateOrder")]
    async fn process(&self, cmd: DeactivateOrder) -> Result<Order, OrderError> {
        let updated = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET is_active = FALSE, updated_at = timezone('utc', now())
            WHERE id = $1 AND is_active
            RETURNING *
            "#,
        )
        .bind(cmd.order_id)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(order) => {
                tracing::info!(order_id = order.id, "Order deactivated");
                Ok(order)
            }
            None => Err(classify_cas_failure(
                fetch_snapshot(&self.pool, cmd.order_id).await?,
            )),
        }
    }
}
