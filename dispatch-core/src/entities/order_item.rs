use kanau::processor::Processor;
use rust_decimal::Decimal;
use sqlx::{PgExecutor, Postgres, QueryBuilder};

use crate::entities::order::{fetch_order, fetch_snapshot, lock_snapshot};
use crate::entities::OrderStatus;
use crate::error::OrderError;
use crate::framework::DatabaseProcessor;
use crate::lifecycle::{OrderSnapshot, check_editable};
use crate::money::{OrderAmounts, check_amount, line_total};

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub customizations: serde_json::Value,
    /// Per-unit surcharge for the chosen customizations.
    pub customization_surcharge: Decimal,
    pub line_total: Decimal,
    pub created_at: time::PrimitiveDateTime,
    pub updated_at: time::PrimitiveDateTime,
}

/// Menu snapshot for a new line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub name: String,
    pub description: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub customizations: serde_json::Value,
    pub customization_surcharge: Decimal,
}

impl NewOrderItem {
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.name.trim().is_empty() {
            return Err(OrderError::validation("item name must not be empty"));
        }
        if self.quantity <= 0 {
            return Err(OrderError::validation(format!(
                "quantity of {} must be positive",
                self.name
            )));
        }
        check_amount(&format!("unit price of {}", self.name), self.unit_price)?;
        check_amount(
            &format!("customization surcharge of {}", self.name),
            self.customization_surcharge,
        )?;
        self.line_total().map(|_| ())
    }

    pub fn line_total(&self) -> Result<Decimal, OrderError> {
        line_total(self.unit_price, self.customization_surcharge, self.quantity)
    }
}

/// Partial change to a line item. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderItemChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub unit_price: Option<Decimal>,
    pub quantity: Option<i32>,
    pub customizations: Option<serde_json::Value>,
    pub customization_surcharge: Option<Decimal>,
}

impl OrderItemChanges {
    /// Apply to an existing item and validate the merged result.
    pub fn apply(&self, item: &OrderItem) -> Result<NewOrderItem, OrderError> {
        let merged = NewOrderItem {
            name: self.name.clone().unwrap_or_else(|| item.name.clone()),
            description: self
                .description
                .clone()
                .or_else(|| item.description.clone()),
            unit_price: self.unit_price.unwrap_or(item.unit_price),
            quantity: self.quantity.unwrap_or(item.quantity),
            customizations: self
                .customizations
                .clone()
                .unwrap_or_else(|| item.customizations.clone()),
            customization_surcharge: self
                .customization_surcharge
                .unwrap_or(item.customization_surcharge),
        };
        merged.validate()?;
        Ok(merged)
    }
}

pub(crate) async fn insert_items(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    order_id: i64,
    items: &[NewOrderItem],
) -> Result<Vec<OrderItem>, OrderError> {
    let rows = items
        .iter()
        .map(|item| Ok((item, item.line_total()?)))
        .collect::<Result<Vec<_>, OrderError>>()?;
    let mut query_builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO order_items \
         (order_id, name, description, unit_price, quantity, customizations, \
         customization_surcharge, line_total) ",
    );
    query_builder.push_values(rows, |mut b, (item, line_total)| {
        b.push_bind(order_id)
            .push_bind(item.name.clone())
            .push_bind(item.description.clone())
            .push_bind(item.unit_price)
            .push_bind(item.quantity)
            .push_bind(item.customizations.clone())
            .push_bind(item.customization_surcharge)
            .push_bind(line_total);
    });
    query_builder.push(" RETURNING *");

    let mut inserted = query_builder
        .build_query_as::<OrderItem>()
        .fetch_all(&mut **tx)
        .await?;
    inserted.sort_by_key(|item| item.id);
    Ok(inserted)
}

pub(crate) async fn fetch_items<'e, E: PgExecutor<'e>>(
    executor: E,
    order_id: i64,
) -> Result<Vec<OrderItem>, sqlx::Error> {
    sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(executor)
        .await
}

/// Lock the order row and check that its items may be edited.
async fn begin_item_edit(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    order_id: i64,
) -> Result<OrderSnapshot, OrderError> {
    let snapshot = lock_snapshot(tx, order_id)
        .await?
        .ok_or(OrderError::NotFound)?;
    check_editable(&snapshot)?;
    Ok(snapshot)
}

/// Recompute subtotal and total from the current items.
async fn recompute_totals(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    order_id: i64,
) -> Result<(), OrderError> {
    let subtotal = sqlx::query_scalar::<_, Decimal>(
        "SELECT COALESCE(SUM(line_total), 0) FROM order_items WHERE order_id = $1",
    )
    .bind(order_id)
    .fetch_one(&mut **tx)
    .await?;

    let order = fetch_order(&mut **tx, order_id)
        .await?
        .ok_or(OrderError::NotFound)?;
    let amounts = OrderAmounts::new(
        subtotal,
        order.tax_amount,
        order.delivery_fee,
        order.discount_amount,
    )?;

    let result = sqlx::query(
        r#"
        UPDATE orders
        SET subtotal_amount = $2, total_amount = $3, updated_at = timezone('utc', now())
        WHERE id = $1 AND status = $4 AND is_active
        "#,
    )
    .bind(order_id)
    .bind(amounts.subtotal)
    .bind(amounts.total()?)
    .bind(OrderStatus::Pending)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(OrderError::Conflict);
    }
    Ok(())
}

async fn fetch_item_in_order(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    order_id: i64,
    item_id: i64,
) -> Result<OrderItem, OrderError> {
    sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE id = $1 AND order_id = $2")
        .bind(item_id)
        .bind(order_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(OrderError::ItemNotFound)
}

#[derive(Debug, Clone, Copy)]
pub struct GetOrderItems {
    pub order_id: i64,
}

impl Processor<GetOrderItems> for DatabaseProcessor {
    type Output = Vec<OrderItem>;
    type Error = OrderError;
    #[tracing::instrument(skip_all, err, name = "SQL:GetOrderItems")]
    async fn process(&self, query: GetOrderItems) -> Result<Vec<OrderItem>, OrderError> {
        let items = fetch_items(&self.pool, query.order_id).await?;
        if items.is_empty() && fetch_snapshot(&self.pool, query.order_id).await?.is_none() {
            return Err(OrderError::NotFound);
        }
        Ok(items)
    }
}

#[derive(Debug, Clone)]
/// Add a line item to a pending order and recompute its totals.
pub struct AddOrderItem {
    pub order_id: i64,
    pub item: NewOrderItem,
}

impl Processor<AddOrderItem> for DatabaseProcessor {
    type Output = OrderItem;
    type Error = OrderError;
    #[tracing::instrument(skip_all, err, name = "SQL:AddOrderItem")]
    async fn process(&self, cmd: AddOrderItem) -> Result<OrderItem, OrderError> {
        cmd.item.validate()?;
        let mut tx = self.pool.begin().await?;
        begin_item_edit(&mut tx, cmd.order_id).await?;

        let mut inserted = insert_items(&mut tx, cmd.order_id, std::slice::from_ref(&cmd.item)).await?;
        recompute_totals(&mut tx, cmd.order_id).await?;
        tx.commit().await?;

        inserted.pop().ok_or(OrderError::Conflict)
    }
}

#[derive(Debug, Clone)]
pub struct UpdateOrderItem {
    pub order_id: i64,
    pub item_id: i64,
    pub changes: OrderItemChanges,
}

impl Processor<UpdateOrderItem> for DatabaseProcessor {
    type Output = OrderItem;
    type Error = OrderError;
    #[tracing::instrument(skip_all, err, name = "SQL:UpdateOrderItem")]
    async fn process(&self, cmd: UpdateOrderItem) -> Result<OrderItem, OrderError> {
        let mut tx = self.pool.begin().await?;
        begin_item_edit(&mut tx, cmd.order_id).await?;

        let current = fetch_item_in_order(&mut tx, cmd.order_id, cmd.item_id).await?;
        let merged = cmd.changes.apply(&current)?;
        let line_total = merged.line_total()?;

        let updated = sqlx::query_as::<_, OrderItem>(
            r#"
            UPDATE order_items
            SET name = $2,
                description = $3,
                unit_price = $4,
                quantity = $5,
                customizations = $6,
                customization_surcharge = $7,
                line_total = $8,
                updated_at = timezone('utc', now())
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(cmd.item_id)
        .bind(&merged.name)
        .bind(&merged.description)
        .bind(merged.unit_price)
        .bind(merged.quantity)
        .bind(&merged.customizations)
        .bind(merged.customization_surcharge)
        .bind(line_total)
        .fetch_one(&mut *tx)
        .await?;

        recompute_totals(&mut tx, cmd.order_id).await?;
        tx.commit().await?;
        Ok(updated)
    }
}

#[derive(Debug, Clone, Copy)]
/// Remove a line item. An order must keep at least one item.
pub struct RemoveOrderItem {
    pub order_id: i64,
    pub item_id: i64,
}

impl Processor<RemoveOrderItem> for DatabaseProcessor {
    type Output = ();
    type Error = OrderError;
    #[tracing::instrument(skip_all, err, name = "SQL:RemoveOrderItem")]
    async fn process(&self, cmd: RemoveOrderItem) -> Result<(), OrderError> {
        let mut tx = self.pool.begin().await?;
        begin_item_edit(&mut tx, cmd.order_id).await?;

        fetch_item_in_order(&mut tx, cmd.order_id, cmd.item_id).await?;
        let remaining = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM order_items WHERE order_id = $1",
        )
        .bind(cmd.order_id)
        .fetch_one(&mut *tx)
        .await?;
        if remaining <= 1 {
            return Err(OrderError::validation(
                "cannot remove the last item of an order",
            ));
        }

        sqlx::query("DELETE FROM order_items WHERE id = $1")
            .bind(cmd.item_id)
            .execute(&mut *tx)
            .await?;
        recompute_totals(&mut tx, cmd.order_id).await?;
        tx.commit().await?;
        Ok(())
    }
}
