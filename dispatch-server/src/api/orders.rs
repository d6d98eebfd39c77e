//! Order handlers used by customers and restaurants.
//!
//! Mutations a customer makes (detail edits, item edits, cancellation) are
//! restricted to the caller's own orders. Status transitions are restaurant
//! actions; the gateway is trusted to have authorized those.
//!
//! # Endpoints
//!
//! - `POST  /orders`               – place an order with its items
//! - `GET   /orders`               – list orders (paginated, filterable)
//! - `GET   /orders/{id}`          – order with items and status history
//! - `PATCH /orders/{id}`          – change non-status fields
//! - `POST  /orders/{id}/status`   – move the order along its lifecycle
//! - `POST  /orders/{id}/cancel`   – cancel with a reason
//! - `GET   /orders/{id}/history`  – status history, oldest first

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use dispatch_core::entities::order::{
    CreateOrderWithItems, GetOrderById, GetOrderDetails, ListOrders, UpdateOrderDetails,
};
use dispatch_core::entities::status_history::ListHistoryByOrder;
use dispatch_core::entities::{NewOrderItem, Order, OrderFilter};
use dispatch_core::error::OrderError;
use dispatch_core::processors::{CancelOrder, TransitionOrderStatus};
use dispatch_sdk::objects::{
    CancelOrderRequest, CreateOrderItemRequest, CreateOrderRequest, HistoryEntryResponse,
    ListOrdersQuery, OrderDetailsResponse, OrderPage, OrderResponse, TransitionStatusRequest,
    UpdateOrderRequest, clamp_pagination,
};
use kanau::processor::Processor;
use rust_decimal::Decimal;

use super::extractors::Actor;
use super::{ApiError, details_to_response, from_unix, history_to_response, id_list};
use super::{items, order_to_response};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/{order_id}", get(get_order).patch(update_order))
        .route("/orders/{order_id}/status", post(transition_status))
        .route("/orders/{order_id}/cancel", post(cancel_order))
        .route("/orders/{order_id}/history", get(get_history))
        .merge(items::router())
}

pub(super) fn new_item(item: CreateOrderItemRequest) -> NewOrderItem {
    NewOrderItem {
        name: item.name,
        description: item.description,
        unit_price: item.unit_price,
        quantity: item.quantity,
        customizations: item
            .customizations
            .unwrap_or_else(|| serde_json::json!({})),
        customization_surcharge: item.customization_surcharge,
    }
}

/// Fail with 403 unless `customer_id` placed the order.
pub(super) fn ensure_owner(order: &Order, customer_id: i64) -> Result<(), ApiError> {
    if order.customer_id != customer_id {
        return Err(ApiError::Forbidden(format!(
            "order {} does not belong to customer {customer_id}",
            order.id
        )));
    }
    Ok(())
}

/// Load an order and check that the caller owns it. `customer_id` never
/// changes, so the check cannot go stale before the following write.
pub(super) async fn owned_order(
    state: &AppState,
    order_id: i64,
    customer_id: i64,
) -> Result<Order, ApiError> {
    let order = state
        .processor()
        .process(GetOrderById { order_id })
        .await?
        .ok_or(OrderError::NotFound)?;
    ensure_owner(&order, customer_id)?;
    Ok(order)
}

/// `POST /orders` — place a new order for the calling customer.
///
/// Tax and delivery fee come from the pricing config; orders below the
/// configured minimum are rejected.
async fn create_order(
    State(state): State<AppState>,
    Actor(customer_id): Actor,
    Json(body): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderDetailsResponse>), ApiError> {
    let mut cmd = CreateOrderWithItems {
        customer_id,
        restaurant_id: body.restaurant_id,
        restaurant_name: body.restaurant_name,
        delivery_address_id: body.delivery_address_id,
        special_instructions: body.special_instructions,
        tax_amount: Decimal::ZERO,
        delivery_fee: Decimal::ZERO,
        discount_amount: Decimal::ZERO,
        items: body.items.into_iter().map(new_item).collect(),
    };
    let subtotal = cmd.amounts()?.subtotal;
    let quote = state.config.pricing.read().await.quote(subtotal)?;
    cmd.tax_amount = quote.tax;
    cmd.delivery_fee = quote.delivery_fee;

    let details = state.processor().process(cmd).await?;
    Ok((StatusCode::CREATED, Json(details_to_response(&details))))
}

/// `GET /orders` — list active orders, newest first.
async fn list_orders(
    State(state): State<AppState>,
    _actor: Actor,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<OrderPage>, ApiError> {
    let (limit, offset) = clamp_pagination(query.limit, query.offset);
    let filter = OrderFilter {
        customer_id: query.customer_id,
        restaurant_ids: id_list(query.restaurant_ids.as_deref())?,
        driver_id: query.driver_id,
        status: query.status.map(Into::into),
        created_from: query.created_from.map(from_unix).transpose()?,
        created_to: query.created_to.map(from_unix).transpose()?,
    };

    let page = state
        .processor()
        .process(ListOrders {
            filter,
            limit,
            offset,
        })
        .await?;

    Ok(Json(OrderPage {
        orders: page.items.iter().map(order_to_response).collect(),
        total_count: page.total,
        limit,
        offset,
    }))
}

/// `GET /orders/{id}` — order with its items and status history.
///
/// Soft-deleted orders are still returned, with `is_active = false`.
async fn get_order(
    State(state): State<AppState>,
    _actor: Actor,
    Path(order_id): Path<i64>,
) -> Result<Json<OrderDetailsResponse>, ApiError> {
    let details = state
        .processor()
        .process(GetOrderDetails { order_id })
        .await?
        .ok_or(OrderError::NotFound)?;
    Ok(Json(details_to_response(&details)))
}

/// `PATCH /orders/{id}` — the owner changes the delivery address or
/// instructions. Charges are adjusted through `PATCH /admin/orders/{id}`.
async fn update_order(
    State(state): State<AppState>,
    Actor(customer_id): Actor,
    Path(order_id): Path<i64>,
    Json(body): Json<UpdateOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    if body.tax_amount.is_some() || body.delivery_fee.is_some() || body.discount_amount.is_some() {
        return Err(ApiError::Forbidden(
            "order charges can only be changed by an admin".to_string(),
        ));
    }
    owned_order(&state, order_id, customer_id).await?;

    let order = state
        .processor()
        .process(UpdateOrderDetails {
            order_id,
            delivery_address_id: body.delivery_address_id,
            tax_amount: None,
            delivery_fee: None,
            discount_amount: None,
            special_instructions: body.special_instructions,
        })
        .await?;
    Ok(Json(order_to_response(&order)))
}

/// `POST /orders/{id}/status` — apply one lifecycle transition.
async fn transition_status(
    State(state): State<AppState>,
    Actor(actor_id): Actor,
    Path(order_id): Path<i64>,
    Json(body): Json<TransitionStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .processor()
        .process(TransitionOrderStatus {
            order_id,
            target: body.status.into(),
            actor_id: Some(actor_id),
            notes: body.notes,
            estimated_preparation_minutes: body.estimated_preparation_minutes,
        })
        .await?;
    Ok(Json(order_to_response(&order)))
}

/// `POST /orders/{id}/cancel` — the owner cancels, up to `ready`. Staff
/// cancel through `/orders/{id}/status` with target `cancelled`.
async fn cancel_order(
    State(state): State<AppState>,
    Actor(actor_id): Actor,
    Path(order_id): Path<i64>,
    Json(body): Json<CancelOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    owned_order(&state, order_id, actor_id).await?;

    let order = state
        .processor()
        .process(CancelOrder {
            order_id,
            reason: body.reason,
            actor_id: Some(actor_id),
            by_customer: true,
        })
        .await?;
    tracing::info!(order_id, actor_id, "order cancelled by customer");
    Ok(Json(order_to_response(&order)))
}

/// `GET /orders/{id}/history`
async fn get_history(
    State(state): State<AppState>,
    _actor: Actor,
    Path(order_id): Path<i64>,
) -> Result<Json<Vec<HistoryEntryResponse>>, ApiError> {
    let history = state
        .processor()
        .process(ListHistoryByOrder { order_id })
        .await?;
    Ok(Json(history.iter().map(history_to_response).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_the_owner_passes() {
        let order = crate::api::tests::sample_order();
        assert!(ensure_owner(&order, 1).is_ok());
        let err = ensure_owner(&order, 2).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }
}
