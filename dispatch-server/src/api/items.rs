//! Line item edits by the customer who placed the order. Only possible while
//! the order is still `pending`; afterwards the order is locked and edits
//! fail with `order_locked`.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{patch, post},
};
use dispatch_core::entities::order_item::{
    AddOrderItem, OrderItemChanges, RemoveOrderItem, UpdateOrderItem,
};
use dispatch_sdk::objects::{CreateOrderItemRequest, OrderItemResponse, UpdateOrderItemRequest};
use kanau::processor::Processor;

use super::extractors::Actor;
use super::orders::{new_item, owned_order};
use super::{ApiError, item_to_response};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders/{order_id}/items", post(add_item))
        .route(
            "/orders/{order_id}/items/{item_id}",
            patch(update_item).delete(remove_item),
        )
}

/// `POST /orders/{id}/items`
async fn add_item(
    State(state): State<AppState>,
    Actor(customer_id): Actor,
    Path(order_id): Path<i64>,
    Json(body): Json<CreateOrderItemRequest>,
) -> Result<(StatusCode, Json<OrderItemResponse>), ApiError> {
    owned_order(&state, order_id, customer_id).await?;
    let item = state
        .processor()
        .process(AddOrderItem {
            order_id,
            item: new_item(body),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(item_to_response(&item))))
}

/// `PATCH /orders/{id}/items/{item_id}`
async fn update_item(
    State(state): State<AppState>,
    Actor(customer_id): Actor,
    Path((order_id, item_id)): Path<(i64, i64)>,
    Json(body): Json<UpdateOrderItemRequest>,
) -> Result<Json<OrderItemResponse>, ApiError> {
    owned_order(&state, order_id, customer_id).await?;
    let changes = OrderItemChanges {
        name: body.name,
        description: body.description,
        unit_price: body.unit_price,
        quantity: body.quantity,
        customizations: body.customizations,
        customization_surcharge: body.customization_surcharge,
    };
    let item = state
        .processor()
        .process(UpdateOrderItem {
            order_id,
            item_id,
            changes,
        })
        .await?;
    Ok(Json(item_to_response(&item)))
}

/// `DELETE /orders/{id}/items/{item_id}` — the last item cannot be removed.
async fn remove_item(
    State(state): State<AppState>,
    Actor(customer_id): Actor,
    Path((order_id, item_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    owned_order(&state, order_id, customer_id).await?;
    state
        .processor()
        .process(RemoveOrderItem { order_id, item_id })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
