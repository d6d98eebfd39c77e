//! Driver handlers.
//!
//! # Endpoints
//!
//! - `GET  /driver/orders/available`   – unassigned orders, most ready first
//! - `POST /driver/orders/{id}/assign` – claim a ready order
//! - `POST /driver/orders/{id}/status` – progress an order this driver holds

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use dispatch_core::entities::order::GetOrderById;
use dispatch_core::error::OrderError;
use dispatch_core::processors::{AssignDriver, ListAvailableOrders, TransitionOrderStatus};
use dispatch_sdk::objects::driver::AvailableOrdersQuery;
use dispatch_sdk::objects::{OrderResponse, TransitionStatusRequest, clamp_pagination};
use kanau::processor::Processor;

use super::extractors::DriverActor;
use super::{ApiError, order_to_response};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/driver/orders/available", get(available_orders))
        .route("/driver/orders/{order_id}/assign", post(assign))
        .route("/driver/orders/{order_id}/status", post(transition_status))
}

/// `GET /driver/orders/available`
async fn available_orders(
    State(state): State<AppState>,
    _driver: DriverActor,
    Query(query): Query<AvailableOrdersQuery>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let (limit, offset) = clamp_pagination(query.limit, query.offset);
    let orders = state
        .processor()
        .process(ListAvailableOrders { limit, offset })
        .await?;
    Ok(Json(orders.iter().map(order_to_response).collect()))
}

/// `POST /driver/orders/{id}/assign`
///
/// Exactly one of any number of concurrent callers wins. The others get
/// `already_assigned`; a caller retrying after a timeout should check
/// whether the returned or current `driver_id` is its own.
async fn assign(
    State(state): State<AppState>,
    driver: DriverActor,
    Path(order_id): Path<i64>,
) -> Result<Json<OrderResponse>, ApiError> {
    let result = state
        .processor()
        .process(AssignDriver {
            order_id,
            driver_id: driver.driver_id,
            driver_user_id: driver.user_id,
        })
        .await;

    match result {
        Ok(order) => {
            tracing::info!(order_id, driver_id = driver.driver_id, "driver assigned");
            Ok(Json(order_to_response(&order)))
        }
        Err(OrderError::AlreadyAssigned) => {
            tracing::debug!(order_id, driver_id = driver.driver_id, "assignment lost");
            Err(OrderError::AlreadyAssigned.into())
        }
        Err(e) => Err(e.into()),
    }
}

/// `POST /driver/orders/{id}/status`
///
/// Same transition rules as `/orders/{id}/status`, restricted to orders
/// whose `driver_id` is the caller's.
async fn transition_status(
    State(state): State<AppState>,
    driver: DriverActor,
    Path(order_id): Path<i64>,
    Json(body): Json<TransitionStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let processor = state.processor();
    let current = processor
        .process(GetOrderById { order_id })
        .await?
        .ok_or(OrderError::NotFound)?;

    // driver_id never changes once set, so this check cannot go stale.
    if current.driver_id != Some(driver.driver_id) {
        return Err(ApiError::Forbidden(format!(
            "order {order_id} is not assigned to driver {}",
            driver.driver_id
        )));
    }

    let order = processor
        .process(TransitionOrderStatus {
            order_id,
            target: body.status.into(),
            actor_id: Some(driver.user_id),
            notes: body.notes,
            estimated_preparation_minutes: body.estimated_preparation_minutes,
        })
        .await?;
    Ok(Json(order_to_response(&order)))
}
