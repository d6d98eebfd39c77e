//! Admin API handlers.
//!
//! These endpoints require the `Dispatch-Admin-Authorization` header with
//! the plaintext admin secret.
//!
//! # Endpoints
//!
//! - `GET   /admin/stats`                  – order counts and delivered revenue
//! - `GET   /admin/history?actor_id=`      – status changes made by one actor
//! - `GET   /admin/orders/export`          – filtered orders as a CSV download
//! - `PATCH /admin/orders/{id}`            – adjust charges, address, instructions
//! - `POST  /admin/orders/{id}/deactivate` – soft-delete an order

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::{get, patch, post},
};
use dispatch_core::entities::order::{DeactivateOrder, ListOrders, UpdateOrderDetails};
use dispatch_core::entities::status_history::ListHistoryByActor;
use dispatch_core::entities::{Order, OrderFilter};
use dispatch_core::processors::{GetOrderStats, OrderStats, StatsFilter};
use dispatch_sdk::objects::admin::{
    ActorHistoryQuery, EXPORT_ROW_LIMIT, ExportOrdersQuery, OrderStatsResponse, StatsQuery,
};
use dispatch_sdk::objects::{
    HistoryEntryResponse, OrderResponse, UpdateOrderRequest, clamp_pagination,
};
use kanau::processor::Processor;
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, PrimitiveDateTime};

use super::extractors::AdminAuth;
use super::{ApiError, from_unix, history_to_response, id_list, order_to_response};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/stats", get(stats))
        .route("/admin/history", get(history_by_actor))
        .route("/admin/orders/export", get(export_orders))
        .route("/admin/orders/{order_id}", patch(update_order))
        .route("/admin/orders/{order_id}/deactivate", post(deactivate))
}

fn stats_to_response(stats: &OrderStats) -> OrderStatsResponse {
    OrderStatsResponse {
        total_orders: stats.total_orders,
        status_counts: stats
            .status_counts
            .iter()
            .map(|(status, count)| (status.as_str().to_string(), *count))
            .collect(),
        total_revenue: stats.delivered_revenue,
        average_order_value: stats.average_delivered_value,
    }
}

/// `GET /admin/stats` — aggregates over active orders matching the filter.
async fn stats(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Query(query): Query<StatsQuery>,
) -> Result<Json<OrderStatsResponse>, ApiError> {
    let filter = StatsFilter {
        restaurant_ids: id_list(query.restaurant_ids.as_deref())?,
        customer_id: query.customer_id,
        created_from: query.created_from.map(from_unix).transpose()?,
        created_to: query.created_to.map(from_unix).transpose()?,
    };
    let stats = state.processor().process(GetOrderStats { filter }).await?;
    Ok(Json(stats_to_response(&stats)))
}

/// `GET /admin/history` — newest first.
async fn history_by_actor(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Query(query): Query<ActorHistoryQuery>,
) -> Result<Json<Vec<HistoryEntryResponse>>, ApiError> {
    let (limit, offset) = clamp_pagination(query.limit, query.offset);
    let entries = state
        .processor()
        .process(ListHistoryByActor {
            actor_id: query.actor_id,
            limit,
            offset,
        })
        .await?;
    Ok(Json(entries.iter().map(history_to_response).collect()))
}

/// `POST /admin/orders/{id}/deactivate`
///
/// The order disappears from listings, the driver feed and statistics but
/// stays readable by id. Deactivating twice fails with `not_active`.
async fn deactivate(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(order_id): Path<i64>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .processor()
        .process(DeactivateOrder { order_id })
        .await?;
    tracing::info!(order_id, "order deactivated by admin");
    Ok(Json(order_to_response(&order)))
}

/// `PATCH /admin/orders/{id}` — same rules as the customer edit, but charges
/// may be adjusted too. The total is recomputed from the merged amounts.
async fn update_order(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(order_id): Path<i64>,
    Json(body): Json<UpdateOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .processor()
        .process(UpdateOrderDetails {
            order_id,
            delivery_address_id: body.delivery_address_id,
            tax_amount: body.tax_amount,
            delivery_fee: body.delivery_fee,
            discount_amount: body.discount_amount,
            special_instructions: body.special_instructions,
        })
        .await?;
    tracing::info!(order_id, total = %order.total_amount, "order updated by admin");
    Ok(Json(order_to_response(&order)))
}

const EXPORT_COLUMNS: [&str; 13] = [
    "Order ID",
    "Customer ID",
    "Restaurant ID",
    "Status",
    "Subtotal",
    "Tax",
    "Delivery Fee",
    "Discount",
    "Total Amount",
    "Placed At",
    "Estimated Delivery At",
    "Delivered At",
    "Created At",
];

fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_timestamp(at: Option<PrimitiveDateTime>) -> String {
    at.map(|t| {
        let t = t.assume_utc();
        t.format(&Rfc3339).unwrap_or_else(|_| t.to_string())
    })
    .unwrap_or_default()
}

/// Header row plus one line per order, `\n` terminated.
fn render_orders_csv(orders: &[Order]) -> String {
    let mut out = EXPORT_COLUMNS.join(",");
    out.push('\n');
    for o in orders {
        let fields = [
            o.id.to_string(),
            o.customer_id.to_string(),
            o.restaurant_id.to_string(),
            o.status.as_str().to_string(),
            o.subtotal_amount.to_string(),
            o.tax_amount.to_string(),
            o.delivery_fee.to_string(),
            o.discount_amount.to_string(),
            o.total_amount.to_string(),
            csv_timestamp(o.placed_at),
            csv_timestamp(o.estimated_delivery_at),
            csv_timestamp(o.delivered_at),
            csv_timestamp(Some(o.created_at)),
        ];
        let line: Vec<String> = fields.iter().map(|f| escape_field(f)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

/// `GET /admin/orders/export` — active orders matching the filter, newest
/// first, at most [`EXPORT_ROW_LIMIT`] rows.
async fn export_orders(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Query(query): Query<ExportOrdersQuery>,
) -> Result<impl IntoResponse, ApiError> {
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
            limit: EXPORT_ROW_LIMIT,
            offset: 0,
        })
        .await?;
    if page.total > EXPORT_ROW_LIMIT {
        tracing::warn!(matched = page.total, exported = EXPORT_ROW_LIMIT, "order export truncated");
    }

    let filename = format!(
        "orders_export_{}.csv",
        OffsetDateTime::now_utc().unix_timestamp()
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        render_orders_csv(&page.items),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_core::entities::OrderStatus;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    #[test]
    fn test_stats_response_uses_wire_names() {
        let stats = OrderStats {
            total_orders: 3,
            status_counts: BTreeMap::from_iter(
                OrderStatus::ALL
                    .into_iter()
                    .map(|s| (s, i64::from(s == OrderStatus::Delivered) * 2)),
            ),
            delivered_revenue: dec!(49.20),
            average_delivered_value: dec!(24.60),
        };
        let response = stats_to_response(&stats);
        assert_eq!(response.status_counts.len(), 9);
        assert_eq!(
            response.count_for(dispatch_sdk::objects::OrderStatus::Delivered),
            2
        );
        assert_eq!(response.status_counts["driver_assigned"], 0);
        assert_eq!(response.total_revenue, dec!(49.20));
        assert_eq!(response.average_order_value, dec!(24.60));
    }

    #[test]
    fn test_escape_field_quotes_only_when_needed() {
        assert_eq!(escape_field("pending"), "pending");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_render_orders_csv() {
        let mut open = crate::api::tests::sample_order();
        open.id = 6;
        open.status = OrderStatus::Pending;
        open.placed_at = None;
        open.delivered_at = None;
        open.estimated_delivery_at = None;

        let csv = render_orders_csv(&[crate::api::tests::sample_order(), open]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "Order ID,Customer ID,Restaurant ID,Status,Subtotal,Tax,Delivery Fee,Discount,\
             Total Amount,Placed At,Estimated Delivery At,Delivered At,Created At"
        );
        assert_eq!(
            lines[1],
            "5,1,10,delivered,20.00,1.60,3.00,0.00,24.60,2023-11-14T22:13:20Z,\
             2023-11-14T22:58:20Z,2023-11-14T23:13:20Z,2023-11-14T22:13:20Z"
        );
        assert_eq!(
            lines[2],
            "6,1,10,pending,20.00,1.60,3.00,0.00,24.60,,,,2023-11-14T22:13:20Z"
        );
        assert!(csv.ends_with('\n'));
    }

    #[test]
    fn test_render_empty_export_has_header_only() {
        let csv = render_orders_csv(&[]);
        assert_eq!(csv.lines().count(), 1);
        assert!(csv.starts_with("Order ID,"));
    }
}
