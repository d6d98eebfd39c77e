//! HTTP API, nested under `/api/v1`.
//!
//! # Endpoints
//!
//! - `/orders/...`        – customer and restaurant order operations
//! - `/driver/orders/...` – available-order feed, assignment, delivery progress
//! - `/admin/...`         – statistics, audit review, soft delete

use axum::Router;
use dispatch_core::entities::{Order, OrderDetails, OrderItem, OrderStatusHistory};
use dispatch_sdk::objects::{
    HistoryEntryResponse, OrderDetailsResponse, OrderItemResponse, OrderResponse,
};
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::state::AppState;

mod admin;
mod driver;
pub(crate) mod error;
pub(crate) mod extractors;
mod items;
mod orders;

pub use error::ApiError;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(orders::router())
        .merge(driver::router())
        .merge(admin::router())
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

fn unix(t: PrimitiveDateTime) -> i64 {
    t.assume_utc().unix_timestamp()
}

/// Unix seconds from a query string into the naive UTC timestamps stored in
/// the database.
pub(crate) fn from_unix(secs: i64) -> Result<PrimitiveDateTime, ApiError> {
    let at = OffsetDateTime::from_unix_timestamp(secs)
        .map_err(|_| ApiError::validation(format!("timestamp {secs} is out of range")))?
        .to_offset(UtcOffset::UTC);
    Ok(PrimitiveDateTime::new(at.date(), at.time()))
}

pub(crate) fn order_to_response(o: &Order) -> OrderResponse {
    OrderResponse {
        id: o.id,
        customer_id: o.customer_id,
        restaurant_id: o.restaurant_id,
        restaurant_name: o.restaurant_name.clone(),
        delivery_address_id: o.delivery_address_id,
        driver_id: o.driver_id,
        status: o.status.into(),
        subtotal_amount: o.subtotal_amount,
        tax_amount: o.tax_amount,
        delivery_fee: o.delivery_fee,
        discount_amount: o.discount_amount,
        total_amount: o.total_amount,
        placed_at: o.placed_at.map(unix),
        confirmed_at: o.confirmed_at.map(unix),
        ready_at: o.ready_at.map(unix),
        delivered_at: o.delivered_at.map(unix),
        cancelled_at: o.cancelled_at.map(unix),
        special_instructions: o.special_instructions.clone(),
        cancellation_reason: o.cancellation_reason.clone(),
        estimated_preparation_minutes: o.estimated_preparation_minutes,
        estimated_delivery_at: o.estimated_delivery_at.map(unix),
        is_active: o.is_active,
        created_at: unix(o.created_at),
        updated_at: unix(o.updated_at),
    }
}

pub(crate) fn item_to_response(i: &OrderItem) -> OrderItemResponse {
    OrderItemResponse {
        id: i.id,
        order_id: i.order_id,
        name: i.name.clone(),
        description: i.description.clone(),
        unit_price: i.unit_price,
        quantity: i.quantity,
        customizations: i.customizations.clone(),
        customization_surcharge: i.customization_surcharge,
        line_total: i.line_total,
    }
}

pub(crate) fn history_to_response(h: &OrderStatusHistory) -> HistoryEntryResponse {
    HistoryEntryResponse {
        id: h.id,
        order_id: h.order_id,
        actor_id: h.actor_id,
        from_status: h.from_status.into(),
        to_status: h.to_status.into(),
        notes: h.notes.clone(),
        metadata: h.metadata.clone(),
        created_at: unix(h.created_at),
    }
}

pub(crate) fn details_to_response(d: &OrderDetails) -> OrderDetailsResponse {
    OrderDetailsResponse {
        order: order_to_response(&d.order),
        items: d.items.iter().map(item_to_response).collect(),
        status_history: d.history.iter().map(history_to_response).collect(),
    }
}

/// Parse an optional comma separated id list from a query string.
pub(crate) fn id_list(raw: Option<&str>) -> Result<Option<Vec<i64>>, ApiError> {
    raw.map(|raw| {
        dispatch_sdk::objects::parse_id_list(raw)
            .map_err(|_| ApiError::validation(format!("invalid id list {raw:?}")))
    })
    .transpose()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use dispatch_core::entities::OrderStatus;
    use rust_decimal_macros::dec;

    /// A delivered order at 24.60 placed by customer 1 at restaurant 10.
    pub(crate) fn sample_order() -> Order {
        let at = from_unix(1_700_000_000).unwrap();
        Order {
            id: 5,
            customer_id: 1,
            restaurant_id: 10,
            restaurant_name: "Luigi's".to_string(),
            delivery_address_id: Some(42),
            driver_id: Some(77),
            status: OrderStatus::Delivered,
            subtotal_amount: dec!(20.00),
            tax_amount: dec!(1.60),
            delivery_fee: dec!(3.00),
            discount_amount: dec!(0.00),
            total_amount: dec!(24.60),
            placed_at: Some(at),
            confirmed_at: Some(at),
            ready_at: Some(at),
            delivered_at: Some(at + time::Duration::hours(1)),
            cancelled_at: None,
            special_instructions: None,
            cancellation_reason: None,
            estimated_preparation_minutes: Some(15),
            estimated_delivery_at: Some(at + time::Duration::minutes(45)),
            is_active: true,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_order_response_carries_delivery_estimate() {
        let response = order_to_response(&sample_order());
        assert_eq!(response.estimated_delivery_at, Some(1_700_000_000 + 45 * 60));
        assert_eq!(response.total_amount, dec!(24.60));
    }

    #[test]
    fn test_unix_round_trip() {
        let at = from_unix(1_700_000_000).unwrap();
        assert_eq!(unix(at), 1_700_000_000);
        assert!(from_unix(i64::MAX).is_err());
    }

    #[test]
    fn test_id_list() {
        assert_eq!(id_list(None).unwrap(), None);
        assert_eq!(id_list(Some("4, 9")).unwrap(), Some(vec![4, 9]));
        assert_eq!(id_list(Some("")).unwrap(), Some(vec![]));
        assert!(id_list(Some("4;9")).is_err());
    }
}
