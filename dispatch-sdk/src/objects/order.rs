//! Order request and response types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{OrderStatus, default_limit};

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// An order as returned by every order endpoint.
///
/// Timestamps are unix seconds (UTC).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResponse {
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
    pub placed_at: Option<i64>,
    pub confirmed_at: Option<i64>,
    pub ready_at: Option<i64>,
    pub delivered_at: Option<i64>,
    pub cancelled_at: Option<i64>,
    pub special_instructions: Option<String>,
    pub cancellation_reason: Option<String>,
    pub estimated_preparation_minutes: Option<i32>,
    pub estimated_delivery_at: Option<i64>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItemResponse {
    pub id: i64,
    pub order_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub customizations: serde_json::Value,
    pub customization_surcharge: Decimal,
    pub line_total: Decimal,
}

/// One audit entry of the order status history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntryResponse {
    pub id: i64,
    pub order_id: i64,
    pub actor_id: Option<i64>,
    pub from_status: OrderStatus,
    pub to_status: OrderStatus,
    pub notes: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetailsResponse {
    pub order: OrderResponse,
    pub items: Vec<OrderItemResponse>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub status_history: Vec<HistoryEntryResponse>,
}

/// A page of orders plus the number of orders matching the filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPage {
    pub orders: Vec<OrderResponse>,
    pub total_count: i64,
    pub limit: i64,
    pub offset: i64,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub restaurant_id: i64,
    pub restaurant_name: String,
    pub delivery_address_id: Option<i64>,
    #[serde(default)]
    pub special_instructions: Option<String>,
    pub items: Vec<CreateOrderItemRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderItemRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
    #[serde(default)]
    pub customizations: Option<serde_json::Value>,
    /// Per-unit surcharge for the chosen customizations.
    #[serde(default)]
    pub customization_surcharge: Decimal,
}

/// Partial update of the mutable order fields. Absent fields stay unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateOrderRequest {
    pub delivery_address_id: Option<i64>,
    pub tax_amount: Option<Decimal>,
    pub delivery_fee: Option<Decimal>,
    pub discount_amount: Option<Decimal>,
    pub special_instructions: Option<String>,
}

/// Partial update of an order item. Absent fields stay unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateOrderItemRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub unit_price: Option<Decimal>,
    pub quantity: Option<i32>,
    pub customizations: Option<serde_json::Value>,
    pub customization_surcharge: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionStatusRequest {
    pub status: OrderStatus,
    #[serde(default)]
    pub notes: Option<String>,
    /// Minutes until the order is expected to be ready.
    #[serde(default)]
    pub estimated_preparation_minutes: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelOrderRequest {
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

/// Query parameters for listing orders.
///
/// `restaurant_ids` is a comma separated list (`"3,7"`); see
/// [`parse_id_list`](super::parse_id_list). `created_from`/`created_to` are
/// unix seconds, inclusive and exclusive respectively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListOrdersQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    pub customer_id: Option<i64>,
    pub restaurant_ids: Option<String>,
    pub driver_id: Option<i64>,
    pub status: Option<OrderStatus>,
    pub created_from: Option<i64>,
    pub created_to: Option<i64>,
}

impl Default for ListOrdersQuery {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
            customer_id: None,
            restaurant_ids: None,
            driver_id: None,
            status: None,
            created_from: None,
            created_to: None,
        }
    }
}
