pub mod order;
pub mod order_item;
pub mod status_history;

pub use order::{Order, OrderDetails, OrderFilter, Page};
pub use order_item::{NewOrderItem, OrderItem};
pub use status_history::OrderStatusHistory;

use dispatch_sdk::objects::OrderStatus as SdkOrderStatus;

/// Order status for database operations.
///
/// This is the sqlx::Type version. For API/DTO use, see `dispatch_sdk::objects::OrderStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, sqlx::Type)]
#[sqlx(rename_all = "snake_case", type_name = "order_status")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    DriverAssigned,
    PickedUp,
    EnRoute,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 9] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::DriverAssigned,
        OrderStatus::PickedUp,
        OrderStatus::EnRoute,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        SdkOrderStatus::from(self).as_str()
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<OrderStatus> for SdkOrderStatus {
    fn from(value: OrderStatus) -> Self {
        match value {
            OrderStatus::Pending => SdkOrderStatus::Pending,
            OrderStatus::Confirmed => SdkOrderStatus::Confirmed,
            OrderStatus::Preparing => SdkOrderStatus::Preparing,
            OrderStatus::Ready => SdkOrderStatus::Ready,
            OrderStatus::DriverAssigned => SdkOrderStatus::DriverAssigned,
            OrderStatus::PickedUp => SdkOrderStatus::PickedUp,
            OrderStatus::EnRoute => SdkOrderStatus::EnRoute,
            OrderStatus::Delivered => SdkOrderStatus::Delivered,
            OrderStatus::Cancelled => SdkOrderStatus::Cancelled,
        }
    }
}

impl From<SdkOrderStatus> for OrderStatus {
    fn from(value: SdkOrderStatus) -> Self {
        match value {
            SdkOrderStatus::Pending => OrderStatus::Pending,
            SdkOrderStatus::Confirmed => OrderStatus::Confirmed,
            SdkOrderStatus::Preparing => OrderStatus::Preparing,
            SdkOrderStatus::Ready => OrderStatus::Ready,
            SdkOrderStatus::DriverAssigned => OrderStatus::DriverAssigned,
            SdkOrderStatus::PickedUp => OrderStatus::PickedUp,
            SdkOrderStatus::EnRoute => OrderStatus::EnRoute,
            SdkOrderStatus::Delivered => OrderStatus::Delivered,
            SdkOrderStatus::Cancelled => OrderStatus::Cancelled,
        }
    }
}

/// Current UTC time as stored in `TIMESTAMP` columns.
pub(crate) fn utc_now() -> time::PrimitiveDateTime {
    let now = time::OffsetDateTime::now_utc();
    time::PrimitiveDateTime::new(now.date(), now.time())
}
