//! Order API client (customer and restaurant apps → Dispatch server).
//!
//! Every request carries the caller's user id in `Dispatch-Actor-Id`.

use reqwest::Client;
use url::Url;

use super::{ClientError, expect_success, parse_response};
use crate::headers::ACTOR_HEADER;
use crate::objects::order::{
    CancelOrderRequest, CreateOrderItemRequest, CreateOrderRequest, HistoryEntryResponse,
    ListOrdersQuery, OrderDetailsResponse, OrderItemResponse, OrderPage, OrderResponse,
    TransitionStatusRequest, UpdateOrderItemRequest, UpdateOrderRequest,
};

/// Typed HTTP client for the Dispatch **Order API**.
#[derive(Debug, Clone)]
pub struct OrderClient {
    http: Client,
    base_url: Url,
    actor_id: i64,
}

impl OrderClient {
    /// Create a new `OrderClient`.
    ///
    /// * `base_url` – root URL of the Dispatch server.
    /// * `actor_id` – the authenticated user id sent with every request.
    pub fn new(base_url: Url, actor_id: i64) -> Self {
        Self {
            http: Client::new(),
            base_url,
            actor_id,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure timeouts or a proxy).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `POST /api/v1/orders` – place a new order.
    pub async fn create_order(
        &self,
        payload: &CreateOrderRequest,
    ) -> Result<OrderDetailsResponse, ClientError> {
        let url = self.base_url.join("/api/v1/orders")?;
        let resp = self
            .http
            .post(url)
            .header(ACTOR_HEADER, self.actor_id)
            .json(payload)
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `GET /api/v1/orders/{id}` – order with items and history.
    pub async fn get_order(&self, order_id: i64) -> Result<OrderDetailsResponse, ClientError> {
        let url = self.base_url.join(&format!("/api/v1/orders/{order_id}"))?;
        let resp = self
            .http
            .get(url)
            .header(ACTOR_HEADER, self.actor_id)
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `GET /api/v1/orders` – list orders with optional filters.
    pub async fn list_orders(&self, query: &ListOrdersQuery) -> Result<OrderPage, ClientError> {
        let url = self.base_url.join("/api/v1/orders")?;
        let resp = self
            .http
            .get(url)
            .header(ACTOR_HEADER, self.actor_id)
            .query(query)
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `PATCH /api/v1/orders/{id}` – update address or instructions of an
    /// order the actor placed. Charge fields are rejected with `forbidden`;
    /// use [`AdminClient::update_order`](super::AdminClient::update_order).
    pub async fn update_order(
        &self,
        order_id: i64,
        payload: &UpdateOrderRequest,
    ) -> Result<OrderResponse, ClientError> {
        let url = self.base_url.join(&format!("/api/v1/orders/{order_id}"))?;
        let resp = self
            .http
            .patch(url)
            .header(ACTOR_HEADER, self.actor_id)
            .json(payload)
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `POST /api/v1/orders/{id}/items` – add an item to a pending order.
    pub async fn add_item(
        &self,
        order_id: i64,
        payload: &CreateOrderItemRequest,
    ) -> Result<OrderItemResponse, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/v1/orders/{order_id}/items"))?;
        let resp = self
            .http
            .post(url)
            .header(ACTOR_HEADER, self.actor_id)
            .json(payload)
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `PATCH /api/v1/orders/{id}/items/{item_id}` – change an item.
    pub async fn update_item(
        &self,
        order_id: i64,
        item_id: i64,
        payload: &UpdateOrderItemRequest,
    ) -> Result<OrderItemResponse, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/v1/orders/{order_id}/items/{item_id}"))?;
        let resp = self
            .http
            .patch(url)
            .header(ACTOR_HEADER, self.actor_id)
            .json(payload)
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `DELETE /api/v1/orders/{id}/items/{item_id}` – remove an item.
    pub async fn remove_item(&self, order_id: i64, item_id: i64) -> Result<(), ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/v1/orders/{order_id}/items/{item_id}"))?;
        let resp = self
            .http
            .delete(url)
            .header(ACTOR_HEADER, self.actor_id)
            .send()
            .await?;
        expect_success(resp).await
    }

    /// `POST /api/v1/orders/{id}/status` – move the order to the next status.
    pub async fn transition(
        &self,
        order_id: i64,
        payload: &TransitionStatusRequest,
    ) -> Result<OrderResponse, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/v1/orders/{order_id}/status"))?;
        let resp = self
            .http
            .post(url)
            .header(ACTOR_HEADER, self.actor_id)
            .json(payload)
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `POST /api/v1/orders/{id}/cancel` – the owner cancels with a reason.
    ///
    /// Accepted up to `ready`; once a driver is assigned the server answers
    /// `invalid_transition`.
    pub async fn cancel(
        &self,
        order_id: i64,
        reason: impl Into<String>,
    ) -> Result<OrderResponse, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/v1/orders/{order_id}/cancel"))?;
        let resp = self
            .http
            .post(url)
            .header(ACTOR_HEADER, self.actor_id)
            .json(&CancelOrderRequest {
                reason: reason.into(),
            })
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `GET /api/v1/orders/{id}/history` – status transitions, oldest first.
    pub async fn history(&self, order_id: i64) -> Result<Vec<HistoryEntryResponse>, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/v1/orders/{order_id}/history"))?;
        let resp = self
            .http
            .get(url)
            .header(ACTOR_HEADER, self.actor_id)
            .send()
            .await?;
        parse_response(resp).await
    }
}
