//! Driver API client (driver app → Dispatch server).

use reqwest::Client;
use url::Url;

use super::{ClientError, parse_response};
use crate::headers::{ACTOR_HEADER, DRIVER_HEADER};
use crate::objects::driver::AvailableOrdersQuery;
use crate::objects::order::{OrderResponse, TransitionStatusRequest};

/// Typed HTTP client for the Dispatch **Driver API**.
///
/// Sends both the driver's user id and driver profile id on every request.
#[derive(Debug, Clone)]
pub struct DriverClient {
    http: Client,
    base_url: Url,
    user_id: i64,
    driver_id: i64,
}

impl DriverClient {
    pub fn new(base_url: Url, user_id: i64, driver_id: i64) -> Self {
        Self {
            http: Client::new(),
            base_url,
            user_id,
            driver_id,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `GET /api/v1/driver/orders/available` – unassigned orders, most
    /// ready first.
    pub async fn available_orders(
        &self,
        query: &AvailableOrdersQuery,
    ) -> Result<Vec<OrderResponse>, ClientError> {
        let url = self.base_url.join("/api/v1/driver/orders/available")?;
        let resp = self
            .http
            .get(url)
            .header(ACTOR_HEADER, self.user_id)
            .header(DRIVER_HEADER, self.driver_id)
            .query(query)
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `POST /api/v1/driver/orders/{id}/assign` – claim a ready order.
    ///
    /// Only one driver can win a given order; losers get a 409 whose
    /// [`error_body`](ClientError::error_body) code is `already_assigned`.
    pub async fn assign(&self, order_id: i64) -> Result<OrderResponse, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/v1/driver/orders/{order_id}/assign"))?;
        let resp = self
            .http
            .post(url)
            .header(ACTOR_HEADER, self.user_id)
            .header(DRIVER_HEADER, self.driver_id)
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `POST /api/v1/driver/orders/{id}/status` – advance an order this
    /// driver holds.
    pub async fn transition(
        &self,
        order_id: i64,
        payload: &TransitionStatusRequest,
    ) -> Result<OrderResponse, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/v1/driver/orders/{order_id}/status"))?;
        let resp = self
            .http
            .post(url)
            .header(ACTOR_HEADER, self.user_id)
            .header(DRIVER_HEADER, self.driver_id)
            .json(payload)
            .send()
            .await?;
        parse_response(resp).await
    }
}
