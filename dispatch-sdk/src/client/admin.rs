//! Admin API client (admin dashboard → Dispatch server).
//!
//! All requests carry the plaintext admin secret in the
//! `Dispatch-Admin-Authorization` header.

use reqwest::Client;
use url::Url;

use super::{ClientError, parse_response, read_text};
use crate::headers::ADMIN_AUTH_HEADER;
use crate::objects::admin::{ActorHistoryQuery, ExportOrdersQuery, OrderStatsResponse, StatsQuery};
use crate::objects::order::{HistoryEntryResponse, OrderResponse, UpdateOrderRequest};

/// Typed HTTP client for the Dispatch **Admin API**.
///
/// Authentication uses a plaintext secret sent in the
/// `Dispatch-Admin-Authorization` header, verified server-side against an
/// argon2-hashed value.
#[derive(Debug, Clone)]
pub struct AdminClient {
    http: Client,
    base_url: Url,
    admin_secret: String,
}

impl AdminClient {
    /// Create a new `AdminClient`.
    ///
    /// * `base_url` – root URL of the Dispatch server.
    /// * `admin_secret` – the plaintext admin secret.
    pub fn new(base_url: Url, admin_secret: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url,
            admin_secret: admin_secret.into(),
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `GET /api/v1/admin/stats` – order counts and delivered revenue.
    pub async fn stats(&self, query: &StatsQuery) -> Result<OrderStatsResponse, ClientError> {
        let url = self.base_url.join("/api/v1/admin/stats")?;

        let resp = self
            .http
            .get(url)
            .header(ADMIN_AUTH_HEADER, &self.admin_secret)
            .query(query)
            .send()
            .await?;

        parse_response(resp).await
    }

    /// `GET /api/v1/admin/history` – transitions made by one actor, newest
    /// first.
    pub async fn history_by_actor(
        &self,
        query: &ActorHistoryQuery,
    ) -> Result<Vec<HistoryEntryResponse>, ClientError> {
        let url = self.base_url.join("/api/v1/admin/history")?;

        let resp = self
            .http
            .get(url)
            .header(ADMIN_AUTH_HEADER, &self.admin_secret)
            .query(query)
            .send()
            .await?;

        parse_response(resp).await
    }

    /// `POST /api/v1/admin/orders/{order_id}/deactivate` – soft-delete an
    /// order.
    pub async fn deactivate_order(&self, order_id: i64) -> Result<OrderResponse, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/v1/admin/orders/{order_id}/deactivate"))?;

        let resp = self
            .http
            .post(url)
            .header(ADMIN_AUTH_HEADER, &self.admin_secret)
            .send()
            .await?;

        parse_response(resp).await
    }

    /// `GET /api/v1/admin/orders/export` – matching orders as CSV text,
    /// header row first.
    pub async fn export_orders(&self, query: &ExportOrdersQuery) -> Result<String, ClientError> {
        let url = self.base_url.join("/api/v1/admin/orders/export")?;

        let resp = self
            .http
            .get(url)
            .header(ADMIN_AUTH_HEADER, &self.admin_secret)
            .query(query)
            .send()
            .await?;

        read_text(resp).await
    }

    /// `PATCH /api/v1/admin/orders/{order_id}` – adjust charges, address or
    /// instructions of an order that has not
    /// reached a terminal status.
    pub async fn update_order(
        &self,
        order_id: i64,
        req: &UpdateOrderRequest,
    ) -> Result<OrderResponse, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/v1/admin/orders/{order_id}"))?;

        let resp = self
            .http
            .patch(url)
            .header(ADMIN_AUTH_HEADER, &self.admin_secret)
            .json(req)
            .send()
            .await?;

        parse_response(resp).await
    }
}
