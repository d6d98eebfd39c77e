//! Custom Axum extractors for caller identity.
//!
//! Provides:
//! - `Actor` — the user id forwarded by the gateway in `Dispatch-Actor-Id`.
//! - `DriverActor` — `Actor` plus the driver profile id from `Dispatch-Driver-Id`.
//! - `AdminAuth` — checks `Dispatch-Admin-Authorization` against the argon2
//!   hash in the admin config.

use axum::{extract::FromRequestParts, http::request::Parts};
use dispatch_sdk::headers::{ACTOR_HEADER, ADMIN_AUTH_HEADER, DRIVER_HEADER};

use crate::api::error::ApiError;
use crate::state::AppState;

/// Authenticated user id of the caller.
#[derive(Debug, Clone, Copy)]
pub struct Actor(pub i64);

/// A driver calling a driver route.
#[derive(Debug, Clone, Copy)]
pub struct DriverActor {
    /// User id, recorded as the history actor.
    pub user_id: i64,
    /// Driver profile id, stored on assigned orders.
    pub driver_id: i64,
}

/// Marker that the request carried the admin secret.
pub struct AdminAuth;

fn id_header(parts: &Parts, name: &'static str) -> Result<i64, ApiError> {
    let raw = parts
        .headers
        .get(name)
        .ok_or_else(|| ApiError::bad_request("missing_actor", format!("missing {name} header")))?;
    raw.to_str()
        .ok()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::bad_request("invalid_actor", format!("invalid {name} header")))
}

impl FromRequestParts<AppState> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        id_header(parts, ACTOR_HEADER).map(Actor)
    }
}

impl FromRequestParts<AppState> for DriverActor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(DriverActor {
            user_id: id_header(parts, ACTOR_HEADER)?,
            driver_id: id_header(parts, DRIVER_HEADER)?,
        })
    }
}

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let secret = parts
            .headers
            .get(ADMIN_AUTH_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let admin = state.config.admin.read().await;
        let verified = admin.verify_secret(secret);
        drop(admin);

        if verified {
            Ok(AdminAuth)
        } else {
            tracing::warn!("rejected admin request with invalid secret");
            Err(ApiError::Unauthorized)
        }
    }
}
