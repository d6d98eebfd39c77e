//! Header names understood by the Dispatch server.
//!
//! Authentication happens upstream. The gateway forwards the identity it
//! verified in these headers, and the server trusts them as-is.

/// Header carrying the authenticated user id of the caller.
pub const ACTOR_HEADER: &str = "Dispatch-Actor-Id";

/// Header carrying the driver profile id of the caller (driver routes only).
pub const DRIVER_HEADER: &str = "Dispatch-Driver-Id";

/// Header for admin API authentication (plaintext secret).
pub const ADMIN_AUTH_HEADER: &str = "Dispatch-Admin-Authorization";
