//! Runtime configuration re-exports.
//!
//! The validated config types live in `dispatch-core::config`.

pub use dispatch_core::config::{AdminConfig, PricingConfig, ServerConfig, SharedConfig};
