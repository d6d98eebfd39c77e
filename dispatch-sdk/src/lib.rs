//! Shared wire types for the Dispatch order lifecycle server.
//!
//! The `objects` module holds every request and response body exchanged over
//! HTTP. Enable the `client` feature for typed `reqwest` clients.

#[cfg(feature = "client")]
pub mod client;
pub mod headers;
pub mod objects;
