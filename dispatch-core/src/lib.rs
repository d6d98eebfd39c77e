#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod entities;
pub mod error;
pub mod framework;
pub mod lifecycle;
pub mod memory;
pub mod money;
pub mod processors;
