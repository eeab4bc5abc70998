//! Shared types for the storefront service.

mod types;

pub use types::{Money, OrderId, ProductId, ShopperId};
