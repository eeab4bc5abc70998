//! Domain error types.

use common::{OrderId, ProductId, ShopperId};
use thiserror::Error;

use crate::cart::CartError;
use crate::order::OrderError;
use crate::ports::StoreError;
use crate::product::CatalogError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the backing store.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// An error occurred in the cart aggregate.
    #[error("cart error: {0}")]
    Cart(#[from] CartError),

    /// An error occurred in the order aggregate.
    #[error("order error: {0}")]
    Order(#[from] OrderError),

    /// A product failed catalog validation.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// The referenced product does not exist in the catalog.
    #[error("product not found: {product_id}")]
    ProductNotFound { product_id: ProductId },

    /// The referenced order does not exist.
    #[error("order not found: {order_id}")]
    OrderNotFound { order_id: OrderId },

    /// The referenced user profile does not exist.
    #[error("user not found: {user_id}")]
    UserNotFound { user_id: ShopperId },
}
