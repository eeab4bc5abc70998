//! Order aggregate and related types.

mod service;
mod status;

pub use service::OrderService;
pub use status::{OrderStatus, PaymentStatus};

use chrono::{DateTime, Utc};
use common::{Money, OrderId, ShopperId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::{Cart, CartLineItem};

/// Errors that can occur during order operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// Checkout requires at least one item in the cart.
    #[error("cannot create an order from an empty cart")]
    EmptyCart,

    /// The requested status change is not allowed by the state machine.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
    },
}

/// A shipping or billing address, captured verbatim at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
}

/// Order aggregate root.
///
/// An order is a point-in-time snapshot of a cart: the item list and total
/// are copied at creation and never change afterwards, so later catalog or
/// cart changes cannot alter order history. Only the status fields
/// transition post-creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    user_id: ShopperId,
    items: Vec<CartLineItem>,
    total: Money,
    status: OrderStatus,
    payment_status: PaymentStatus,
    payment_id: Option<String>,
    shipping_address: Address,
    billing_address: Address,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// Materializes an order from a cart snapshot.
    ///
    /// Items and total are copied verbatim; prices are not re-validated
    /// against the live catalog (checkout price is locked at cart-total
    /// time). Fails with `EmptyCart` when the cart has no items.
    pub fn from_cart(
        cart: &Cart,
        shipping_address: Address,
        billing_address: Address,
        payment_id: Option<String>,
    ) -> Result<Self, OrderError> {
        if cart.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        let now = Utc::now();
        let payment_status = if payment_id.is_some() {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Pending
        };

        Ok(Self {
            id: OrderId::new(),
            user_id: cart.shopper().clone(),
            items: cart.items().to_vec(),
            total: cart.total(),
            status: OrderStatus::Pending,
            payment_status,
            payment_id,
            shipping_address,
            billing_address,
            created_at: now,
            updated_at: now,
        })
    }

    /// Moves the order to `next`, rejecting transitions the state machine
    /// does not allow. The order is unchanged on rejection.
    pub fn transition_to(&mut self, next: OrderStatus) -> Result<(), OrderError> {
        if !self.status.can_transition_to(next) {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn user_id(&self) -> &ShopperId {
        &self.user_id
    }

    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn payment_id(&self) -> Option<&str> {
        self.payment_id.as_deref()
    }

    pub fn shipping_address(&self) -> &Address {
        &self.shipping_address
    }

    pub fn billing_address(&self) -> &Address {
        &self.billing_address
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
