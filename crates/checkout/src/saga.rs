//! Two-step checkout saga: persist the order, then clear the source cart.

use common::ShopperId;
use domain::{
    Address, CartService, CartStore, Order, OrderService, OrderStore, ProductStore,
};

use crate::error::CheckoutError;

/// What to do when clearing the cart fails after the order has been
/// persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartClearFailurePolicy {
    /// Keep the order and log a warning. The stale cart heals on its next
    /// mutation; the order is never rolled back.
    KeepOrder,
}

/// The system prefers "order exists, cart stale" over "order lost".
pub const ON_CART_CLEAR_FAILURE: CartClearFailurePolicy = CartClearFailurePolicy::KeepOrder;

/// Orchestrates checkout across the cart and order aggregates.
///
/// The two writes are deliberately not atomic: the order aggregate and the
/// cart aggregate live in separate collections, and order creation must
/// survive a failed cart clear (see [`ON_CART_CLEAR_FAILURE`]).
pub struct CheckoutService<C, P, O> {
    carts: CartService<C, P>,
    orders: OrderService<O>,
}

impl<C, P, O> CheckoutService<C, P, O>
where
    C: CartStore,
    P: ProductStore,
    O: OrderStore,
{
    /// Creates a new checkout service over the two aggregate services.
    pub fn new(carts: CartService<C, P>, orders: OrderService<O>) -> Self {
        Self { carts, orders }
    }

    /// Returns the cart service this saga drives.
    pub fn carts(&self) -> &CartService<C, P> {
        &self.carts
    }

    /// Returns the order service this saga drives.
    pub fn orders(&self) -> &OrderService<O> {
        &self.orders
    }

    /// Creates an order from the shopper's cart, then clears the cart.
    ///
    /// Fails with `EmptyCart` when there is nothing to check out. A cart
    /// clear failure after the order persisted does not fail the call.
    #[tracing::instrument(skip(self, shipping_address, billing_address, payment_id))]
    pub async fn checkout(
        &self,
        shopper: &ShopperId,
        shipping_address: Address,
        billing_address: Address,
        payment_id: Option<String>,
    ) -> Result<Order, CheckoutError> {
        let cart = self.carts.get(shopper).await?;
        let order = self
            .orders
            .create(&cart, shipping_address, billing_address, payment_id)
            .await?;
        metrics::counter!("checkout_orders_total").increment(1);

        if let Err(err) = self.carts.clear(shopper).await {
            match ON_CART_CLEAR_FAILURE {
                CartClearFailurePolicy::KeepOrder => {
                    metrics::counter!("checkout_cart_clear_failures_total").increment(1);
                    tracing::warn!(
                        %shopper,
                        order_id = %order.id(),
                        error = %err,
                        "cart clear failed after order creation; keeping the order"
                    );
                }
            }
        }

        Ok(order)
    }
}
