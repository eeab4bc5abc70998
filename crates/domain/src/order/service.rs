//! Order service providing the order aggregate's operations.

use common::{OrderId, ShopperId};

use crate::cart::Cart;
use crate::error::DomainError;
use crate::order::{Address, Order, OrderStatus};
use crate::ports::OrderStore;

/// Service for creating and querying orders.
///
/// Orders are only ever written through this service; the shopper-facing
/// surface has read-only access once an order exists.
pub struct OrderService<O> {
    orders: O,
}

impl<O: OrderStore> OrderService<O> {
    /// Creates a new order service over the given store.
    pub fn new(orders: O) -> Self {
        Self { orders }
    }

    /// Persists an order materialized from a cart snapshot.
    ///
    /// Fails with `EmptyCart` before touching the store when the cart has no
    /// items.
    #[tracing::instrument(skip(self, cart, shipping_address, billing_address))]
    pub async fn create(
        &self,
        cart: &Cart,
        shipping_address: Address,
        billing_address: Address,
        payment_id: Option<String>,
    ) -> Result<Order, DomainError> {
        let order = Order::from_cart(cart, shipping_address, billing_address, payment_id)?;
        self.orders.insert(&order).await?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(
            order_id = %order.id(),
            shopper = %order.user_id(),
            total = %order.total(),
            "order created"
        );
        Ok(order)
    }

    /// Loads an order by ID. Returns None when it does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn order(&self, id: OrderId) -> Result<Option<Order>, DomainError> {
        Ok(self.orders.get(id).await?)
    }

    /// All orders for one shopper, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn orders_for(&self, shopper: &ShopperId) -> Result<Vec<Order>, DomainError> {
        Ok(self.orders.for_shopper(shopper).await?)
    }

    /// The most recent orders across all shoppers (admin view).
    #[tracing::instrument(skip(self))]
    pub async fn recent(&self, limit: usize) -> Result<Vec<Order>, DomainError> {
        Ok(self.orders.recent(limit).await?)
    }

    /// Looks up the order linked to a provider payment ID.
    #[tracing::instrument(skip(self))]
    pub async fn by_payment_id(&self, payment_id: &str) -> Result<Option<Order>, DomainError> {
        Ok(self.orders.by_payment_id(payment_id).await?)
    }

    /// Moves an order to a new status, enforcing the state machine.
    ///
    /// Fails with `InvalidTransition` on an illegal change; the stored order
    /// is untouched in that case.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: OrderId,
        next: OrderStatus,
    ) -> Result<Order, DomainError> {
        let mut order = self
            .orders
            .get(id)
            .await?
            .ok_or(DomainError::OrderNotFound { order_id: id })?;

        order.transition_to(next)?;

        if !self.orders.update(&order).await? {
            return Err(DomainError::OrderNotFound { order_id: id });
        }

        tracing::info!(order_id = %id, status = %next, "order status updated");
        Ok(order)
    }
}
