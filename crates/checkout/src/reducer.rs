//! Payment event reducer: maps provider notifications to order state.
//!
//! The reducer must tolerate redelivery. A completed-payment event is
//! checked against the orders already linked to its payment ID before
//! anything is created, and an event arriving after the cart was cleared is
//! acknowledged as a no-op rather than an error.

use common::ShopperId;
use domain::{Address, CartStore, DomainError, Order, OrderError, OrderStore, ProductStore};

use crate::error::CheckoutError;
use crate::saga::CheckoutService;
use crate::webhook::{PaymentEvent, EVENT_CHECKOUT_COMPLETED, EVENT_PAYMENT_FAILED};

/// What applying a payment event did.
#[derive(Debug)]
pub enum PaymentOutcome {
    /// A new order was created from the shopper's cart.
    OrderCreated(Order),

    /// An order linked to this payment already exists; the redelivery was a
    /// no-op.
    AlreadyProcessed,

    /// The shopper's cart was already empty or absent (e.g. cleared by an
    /// earlier delivery); nothing was created.
    NothingToFinalize,

    /// The provider reported a failed payment; recorded for observability
    /// only.
    PaymentFailed,

    /// An event type we do not handle, or a completed event without a
    /// shopper identity.
    Ignored,
}

/// Applies verified payment events to the storefront state.
pub struct PaymentEventReducer<C, P, O> {
    checkout: CheckoutService<C, P, O>,
}

impl<C, P, O> PaymentEventReducer<C, P, O>
where
    C: CartStore,
    P: ProductStore,
    O: OrderStore,
{
    /// Creates a reducer driving the given checkout saga.
    pub fn new(checkout: CheckoutService<C, P, O>) -> Self {
        Self { checkout }
    }

    /// Applies one verified payment event.
    #[tracing::instrument(
        skip(self, event),
        fields(event_id = %event.id, event_type = %event.event_type)
    )]
    pub async fn apply(&self, event: &PaymentEvent) -> Result<PaymentOutcome, CheckoutError> {
        match event.event_type.as_str() {
            EVENT_CHECKOUT_COMPLETED => self.finalize_completed(event).await,
            EVENT_PAYMENT_FAILED => {
                metrics::counter!("payment_events_total", "result" => "failed").increment(1);
                tracing::warn!(
                    session_id = %event.data.session_id,
                    amount_total = event.data.amount_total,
                    "payment failed; no order created"
                );
                Ok(PaymentOutcome::PaymentFailed)
            }
            _ => {
                tracing::debug!("ignoring unhandled payment event type");
                Ok(PaymentOutcome::Ignored)
            }
        }
    }

    async fn finalize_completed(
        &self,
        event: &PaymentEvent,
    ) -> Result<PaymentOutcome, CheckoutError> {
        let Some(user_id) = event.data.metadata.user_id.as_deref() else {
            tracing::warn!("completed payment event carries no shopper identity");
            return Ok(PaymentOutcome::Ignored);
        };

        let payment_ref = event.payment_reference();
        if self
            .checkout
            .orders()
            .by_payment_id(payment_ref)
            .await?
            .is_some()
        {
            metrics::counter!("payment_events_total", "result" => "duplicate").increment(1);
            tracing::info!(
                payment_id = payment_ref,
                "payment already finalized; ignoring redelivery"
            );
            return Ok(PaymentOutcome::AlreadyProcessed);
        }

        let shopper = ShopperId::new(user_id);
        match self.checkout.carts().peek(&shopper).await? {
            Some(cart) if !cart.is_empty() => {}
            _ => {
                tracing::info!(%shopper, "no cart items to finalize for completed payment");
                return Ok(PaymentOutcome::NothingToFinalize);
            }
        }

        // The provider only reports customer name/email, not a structured
        // address; reducer-created orders start with empty addresses.
        let result = self
            .checkout
            .checkout(
                &shopper,
                Address::default(),
                Address::default(),
                Some(payment_ref.to_string()),
            )
            .await;

        match result {
            Ok(order) => {
                metrics::counter!("payment_events_total", "result" => "completed").increment(1);
                tracing::info!(
                    order_id = %order.id(),
                    amount_total = event.data.amount_total,
                    "order finalized from completed payment"
                );
                Ok(PaymentOutcome::OrderCreated(order))
            }
            // The cart emptied between our check and the checkout; treat it
            // like any other redelivery no-op.
            Err(CheckoutError::Domain(DomainError::Order(OrderError::EmptyCart))) => {
                Ok(PaymentOutcome::NothingToFinalize)
            }
            Err(err) => Err(err),
        }
    }
}
