//! Checkout layer: the cross-aggregate operations of the storefront.
//!
//! Creating an order from a cart and clearing the cart afterwards spans two
//! aggregates without a shared transaction; this crate models that as an
//! explicit two-step saga with a documented failure bias. It also hosts the
//! payment-webhook signature verifier and the idempotent payment event
//! reducer that finalizes orders from provider notifications.

mod error;
mod reducer;
mod saga;
mod webhook;

pub use error::CheckoutError;
pub use reducer::{PaymentEventReducer, PaymentOutcome};
pub use saga::{CartClearFailurePolicy, CheckoutService, ON_CART_CLEAR_FAILURE};
pub use webhook::{
    PaymentEvent, PaymentEventData, PaymentMetadata, VerificationError, WebhookVerifier,
    DEFAULT_SIGNATURE_TOLERANCE, EVENT_CHECKOUT_COMPLETED, EVENT_PAYMENT_FAILED,
};
