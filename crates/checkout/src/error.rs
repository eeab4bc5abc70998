//! Checkout error types.

use domain::DomainError;
use thiserror::Error;

use crate::webhook::VerificationError;

/// Errors that can occur during checkout and payment event processing.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// An error from the underlying aggregates or stores.
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    /// The webhook signature could not be verified; nothing was processed.
    #[error("webhook verification failed: {0}")]
    Verification(#[from] VerificationError),

    /// The (verified) notification body was not a payment event we can read.
    #[error("malformed payment event: {0}")]
    MalformedEvent(#[from] serde_json::Error),
}
