//! Payment webhook endpoint.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use checkout::{CheckoutError, PaymentEvent, PaymentOutcome};
use chrono::Utc;
use domain::{CartStore, OrderStore, ProductStore, UserStore};
use serde::Serialize;

use crate::AppState;
use crate::error::ApiError;

/// Header carrying the provider signature (`t=...,v1=...`).
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

#[derive(Serialize)]
pub struct AckResponse {
    pub received: bool,
}

/// POST /webhooks/payment — verify and apply a payment notification.
///
/// The signature is checked against the raw body before anything is parsed
/// or persisted; a rejected notification leaves no partial effects. The
/// response is a bare acknowledgement either way — the provider only needs
/// to know whether to redeliver.
#[tracing::instrument(skip(state, headers, body))]
pub async fn receive<C, P, O, U>(
    State(state): State<Arc<AppState<C, P, O, U>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AckResponse>, ApiError>
where
    C: CartStore + 'static,
    P: ProductStore + 'static,
    O: OrderStore + 'static,
    U: UserStore + 'static,
{
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if let Err(err) = state.verifier.verify(&body, signature, Utc::now()) {
        metrics::counter!("webhook_rejected_total").increment(1);
        tracing::warn!(error = %err, "rejected webhook delivery");
        return Err(CheckoutError::from(err).into());
    }

    let event = PaymentEvent::parse(&body).map_err(CheckoutError::from)?;
    let outcome = state.reducer.apply(&event).await?;

    match &outcome {
        PaymentOutcome::OrderCreated(order) => {
            tracing::info!(order_id = %order.id(), "webhook finalized order");
        }
        other => tracing::debug!(outcome = ?other, "webhook processed"),
    }

    Ok(Json(AckResponse { received: true }))
}
