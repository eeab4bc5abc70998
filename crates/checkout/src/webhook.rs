//! Payment webhook envelope and signature verification.
//!
//! Notifications are signed the way most payment providers sign theirs: a
//! header of the form `t=<unix-seconds>,v1=<hex hmac-sha256>` where the MAC
//! covers `"{timestamp}.{raw body}"`. Verification happens before the body
//! is even parsed; a bad signature must leave no trace in the system.

use std::time::Duration;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Event type announcing a completed checkout session.
pub const EVENT_CHECKOUT_COMPLETED: &str = "checkout.session.completed";

/// Event type announcing a failed payment.
pub const EVENT_PAYMENT_FAILED: &str = "payment_intent.payment_failed";

/// How far a signature timestamp may drift from the current time.
pub const DEFAULT_SIGNATURE_TOLERANCE: Duration = Duration::from_secs(300);

/// Reasons a webhook signature is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// The header was missing pieces or not in `t=...,v1=...` form.
    #[error("malformed signature header")]
    MalformedHeader,

    /// The signature timestamp is too far from the current time.
    #[error("signature timestamp outside tolerance")]
    StaleTimestamp,

    /// No candidate signature matched the payload.
    #[error("signature mismatch")]
    Mismatch,
}

/// Verifies webhook signatures against a shared secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: Vec<u8>,
    tolerance: Duration,
}

impl WebhookVerifier {
    /// Creates a verifier with the default timestamp tolerance.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self::with_tolerance(secret, DEFAULT_SIGNATURE_TOLERANCE)
    }

    /// Creates a verifier with an explicit timestamp tolerance.
    pub fn with_tolerance(secret: impl Into<Vec<u8>>, tolerance: Duration) -> Self {
        Self {
            secret: secret.into(),
            tolerance,
        }
    }

    /// Checks `signature_header` against the raw request body.
    ///
    /// Any `v1` candidate may match; comparison is constant-time.
    pub fn verify(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: DateTime<Utc>,
    ) -> Result<(), VerificationError> {
        let (timestamp, candidates) = parse_header(signature_header)?;

        let age = (now.timestamp() - timestamp).unsigned_abs();
        if age > self.tolerance.as_secs() {
            return Err(VerificationError::StaleTimestamp);
        }

        let mac = self.mac_for(timestamp, payload);
        for candidate in candidates {
            if mac.clone().verify_slice(&candidate).is_ok() {
                return Ok(());
            }
        }
        Err(VerificationError::Mismatch)
    }

    /// Produces the signature header for a payload. Used by tests and by
    /// local tooling that replays events.
    pub fn sign(&self, payload: &[u8], at: DateTime<Utc>) -> String {
        let timestamp = at.timestamp();
        let tag = self.mac_for(timestamp, payload).finalize().into_bytes();
        format!("t={timestamp},v1={}", encode_hex(&tag))
    }

    fn mac_for(&self, timestamp: i64, payload: &[u8]) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac
    }
}

fn parse_header(header: &str) -> Result<(i64, Vec<Vec<u8>>), VerificationError> {
    let mut timestamp = None;
    let mut candidates = Vec::new();

    for part in header.split(',') {
        let (key, value) = part
            .trim()
            .split_once('=')
            .ok_or(VerificationError::MalformedHeader)?;
        match key {
            "t" => {
                timestamp = Some(
                    value
                        .parse::<i64>()
                        .map_err(|_| VerificationError::MalformedHeader)?,
                );
            }
            "v1" => {
                candidates.push(decode_hex(value).ok_or(VerificationError::MalformedHeader)?);
            }
            // Unknown schemes are skipped so providers can rotate schemes.
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(VerificationError::MalformedHeader)?;
    if candidates.is_empty() {
        return Err(VerificationError::MalformedHeader);
    }
    Ok((timestamp, candidates))
}

fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if !s.is_ascii() || s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}

/// An inbound payment provider notification.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEvent {
    /// Provider-assigned event ID.
    pub id: String,

    /// Event type; unhandled types are acknowledged and ignored.
    #[serde(rename = "type")]
    pub event_type: String,

    pub data: PaymentEventData,
}

/// Payload of a payment event.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEventData {
    /// Provider checkout session / intent ID.
    pub session_id: String,

    /// Payment ID; the session ID stands in for order linkage when absent.
    #[serde(default)]
    pub payment_id: Option<String>,

    /// Total charged, in cents.
    #[serde(default)]
    pub amount_total: i64,

    #[serde(default)]
    pub metadata: PaymentMetadata,
}

/// Metadata the storefront attached when creating the checkout session.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentMetadata {
    /// The shopper whose cart this payment finalizes.
    #[serde(default)]
    pub user_id: Option<String>,
}

impl PaymentEvent {
    /// Parses a verified notification body.
    pub fn parse(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    /// The identifier used to link the resulting order to this payment.
    pub fn payment_reference(&self) -> &str {
        self.data
            .payment_id
            .as_deref()
            .unwrap_or(&self.data.session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn sign_then_verify_roundtrips() {
        let verifier = WebhookVerifier::new("whsec_test");
        let payload = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;

        let header = verifier.sign(payload, now());
        assert!(verifier.verify(payload, &header, now()).is_ok());
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let verifier = WebhookVerifier::new("whsec_test");
        let header = verifier.sign(b"original", now());

        assert_eq!(
            verifier.verify(b"tampered", &header, now()),
            Err(VerificationError::Mismatch)
        );
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let signer = WebhookVerifier::new("whsec_a");
        let verifier = WebhookVerifier::new("whsec_b");
        let header = signer.sign(b"payload", now());

        assert_eq!(
            verifier.verify(b"payload", &header, now()),
            Err(VerificationError::Mismatch)
        );
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let verifier = WebhookVerifier::new("whsec_test");
        let header = verifier.sign(b"payload", now());

        let later = now() + chrono::Duration::seconds(301);
        assert_eq!(
            verifier.verify(b"payload", &header, later),
            Err(VerificationError::StaleTimestamp)
        );
    }

    #[test]
    fn malformed_headers_are_rejected() {
        let verifier = WebhookVerifier::new("whsec_test");
        for header in ["", "t=abc,v1=00", "v1=00", "t=123", "t=123,v1=zz"] {
            assert_eq!(
                verifier.verify(b"payload", header, now()),
                Err(VerificationError::MalformedHeader),
                "header {header:?} should be malformed"
            );
        }
    }

    #[test]
    fn any_v1_candidate_may_match() {
        let verifier = WebhookVerifier::new("whsec_test");
        let good = verifier.sign(b"payload", now());
        let (_, good_sig) = good.split_once(",v1=").unwrap();
        let ts = now().timestamp();

        let header = format!("t={ts},v1={},v1={good_sig}", "00".repeat(32));
        assert!(verifier.verify(b"payload", &header, now()).is_ok());
    }

    #[test]
    fn event_parse_reads_the_provider_shape() {
        let body = br#"{
            "id": "evt_42",
            "type": "checkout.session.completed",
            "data": {
                "session_id": "cs_123",
                "payment_id": "pi_456",
                "amount_total": 2997,
                "metadata": {"user_id": "shopper@example.com"}
            }
        }"#;

        let event = PaymentEvent::parse(body).unwrap();
        assert_eq!(event.event_type, EVENT_CHECKOUT_COMPLETED);
        assert_eq!(event.payment_reference(), "pi_456");
        assert_eq!(event.data.amount_total, 2997);
        assert_eq!(
            event.data.metadata.user_id.as_deref(),
            Some("shopper@example.com")
        );
    }

    #[test]
    fn payment_reference_falls_back_to_session_id() {
        let body = br#"{"id":"evt_1","type":"x","data":{"session_id":"cs_9"}}"#;
        let event = PaymentEvent::parse(body).unwrap();
        assert_eq!(event.payment_reference(), "cs_9");
    }
}
