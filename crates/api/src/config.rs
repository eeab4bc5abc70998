//! Application configuration loaded from environment variables.

use std::time::Duration;

use checkout::WebhookVerifier;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `DATABASE_URL` — PostgreSQL URL; in-memory stores are used when unset
/// - `WEBHOOK_SECRET` — shared secret for payment webhook signatures
/// - `WEBHOOK_TOLERANCE_SECS` — allowed signature timestamp drift (default: `300`)
/// - `STORE_TIMEOUT_MS` — per-call store deadline (default: `5000`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub webhook_secret: String,
    pub webhook_tolerance_secs: u64,
    pub store_timeout_ms: u64,
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            database_url: std::env::var("DATABASE_URL").ok(),
            webhook_secret: std::env::var("WEBHOOK_SECRET")
                .unwrap_or_else(|_| "whsec_dev".to_string()),
            webhook_tolerance_secs: std::env::var("WEBHOOK_TOLERANCE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            store_timeout_ms: std::env::var("STORE_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5000),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Builds the webhook verifier for the configured secret and tolerance.
    pub fn verifier(&self) -> WebhookVerifier {
        WebhookVerifier::with_tolerance(
            self.webhook_secret.as_bytes(),
            Duration::from_secs(self.webhook_tolerance_secs),
        )
    }

    /// Returns the per-call store deadline.
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: None,
            webhook_secret: "whsec_dev".to_string(),
            webhook_tolerance_secs: 300,
            store_timeout_ms: 5000,
        }
    }
}
