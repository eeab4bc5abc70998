//! Identity extraction from gateway-supplied headers.
//!
//! Authentication happens outside this service. A trusted gateway forwards
//! the already-authenticated shopper identity and an admin flag; the
//! handlers consume them through these extractors and never see raw
//! credentials.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use common::ShopperId;

use crate::error::ApiError;

/// Header carrying the opaque shopper identity.
pub const SHOPPER_HEADER: &str = "x-shopper-id";

/// Header carrying the admin flag (`true`/`false`).
pub const ADMIN_HEADER: &str = "x-admin";

fn admin_flag(headers: &HeaderMap) -> bool {
    headers
        .get(ADMIN_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

/// The authenticated shopper behind the current request.
///
/// Rejects with 401 when the identity header is absent or empty.
#[derive(Debug, Clone)]
pub struct Identity {
    pub shopper: ShopperId,
    pub is_admin: bool,
}

impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let shopper = parts
            .headers
            .get(SHOPPER_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or(ApiError::NotAuthenticated)?;

        Ok(Identity {
            shopper: ShopperId::new(shopper),
            is_admin: admin_flag(&parts.headers),
        })
    }
}

/// Marker extractor for admin-only routes.
///
/// Rejects with 403 unless the gateway set the admin flag. The flag is
/// trusted as given; this service performs no authorization of its own.
#[derive(Debug, Clone, Copy)]
pub struct Admin;

impl<S: Send + Sync> FromRequestParts<S> for Admin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if admin_flag(&parts.headers) {
            Ok(Admin)
        } else {
            Err(ApiError::Forbidden)
        }
    }
}
