//! User profile endpoints and the admin user views.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::ShopperId;
use domain::{CartStore, OrderStore, ProductStore, UserProfile, UserStore};
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiError;
use crate::identity::{Admin, Identity};

#[derive(Deserialize)]
pub struct ProfileRequest {
    pub email: String,
    pub display_name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Deserialize)]
pub struct SetRoleRequest {
    pub is_admin: bool,
}

/// GET /me/profile — the shopper's own profile.
#[tracing::instrument(skip(state))]
pub async fn get_profile<C, P, O, U>(
    State(state): State<Arc<AppState<C, P, O, U>>>,
    identity: Identity,
) -> Result<Json<UserProfile>, ApiError>
where
    C: CartStore + 'static,
    P: ProductStore + 'static,
    O: OrderStore + 'static,
    U: UserStore + 'static,
{
    state
        .users
        .profile(&identity.shopper)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("profile not found".to_string()))
}

/// PUT /me/profile — create or update the shopper's profile.
///
/// The admin flag can never be set through this route; it is preserved from
/// the stored profile.
#[tracing::instrument(skip(state, req))]
pub async fn put_profile<C, P, O, U>(
    State(state): State<Arc<AppState<C, P, O, U>>>,
    identity: Identity,
    Json(req): Json<ProfileRequest>,
) -> Result<Json<UserProfile>, ApiError>
where
    C: CartStore + 'static,
    P: ProductStore + 'static,
    O: OrderStore + 'static,
    U: UserStore + 'static,
{
    let mut profile = match state.users.profile(&identity.shopper).await? {
        Some(existing) => existing,
        None => UserProfile::new(
            identity.shopper.clone(),
            req.email.clone(),
            req.display_name.clone(),
        ),
    };
    profile.email = req.email;
    profile.display_name = req.display_name;
    profile.phone = req.phone;

    let saved = state.users.save_profile(profile).await?;
    Ok(Json(saved))
}

/// GET /admin/users — all profiles, newest first (admin).
#[tracing::instrument(skip(state))]
pub async fn admin_list<C, P, O, U>(
    State(state): State<Arc<AppState<C, P, O, U>>>,
    _admin: Admin,
) -> Result<Json<Vec<UserProfile>>, ApiError>
where
    C: CartStore + 'static,
    P: ProductStore + 'static,
    O: OrderStore + 'static,
    U: UserStore + 'static,
{
    Ok(Json(state.users.list().await?))
}

/// PUT /admin/users/{id}/role — grant or revoke the admin flag (admin).
#[tracing::instrument(skip(state, req))]
pub async fn admin_set_role<C, P, O, U>(
    State(state): State<Arc<AppState<C, P, O, U>>>,
    _admin: Admin,
    Path(id): Path<String>,
    Json(req): Json<SetRoleRequest>,
) -> Result<Json<UserProfile>, ApiError>
where
    C: CartStore + 'static,
    P: ProductStore + 'static,
    O: OrderStore + 'static,
    U: UserStore + 'static,
{
    let profile = state
        .users
        .set_admin(&ShopperId::new(id), req.is_admin)
        .await?;
    Ok(Json(profile))
}
