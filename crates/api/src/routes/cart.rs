//! Cart endpoints: the shopper-facing mutation surface.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use common::ProductId;
use domain::{Cart, CartStore, OrderStore, ProductStore, UserStore};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;
use crate::identity::Identity;

// -- Request types --

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub product_id: String,
    /// Defaults to one unit.
    pub quantity: Option<u32>,
}

#[derive(Deserialize)]
pub struct UpdateQuantityRequest {
    /// Zero or negative removes the line.
    pub quantity: i64,
}

// -- Response types --

#[derive(Serialize)]
pub struct CartResponse {
    pub items: Vec<CartItemResponse>,
    pub total_cents: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct CartItemResponse {
    pub product_id: String,
    pub name: String,
    pub image: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

pub(crate) fn cart_response(cart: &Cart) -> CartResponse {
    CartResponse {
        items: cart
            .items()
            .iter()
            .map(|item| CartItemResponse {
                product_id: item.product_id.to_string(),
                name: item.name.clone(),
                image: item.image.clone(),
                quantity: item.quantity,
                unit_price_cents: item.unit_price.cents(),
            })
            .collect(),
        total_cents: cart.total().cents(),
        updated_at: cart.updated_at(),
    }
}

// -- Handlers --

/// GET /cart — the shopper's cart, created lazily on first touch.
#[tracing::instrument(skip(state))]
pub async fn get_cart<C, P, O, U>(
    State(state): State<Arc<AppState<C, P, O, U>>>,
    identity: Identity,
) -> Result<Json<CartResponse>, ApiError>
where
    C: CartStore + 'static,
    P: ProductStore + 'static,
    O: OrderStore + 'static,
    U: UserStore + 'static,
{
    let cart = state.carts.get(&identity.shopper).await?;
    Ok(Json(cart_response(&cart)))
}

/// POST /cart/items — add a product to the cart.
#[tracing::instrument(skip(state, req))]
pub async fn add_item<C, P, O, U>(
    State(state): State<Arc<AppState<C, P, O, U>>>,
    identity: Identity,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CartResponse>, ApiError>
where
    C: CartStore + 'static,
    P: ProductStore + 'static,
    O: OrderStore + 'static,
    U: UserStore + 'static,
{
    let cart = state
        .carts
        .add_item(
            &identity.shopper,
            &ProductId::new(req.product_id),
            req.quantity.unwrap_or(1),
        )
        .await?;
    Ok(Json(cart_response(&cart)))
}

/// PUT /cart/items/{product_id} — set a line's quantity exactly.
#[tracing::instrument(skip(state, req))]
pub async fn update_item<C, P, O, U>(
    State(state): State<Arc<AppState<C, P, O, U>>>,
    identity: Identity,
    Path(product_id): Path<String>,
    Json(req): Json<UpdateQuantityRequest>,
) -> Result<Json<CartResponse>, ApiError>
where
    C: CartStore + 'static,
    P: ProductStore + 'static,
    O: OrderStore + 'static,
    U: UserStore + 'static,
{
    let quantity = req.quantity.clamp(0, u32::MAX as i64) as u32;
    let cart = state
        .carts
        .update_quantity(&identity.shopper, &ProductId::new(product_id), quantity)
        .await?;
    Ok(Json(cart_response(&cart)))
}

/// DELETE /cart/items/{product_id} — remove a line (no-op when absent).
#[tracing::instrument(skip(state))]
pub async fn remove_item<C, P, O, U>(
    State(state): State<Arc<AppState<C, P, O, U>>>,
    identity: Identity,
    Path(product_id): Path<String>,
) -> Result<Json<CartResponse>, ApiError>
where
    C: CartStore + 'static,
    P: ProductStore + 'static,
    O: OrderStore + 'static,
    U: UserStore + 'static,
{
    let cart = state
        .carts
        .remove_item(&identity.shopper, &ProductId::new(product_id))
        .await?;
    Ok(Json(cart_response(&cart)))
}

/// DELETE /cart — empty the cart.
#[tracing::instrument(skip(state))]
pub async fn clear<C, P, O, U>(
    State(state): State<Arc<AppState<C, P, O, U>>>,
    identity: Identity,
) -> Result<Json<CartResponse>, ApiError>
where
    C: CartStore + 'static,
    P: ProductStore + 'static,
    O: OrderStore + 'static,
    U: UserStore + 'static,
{
    let cart = state.carts.clear(&identity.shopper).await?;
    Ok(Json(cart_response(&cart)))
}
