//! Checkout and order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::OrderId;
use domain::{Address, CartStore, Order, OrderStatus, OrderStore, ProductStore, UserStore};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;
use crate::identity::{Admin, Identity};
use crate::routes::cart::CartItemResponse;

// -- Request types --

#[derive(Deserialize)]
pub struct CheckoutRequest {
    pub shipping_address: Address,
    pub billing_address: Address,
    /// Provider payment ID when the charge already happened out-of-band.
    #[serde(default)]
    pub payment_id: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub items: Vec<CartItemResponse>,
    pub total_cents: i64,
    pub status: OrderStatus,
    pub payment_status: domain::PaymentStatus,
    pub payment_id: Option<String>,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub created_at: DateTime<Utc>,
}

pub(crate) fn order_response(order: &Order) -> OrderResponse {
    OrderResponse {
        id: order.id().to_string(),
        user_id: order.user_id().to_string(),
        items: order
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
        total_cents: order.total().cents(),
        status: order.status(),
        payment_status: order.payment_status(),
        payment_id: order.payment_id().map(str::to_string),
        shipping_address: order.shipping_address().clone(),
        billing_address: order.billing_address().clone(),
        created_at: order.created_at(),
    }
}

// -- Handlers --

/// POST /checkout — create an order from the shopper's cart.
#[tracing::instrument(skip(state, req))]
pub async fn checkout<C, P, O, U>(
    State(state): State<Arc<AppState<C, P, O, U>>>,
    identity: Identity,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError>
where
    C: CartStore + 'static,
    P: ProductStore + 'static,
    O: OrderStore + 'static,
    U: UserStore + 'static,
{
    let order = state
        .checkout
        .checkout(
            &identity.shopper,
            req.shipping_address,
            req.billing_address,
            req.payment_id,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(order_response(&order))))
}

/// GET /orders — the shopper's orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list_mine<C, P, O, U>(
    State(state): State<Arc<AppState<C, P, O, U>>>,
    identity: Identity,
) -> Result<Json<Vec<OrderResponse>>, ApiError>
where
    C: CartStore + 'static,
    P: ProductStore + 'static,
    O: OrderStore + 'static,
    U: UserStore + 'static,
{
    let orders = state.orders.orders_for(&identity.shopper).await?;
    Ok(Json(orders.iter().map(order_response).collect()))
}

/// GET /orders/{id} — one order; shoppers only see their own.
#[tracing::instrument(skip(state))]
pub async fn get_one<C, P, O, U>(
    State(state): State<Arc<AppState<C, P, O, U>>>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ApiError>
where
    C: CartStore + 'static,
    P: ProductStore + 'static,
    O: OrderStore + 'static,
    U: UserStore + 'static,
{
    let order_id = OrderId::from_uuid(id);
    let order = state
        .orders
        .order(order_id)
        .await?
        .filter(|order| identity.is_admin || order.user_id() == &identity.shopper)
        .ok_or_else(|| ApiError::NotFound(format!("order not found: {order_id}")))?;
    Ok(Json(order_response(&order)))
}

/// GET /admin/orders — the most recent orders across all shoppers (admin).
#[tracing::instrument(skip(state))]
pub async fn admin_list<C, P, O, U>(
    State(state): State<Arc<AppState<C, P, O, U>>>,
    _admin: Admin,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<OrderResponse>>, ApiError>
where
    C: CartStore + 'static,
    P: ProductStore + 'static,
    O: OrderStore + 'static,
    U: UserStore + 'static,
{
    let limit = query.limit.unwrap_or(20).min(100);
    let orders = state.orders.recent(limit).await?;
    Ok(Json(orders.iter().map(order_response).collect()))
}

/// PUT /admin/orders/{id}/status — advance an order's status (admin).
#[tracing::instrument(skip(state, req))]
pub async fn admin_update_status<C, P, O, U>(
    State(state): State<Arc<AppState<C, P, O, U>>>,
    _admin: Admin,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError>
where
    C: CartStore + 'static,
    P: ProductStore + 'static,
    O: OrderStore + 'static,
    U: UserStore + 'static,
{
    let order = state
        .orders
        .update_status(OrderId::from_uuid(id), req.status)
        .await?;
    Ok(Json(order_response(&order)))
}
