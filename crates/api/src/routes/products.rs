//! Product catalog endpoints: public reads plus the admin mutation surface.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{Money, ProductId};
use domain::{
    CartStore, NewProduct, OrderStore, Product, ProductFilter, ProductPage, ProductSort,
    ProductStore, UserStore,
};
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiError;
use crate::identity::Admin;

/// Query parameters for GET /products.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Comma-separated category list.
    pub categories: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub in_stock: Option<bool>,
    pub on_sale: Option<bool>,
    pub search: Option<String>,
    pub sort: Option<ProductSort>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ListQuery {
    fn into_filter(self) -> ProductFilter {
        let defaults = ProductFilter::default();
        ProductFilter {
            categories: self
                .categories
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|c| !c.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            min_price: self.min_price.map(Money::from_cents),
            max_price: self.max_price.map(Money::from_cents),
            in_stock: self.in_stock,
            on_sale: self.on_sale,
            search: self.search,
            sort: self.sort.unwrap_or_default(),
            page: self.page.unwrap_or(defaults.page),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        }
    }
}

/// GET /products — filtered, sorted, paginated catalog listing.
#[tracing::instrument(skip(state, query))]
pub async fn list<C, P, O, U>(
    State(state): State<Arc<AppState<C, P, O, U>>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ProductPage>, ApiError>
where
    C: CartStore + 'static,
    P: ProductStore + 'static,
    O: OrderStore + 'static,
    U: UserStore + 'static,
{
    let page = state.catalog.products(&query.into_filter()).await?;
    Ok(Json(page))
}

/// GET /products/{id} — a single product.
#[tracing::instrument(skip(state))]
pub async fn get<C, P, O, U>(
    State(state): State<Arc<AppState<C, P, O, U>>>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError>
where
    C: CartStore + 'static,
    P: ProductStore + 'static,
    O: OrderStore + 'static,
    U: UserStore + 'static,
{
    let id = ProductId::new(id);
    state
        .catalog
        .product(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("product not found: {id}")))
}

/// POST /products — create a product (admin).
#[tracing::instrument(skip(state, new))]
pub async fn create<C, P, O, U>(
    State(state): State<Arc<AppState<C, P, O, U>>>,
    _admin: Admin,
    Json(new): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>), ApiError>
where
    C: CartStore + 'static,
    P: ProductStore + 'static,
    O: OrderStore + 'static,
    U: UserStore + 'static,
{
    let product = state.catalog.create_product(new).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /products/{id} — replace a product's fields (admin).
#[tracing::instrument(skip(state, new))]
pub async fn update<C, P, O, U>(
    State(state): State<Arc<AppState<C, P, O, U>>>,
    _admin: Admin,
    Path(id): Path<String>,
    Json(new): Json<NewProduct>,
) -> Result<Json<Product>, ApiError>
where
    C: CartStore + 'static,
    P: ProductStore + 'static,
    O: OrderStore + 'static,
    U: UserStore + 'static,
{
    let product = state
        .catalog
        .update_product(&ProductId::new(id), new)
        .await?;
    Ok(Json(product))
}

/// DELETE /products/{id} — delete a product (admin).
#[tracing::instrument(skip(state))]
pub async fn delete<C, P, O, U>(
    State(state): State<Arc<AppState<C, P, O, U>>>,
    _admin: Admin,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
    C: CartStore + 'static,
    P: ProductStore + 'static,
    O: OrderStore + 'static,
    U: UserStore + 'static,
{
    state.catalog.delete_product(&ProductId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
