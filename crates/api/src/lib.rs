//! HTTP API server for the storefront service.
//!
//! Exposes the catalog, cart, checkout, order, user, and payment-webhook
//! surfaces over axum, with structured logging (tracing) and Prometheus
//! metrics. Identity arrives pre-authenticated via gateway headers; see
//! [`identity`].

pub mod config;
pub mod error;
pub mod identity;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use checkout::{CheckoutService, PaymentEventReducer, WebhookVerifier};
use domain::{
    CartService, CartStore, Catalog, OrderService, OrderStore, ProductStore, UserDirectory,
    UserStore,
};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{InMemoryCartStore, InMemoryOrderStore, InMemoryProductStore, InMemoryUserStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<C, P, O, U> {
    pub carts: CartService<C, P>,
    pub catalog: Catalog<P>,
    pub orders: OrderService<O>,
    pub checkout: CheckoutService<C, P, O>,
    pub reducer: PaymentEventReducer<C, P, O>,
    pub users: UserDirectory<U>,
    pub verifier: WebhookVerifier,
}

/// The state type used when no database is configured (and by tests).
pub type MemoryAppState =
    AppState<InMemoryCartStore, InMemoryProductStore, InMemoryOrderStore, InMemoryUserStore>;

/// Builds the application state from one instance of each store.
pub fn create_state<C, P, O, U>(
    carts: C,
    products: P,
    orders: O,
    users: U,
    verifier: WebhookVerifier,
) -> Arc<AppState<C, P, O, U>>
where
    C: CartStore + Clone,
    P: ProductStore + Clone,
    O: OrderStore + Clone,
    U: UserStore,
{
    Arc::new(AppState {
        carts: CartService::new(carts.clone(), products.clone()),
        catalog: Catalog::new(products.clone()),
        orders: OrderService::new(orders.clone()),
        checkout: CheckoutService::new(
            CartService::new(carts.clone(), products.clone()),
            OrderService::new(orders.clone()),
        ),
        reducer: PaymentEventReducer::new(CheckoutService::new(
            CartService::new(carts, products),
            OrderService::new(orders),
        )),
        users: UserDirectory::new(users),
        verifier,
    })
}

/// Builds state backed entirely by in-memory stores.
pub fn create_memory_state(verifier: WebhookVerifier) -> Arc<MemoryAppState> {
    create_state(
        InMemoryCartStore::new(),
        InMemoryProductStore::new(),
        InMemoryOrderStore::new(),
        InMemoryUserStore::new(),
        verifier,
    )
}

/// Creates the axum application router with all routes and shared state.
pub fn create_app<C, P, O, U>(
    state: Arc<AppState<C, P, O, U>>,
    metrics_handle: PrometheusHandle,
) -> Router
where
    C: CartStore + 'static,
    P: ProductStore + 'static,
    O: OrderStore + 'static,
    U: UserStore + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/products",
            get(routes::products::list::<C, P, O, U>).post(routes::products::create::<C, P, O, U>),
        )
        .route(
            "/products/{id}",
            get(routes::products::get::<C, P, O, U>)
                .put(routes::products::update::<C, P, O, U>)
                .delete(routes::products::delete::<C, P, O, U>),
        )
        .route(
            "/cart",
            get(routes::cart::get_cart::<C, P, O, U>).delete(routes::cart::clear::<C, P, O, U>),
        )
        .route("/cart/items", post(routes::cart::add_item::<C, P, O, U>))
        .route(
            "/cart/items/{product_id}",
            put(routes::cart::update_item::<C, P, O, U>)
                .delete(routes::cart::remove_item::<C, P, O, U>),
        )
        .route("/checkout", post(routes::orders::checkout::<C, P, O, U>))
        .route("/orders", get(routes::orders::list_mine::<C, P, O, U>))
        .route("/orders/{id}", get(routes::orders::get_one::<C, P, O, U>))
        .route(
            "/admin/orders",
            get(routes::orders::admin_list::<C, P, O, U>),
        )
        .route(
            "/admin/orders/{id}/status",
            put(routes::orders::admin_update_status::<C, P, O, U>),
        )
        .route(
            "/me/profile",
            get(routes::users::get_profile::<C, P, O, U>)
                .put(routes::users::put_profile::<C, P, O, U>),
        )
        .route("/admin/users", get(routes::users::admin_list::<C, P, O, U>))
        .route(
            "/admin/users/{id}/role",
            put(routes::users::admin_set_role::<C, P, O, U>),
        )
        .route(
            "/webhooks/payment",
            post(routes::webhook::receive::<C, P, O, U>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
