//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use checkout::WebhookVerifier;
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

const WEBHOOK_SECRET: &str = "whsec_test";

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> (axum::Router, Arc<api::MemoryAppState>) {
    let state = api::create_memory_state(WebhookVerifier::new(WEBHOOK_SECRET));
    let app = api::create_app(state.clone(), get_metrics_handle());
    (app, state)
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn shopper_request(method: &str, uri: &str, shopper: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-shopper-id", shopper)
        .header("content-type", "application/json");
    match body {
        Some(json) => builder.body(Body::from(json.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn admin_request(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-admin", "true")
        .header("content-type", "application/json");
    match body {
        Some(json) => builder.body(Body::from(json.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Seeds one product through the admin API and returns its ID.
async fn seed_product(app: &axum::Router, name: &str, price_cents: i64) -> String {
    let response = app
        .clone()
        .oneshot(admin_request(
            "POST",
            "/products",
            Some(serde_json::json!({
                "name": name,
                "price": price_cents,
                "category": "gadgets",
                "stock": 10,
                "images": ["widget.jpg"]
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = response_json(response).await;
    json["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn cart_routes_require_an_identity() {
    let (app, _) = setup();

    let response = app
        .oneshot(Request::builder().uri("/cart").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn product_mutations_require_the_admin_flag() {
    let (app, _) = setup();

    let response = app
        .oneshot(json_request(
            "POST",
            "/products",
            serde_json::json!({"name": "Widget", "price": 1000, "category": "gadgets"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn products_can_be_created_listed_and_filtered() {
    let (app, _) = setup();

    seed_product(&app, "Cheap Widget", 500).await;
    seed_product(&app, "Pricey Widget", 5000).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/products?sort=price-asc&per_page=10")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    let products = json["products"].as_array().unwrap();
    assert_eq!(products.len(), 2);
    assert_eq!(products[0]["name"], "Cheap Widget");
    assert_eq!(json["has_more"], false);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/products?max_price=1000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = response_json(response).await;
    assert_eq!(json["products"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_product_returns_404_on_add_to_cart() {
    let (app, _) = setup();

    let response = app
        .oneshot(shopper_request(
            "POST",
            "/cart/items",
            "s-1",
            Some(serde_json::json!({"product_id": "ghost"})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cart_flow_add_update_remove() {
    let (app, _) = setup();
    let product_id = seed_product(&app, "Widget", 1000).await;

    // Add two units.
    let response = app
        .clone()
        .oneshot(shopper_request(
            "POST",
            "/cart/items",
            "s-1",
            Some(serde_json::json!({"product_id": product_id, "quantity": 2})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["total_cents"], 2000);

    // Set the quantity to five.
    let response = app
        .clone()
        .oneshot(shopper_request(
            "PUT",
            &format!("/cart/items/{product_id}"),
            "s-1",
            Some(serde_json::json!({"quantity": 5})),
        ))
        .await
        .unwrap();
    let json = response_json(response).await;
    assert_eq!(json["total_cents"], 5000);

    // Remove the line.
    let response = app
        .clone()
        .oneshot(shopper_request(
            "DELETE",
            &format!("/cart/items/{product_id}"),
            "s-1",
            None,
        ))
        .await
        .unwrap();
    let json = response_json(response).await;
    assert_eq!(json["items"].as_array().unwrap().len(), 0);
    assert_eq!(json["total_cents"], 0);
}

#[tokio::test]
async fn checkout_creates_an_order_and_empties_the_cart() {
    let (app, _) = setup();
    let product_id = seed_product(&app, "Widget", 999).await;

    app.clone()
        .oneshot(shopper_request(
            "POST",
            "/cart/items",
            "s-1",
            Some(serde_json::json!({"product_id": product_id, "quantity": 3})),
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(shopper_request(
            "POST",
            "/checkout",
            "s-1",
            Some(serde_json::json!({
                "shipping_address": {"street": "1 Main St", "city": "Springfield"},
                "billing_address": {"street": "2 Oak Ave"}
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let order = response_json(response).await;
    assert_eq!(order["total_cents"], 2997);
    assert_eq!(order["status"], "pending");
    assert_eq!(order["payment_status"], "pending");

    // The cart is empty afterwards.
    let response = app
        .clone()
        .oneshot(shopper_request("GET", "/cart", "s-1", None))
        .await
        .unwrap();
    let cart = response_json(response).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 0);

    // The order shows up in the shopper's list.
    let response = app
        .oneshot(shopper_request("GET", "/orders", "s-1", None))
        .await
        .unwrap();
    let orders = response_json(response).await;
    assert_eq!(orders.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn checkout_with_an_empty_cart_is_rejected() {
    let (app, _) = setup();

    let response = app
        .oneshot(shopper_request(
            "POST",
            "/checkout",
            "s-1",
            Some(serde_json::json!({
                "shipping_address": {},
                "billing_address": {}
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn shoppers_cannot_read_each_others_orders() {
    let (app, _) = setup();
    let product_id = seed_product(&app, "Widget", 1000).await;

    app.clone()
        .oneshot(shopper_request(
            "POST",
            "/cart/items",
            "s-1",
            Some(serde_json::json!({"product_id": product_id})),
        ))
        .await
        .unwrap();
    let response = app
        .clone()
        .oneshot(shopper_request(
            "POST",
            "/checkout",
            "s-1",
            Some(serde_json::json!({"shipping_address": {}, "billing_address": {}})),
        ))
        .await
        .unwrap();
    let order = response_json(response).await;
    let order_id = order["id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(shopper_request(
            "GET",
            &format!("/orders/{order_id}"),
            "someone-else",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_status_updates_enforce_the_state_machine() {
    let (app, _) = setup();
    let product_id = seed_product(&app, "Widget", 1000).await;

    app.clone()
        .oneshot(shopper_request(
            "POST",
            "/cart/items",
            "s-1",
            Some(serde_json::json!({"product_id": product_id})),
        ))
        .await
        .unwrap();
    let response = app
        .clone()
        .oneshot(shopper_request(
            "POST",
            "/checkout",
            "s-1",
            Some(serde_json::json!({"shipping_address": {}, "billing_address": {}})),
        ))
        .await
        .unwrap();
    let order = response_json(response).await;
    let order_id = order["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(admin_request(
            "PUT",
            &format!("/admin/orders/{order_id}/status"),
            Some(serde_json::json!({"status": "processing"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Skipping straight to delivered is rejected.
    let response = app
        .oneshot(admin_request(
            "PUT",
            &format!("/admin/orders/{order_id}/status"),
            Some(serde_json::json!({"status": "delivered"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn webhook_with_a_valid_signature_finalizes_the_order() {
    let (app, _) = setup();
    let product_id = seed_product(&app, "Widget", 999).await;

    app.clone()
        .oneshot(shopper_request(
            "POST",
            "/cart/items",
            "shopper@example.com",
            Some(serde_json::json!({"product_id": product_id, "quantity": 3})),
        ))
        .await
        .unwrap();

    let body = serde_json::json!({
        "id": "evt_1",
        "type": "checkout.session.completed",
        "data": {
            "session_id": "cs_1",
            "payment_id": "pi_1",
            "amount_total": 2997,
            "metadata": {"user_id": "shopper@example.com"}
        }
    })
    .to_string();
    let signature = WebhookVerifier::new(WEBHOOK_SECRET).sign(body.as_bytes(), chrono::Utc::now());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/payment")
                .header("x-webhook-signature", &signature)
                .header("content-type", "application/json")
                .body(Body::from(body.clone()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["received"], true);

    let response = app
        .oneshot(shopper_request("GET", "/orders", "shopper@example.com", None))
        .await
        .unwrap();
    let orders = response_json(response).await;
    let orders = orders.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["payment_status"], "paid");
    assert_eq!(orders[0]["payment_id"], "pi_1");
}

#[tokio::test]
async fn webhook_with_a_bad_signature_is_rejected() {
    let (app, _) = setup();

    let body = serde_json::json!({"id": "evt_1", "type": "checkout.session.completed",
        "data": {"session_id": "cs_1", "metadata": {"user_id": "s-1"}}})
    .to_string();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/payment")
                .header("x-webhook-signature", "t=0,v1=deadbeef")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn profile_roundtrip_and_admin_listing() {
    let (app, _) = setup();

    let response = app
        .clone()
        .oneshot(shopper_request("GET", "/me/profile", "s-1", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(shopper_request(
            "PUT",
            "/me/profile",
            "s-1",
            Some(serde_json::json!({"email": "s1@example.com", "display_name": "Shopper One"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let profile = response_json(response).await;
    assert_eq!(profile["is_admin"], false);

    let response = app
        .clone()
        .oneshot(admin_request(
            "PUT",
            "/admin/users/s-1/role",
            Some(serde_json::json!({"is_admin": true})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(admin_request("GET", "/admin/users", None))
        .await
        .unwrap();
    let users = response_json(response).await;
    assert_eq!(users.as_array().unwrap().len(), 1);
    assert_eq!(users[0]["is_admin"], true);
}
