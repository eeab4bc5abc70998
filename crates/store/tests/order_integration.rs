//! Order aggregate tests over the in-memory stores.

use common::{Money, OrderId, ProductId, ShopperId};
use domain::{
    Address, Cart, DomainError, NewProduct, OrderError, OrderService, OrderStatus, PaymentStatus,
    Product,
};
use store::InMemoryOrderStore;

fn product(id: &str, price_cents: i64) -> Product {
    NewProduct {
        name: format!("Product {id}"),
        description: String::new(),
        price: Money::from_cents(price_cents),
        on_sale: false,
        sale_price: None,
        images: vec![],
        category: "test".to_string(),
        stock: 10,
    }
    .into_product(ProductId::new(id))
}

fn cart_for(shopper: &str, lines: &[(&str, i64, u32)]) -> Cart {
    let mut cart = Cart::empty(ShopperId::new(shopper));
    for (id, cents, qty) in lines {
        cart.add_product(&product(id, *cents), *qty);
    }
    cart
}

fn shipping() -> Address {
    Address {
        street: "1 Main St".to_string(),
        city: "Springfield".to_string(),
        state: "IL".to_string(),
        postal_code: "62704".to_string(),
        country: "US".to_string(),
    }
}

#[tokio::test]
async fn create_copies_the_cart_snapshot() {
    let store = InMemoryOrderStore::new();
    let service = OrderService::new(store.clone());
    let cart = cart_for("s-1", &[("A", 1000, 2), ("B", 500, 1)]);

    let order = service
        .create(&cart, shipping(), Address::default(), None)
        .await
        .unwrap();

    assert_eq!(order.total(), Money::from_cents(2500));
    assert_eq!(order.items().len(), 2);
    assert_eq!(order.status(), OrderStatus::Pending);
    assert_eq!(order.payment_status(), PaymentStatus::Pending);

    let stored = service.order(order.id()).await.unwrap().unwrap();
    assert_eq!(stored, order);
}

#[tokio::test]
async fn create_from_empty_cart_fails_without_persisting() {
    let store = InMemoryOrderStore::new();
    let service = OrderService::new(store.clone());
    let cart = Cart::empty(ShopperId::new("s-1"));

    let err = service
        .create(&cart, Address::default(), Address::default(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::Order(OrderError::EmptyCart)));
    assert_eq!(store.order_count().await, 0);
}

#[tokio::test]
async fn orders_for_a_shopper_come_newest_first() {
    let store = InMemoryOrderStore::new();
    let service = OrderService::new(store.clone());

    let first = service
        .create(
            &cart_for("s-1", &[("A", 1000, 1)]),
            shipping(),
            Address::default(),
            None,
        )
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = service
        .create(
            &cart_for("s-1", &[("B", 500, 2)]),
            shipping(),
            Address::default(),
            None,
        )
        .await
        .unwrap();

    // A different shopper's order must not show up.
    service
        .create(
            &cart_for("s-2", &[("A", 1000, 1)]),
            shipping(),
            Address::default(),
            None,
        )
        .await
        .unwrap();

    let orders = service.orders_for(&ShopperId::new("s-1")).await.unwrap();
    assert_eq!(
        orders.iter().map(|o| o.id()).collect::<Vec<_>>(),
        [second.id(), first.id()]
    );

    let recent = service.recent(2).await.unwrap();
    assert_eq!(recent.len(), 2);
}

#[tokio::test]
async fn status_updates_follow_the_state_machine() {
    let store = InMemoryOrderStore::new();
    let service = OrderService::new(store);
    let order = service
        .create(
            &cart_for("s-1", &[("A", 1000, 1)]),
            shipping(),
            Address::default(),
            None,
        )
        .await
        .unwrap();

    let order = service
        .update_status(order.id(), OrderStatus::Processing)
        .await
        .unwrap();
    assert_eq!(order.status(), OrderStatus::Processing);

    let order = service
        .update_status(order.id(), OrderStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(order.status(), OrderStatus::Cancelled);

    let err = service
        .update_status(order.id(), OrderStatus::Delivered)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::Order(OrderError::InvalidTransition { .. })
    ));

    // The stored order is untouched by the rejected transition.
    let stored = service.order(order.id()).await.unwrap().unwrap();
    assert_eq!(stored.status(), OrderStatus::Cancelled);
}

#[tokio::test]
async fn update_status_on_missing_order_fails() {
    let store = InMemoryOrderStore::new();
    let service = OrderService::new(store);

    let err = service
        .update_status(OrderId::new(), OrderStatus::Processing)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::OrderNotFound { .. }));
}

#[tokio::test]
async fn orders_are_found_by_payment_id() {
    let store = InMemoryOrderStore::new();
    let service = OrderService::new(store);

    let order = service
        .create(
            &cart_for("s-1", &[("A", 1000, 1)]),
            shipping(),
            Address::default(),
            Some("pi_123".to_string()),
        )
        .await
        .unwrap();

    assert_eq!(order.payment_status(), PaymentStatus::Paid);
    let found = service.by_payment_id("pi_123").await.unwrap().unwrap();
    assert_eq!(found.id(), order.id());
    assert!(service.by_payment_id("pi_999").await.unwrap().is_none());
}
