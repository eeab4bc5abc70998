//! In-memory store implementations for testing.
//!
//! These stores provide the same interface and conflict behavior as the
//! PostgreSQL implementations, including the revision check on cart
//! replacement.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, ProductId, ShopperId};
use domain::{
    Cart, CartRecord, CartStore, Order, OrderStore, Product, ProductFilter, ProductPage,
    ProductStore, Revision, StoreError, UserProfile, UserStore,
};
use tokio::sync::RwLock;

/// In-memory cart store keyed by shopper identity.
#[derive(Clone, Default)]
pub struct InMemoryCartStore {
    carts: Arc<RwLock<HashMap<ShopperId, (Revision, Cart)>>>,
}

impl InMemoryCartStore {
    /// Creates a new empty cart store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored carts.
    pub async fn cart_count(&self) -> usize {
        self.carts.read().await.len()
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn get_or_create(
        &self,
        shopper: &ShopperId,
    ) -> Result<(CartRecord, bool), StoreError> {
        let mut carts = self.carts.write().await;
        match carts.get(shopper) {
            Some((revision, cart)) => Ok((
                CartRecord {
                    cart: cart.clone(),
                    revision: *revision,
                },
                false,
            )),
            None => {
                let cart = Cart::empty(shopper.clone());
                carts.insert(shopper.clone(), (Revision::initial(), cart.clone()));
                Ok((
                    CartRecord {
                        cart,
                        revision: Revision::initial(),
                    },
                    true,
                ))
            }
        }
    }

    async fn get(&self, shopper: &ShopperId) -> Result<Option<CartRecord>, StoreError> {
        let carts = self.carts.read().await;
        Ok(carts.get(shopper).map(|(revision, cart)| CartRecord {
            cart: cart.clone(),
            revision: *revision,
        }))
    }

    async fn replace(
        &self,
        shopper: &ShopperId,
        expected: Revision,
        cart: &Cart,
    ) -> Result<Revision, StoreError> {
        let mut carts = self.carts.write().await;
        let entry = carts
            .get_mut(shopper)
            .ok_or_else(|| StoreError::RevisionConflict {
                shopper: shopper.clone(),
                expected,
                actual: Revision::new(0),
            })?;

        if entry.0 != expected {
            return Err(StoreError::RevisionConflict {
                shopper: shopper.clone(),
                expected,
                actual: entry.0,
            });
        }

        let next = expected.next();
        *entry = (next, cart.clone());
        Ok(next)
    }
}

/// In-memory order store.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }
}

fn newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| b.id().as_uuid().cmp(&a.id().as_uuid()))
    });
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: &Order) -> Result<(), StoreError> {
        self.orders.write().await.insert(order.id(), order.clone());
        Ok(())
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn for_shopper(&self, shopper: &ShopperId) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.read().await;
        let mut result: Vec<Order> = orders
            .values()
            .filter(|o| o.user_id() == shopper)
            .cloned()
            .collect();
        newest_first(&mut result);
        Ok(result)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.read().await;
        let mut result: Vec<Order> = orders.values().cloned().collect();
        newest_first(&mut result);
        result.truncate(limit);
        Ok(result)
    }

    async fn by_payment_id(&self, payment_id: &str) -> Result<Option<Order>, StoreError> {
        let orders = self.orders.read().await;
        Ok(orders
            .values()
            .find(|o| o.payment_id() == Some(payment_id))
            .cloned())
    }

    async fn update(&self, order: &Order) -> Result<bool, StoreError> {
        let mut orders = self.orders.write().await;
        if !orders.contains_key(&order.id()) {
            return Ok(false);
        }
        orders.insert(order.id(), order.clone());
        Ok(true)
    }
}

/// In-memory product store.
#[derive(Clone, Default)]
pub struct InMemoryProductStore {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
}

impl InMemoryProductStore {
    /// Creates a new empty product store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with the given products.
    pub async fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let store = Self::new();
        {
            let mut guard = store.products.write().await;
            for product in products {
                guard.insert(product.id.clone(), product);
            }
        }
        store
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn get(&self, id: &ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.products.read().await.get(id).cloned())
    }

    async fn query(&self, filter: &ProductFilter) -> Result<ProductPage, StoreError> {
        let products = self.products.read().await;
        let mut matches: Vec<Product> = products
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        matches.sort_by(|a, b| filter.sort.compare(a, b));

        let offset = filter.offset();
        let size = filter.page_size() as usize;
        let has_more = matches.len() > offset + size;
        let products = matches.into_iter().skip(offset).take(size).collect();

        Ok(ProductPage { products, has_more })
    }

    async fn insert(&self, product: &Product) -> Result<(), StoreError> {
        self.products
            .write()
            .await
            .insert(product.id.clone(), product.clone());
        Ok(())
    }

    async fn update(&self, product: &Product) -> Result<bool, StoreError> {
        let mut products = self.products.write().await;
        if !products.contains_key(&product.id) {
            return Ok(false);
        }
        products.insert(product.id.clone(), product.clone());
        Ok(true)
    }

    async fn delete(&self, id: &ProductId) -> Result<bool, StoreError> {
        Ok(self.products.write().await.remove(id).is_some())
    }
}

/// In-memory user profile store.
#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<ShopperId, UserProfile>>>,
}

impl InMemoryUserStore {
    /// Creates a new empty user store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get(&self, id: &ShopperId) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn upsert(&self, profile: &UserProfile) -> Result<(), StoreError> {
        self.users
            .write()
            .await
            .insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<UserProfile>, StoreError> {
        let users = self.users.read().await;
        let mut result: Vec<UserProfile> = users.values().cloned().collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;
    use domain::{NewProduct, ProductSort};

    fn product(id: &str, price_cents: i64, category: &str) -> Product {
        NewProduct {
            name: format!("Product {id}"),
            description: String::new(),
            price: Money::from_cents(price_cents),
            on_sale: false,
            sale_price: None,
            images: vec![],
            category: category.to_string(),
            stock: 5,
        }
        .into_product(ProductId::new(id))
    }

    #[tokio::test]
    async fn get_or_create_reports_creation_exactly_once() {
        let store = InMemoryCartStore::new();
        let shopper = ShopperId::new("s-1");

        let (record, created) = store.get_or_create(&shopper).await.unwrap();
        assert!(created);
        assert!(record.cart.is_empty());
        assert_eq!(record.revision, Revision::initial());

        let (_, created) = store.get_or_create(&shopper).await.unwrap();
        assert!(!created);
        assert_eq!(store.cart_count().await, 1);
    }

    #[tokio::test]
    async fn get_does_not_create() {
        let store = InMemoryCartStore::new();
        assert!(store.get(&ShopperId::new("s-1")).await.unwrap().is_none());
        assert_eq!(store.cart_count().await, 0);
    }

    #[tokio::test]
    async fn replace_with_stale_revision_conflicts() {
        let store = InMemoryCartStore::new();
        let shopper = ShopperId::new("s-1");
        let (record, _) = store.get_or_create(&shopper).await.unwrap();

        // A second writer commits first.
        store
            .replace(&shopper, record.revision, &record.cart)
            .await
            .unwrap();

        let err = store
            .replace(&shopper, record.revision, &record.cart)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn product_query_filters_sorts_and_paginates() {
        let store = InMemoryProductStore::with_products([
            product("A", 300, "books"),
            product("B", 100, "books"),
            product("C", 200, "books"),
            product("D", 50, "toys"),
        ])
        .await;

        let filter = ProductFilter {
            categories: vec!["books".to_string()],
            sort: ProductSort::PriceAsc,
            per_page: 2,
            ..ProductFilter::default()
        };
        let page = store.query(&filter).await.unwrap();
        assert_eq!(
            page.products
                .iter()
                .map(|p| p.id.as_str())
                .collect::<Vec<_>>(),
            ["B", "C"]
        );
        assert!(page.has_more);

        let page2 = store
            .query(&ProductFilter {
                page: 2,
                ..filter.clone()
            })
            .await
            .unwrap();
        assert_eq!(page2.products.len(), 1);
        assert_eq!(page2.products[0].id.as_str(), "A");
        assert!(!page2.has_more);
    }

    #[tokio::test]
    async fn update_and_delete_report_missing_products() {
        let store = InMemoryProductStore::new();
        let p = product("A", 100, "books");

        assert!(!store.update(&p).await.unwrap());
        assert!(!store.delete(&p.id).await.unwrap());

        store.insert(&p).await.unwrap();
        assert!(store.update(&p).await.unwrap());
        assert!(store.delete(&p.id).await.unwrap());
    }
}
