//! Storage ports for the aggregates.
//!
//! Each aggregate depends on an injected port rather than a concrete
//! database handle; the `store` crate provides in-memory and PostgreSQL
//! implementations. All implementations must be thread-safe (Send + Sync).

use async_trait::async_trait;
use common::{OrderId, ProductId, ShopperId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::Cart;
use crate::order::Order;
use crate::product::{Product, ProductFilter, ProductPage};
use crate::user::UserProfile;

/// Monotonic revision of a stored cart document, used for optimistic
/// concurrency control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(u64);

impl Revision {
    /// Creates a revision from a raw value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the revision assigned to a freshly created document.
    pub fn initial() -> Self {
        Self(1)
    }

    /// Returns the next revision.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw revision value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A cart together with the revision it was read at.
#[derive(Debug, Clone)]
pub struct CartRecord {
    pub cart: Cart,
    pub revision: Revision,
}

/// Errors that can occur when interacting with the backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A concurrent writer replaced the cart between our read and write.
    #[error("revision conflict for cart {shopper}: expected {expected}, found {actual}")]
    RevisionConflict {
        shopper: ShopperId,
        expected: Revision,
        actual: Revision,
    },

    /// The underlying store rejected or failed the call.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store call did not complete within the configured deadline.
    #[error("store call timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// A document could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns true for transient optimistic-concurrency conflicts that are
    /// worth retrying.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::RevisionConflict { .. })
    }
}

/// Persistence port for carts. One document per shopper identity.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Loads the shopper's cart, lazily creating an empty one when absent.
    ///
    /// The boolean reports whether a new cart was created by this call.
    async fn get_or_create(&self, shopper: &ShopperId)
    -> Result<(CartRecord, bool), StoreError>;

    /// Loads the shopper's cart without creating it.
    async fn get(&self, shopper: &ShopperId) -> Result<Option<CartRecord>, StoreError>;

    /// Replaces the stored cart iff its revision still equals `expected`.
    ///
    /// Returns the new revision on success, or `RevisionConflict` when
    /// another writer got there first.
    async fn replace(
        &self,
        shopper: &ShopperId,
        expected: Revision,
        cart: &Cart,
    ) -> Result<Revision, StoreError>;
}

/// Persistence port for orders. One document per order, append-mostly.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a newly created order.
    async fn insert(&self, order: &Order) -> Result<(), StoreError>;

    /// Loads an order by ID.
    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// All orders for one shopper, newest first.
    async fn for_shopper(&self, shopper: &ShopperId) -> Result<Vec<Order>, StoreError>;

    /// The most recent orders across all shoppers, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<Order>, StoreError>;

    /// Looks up the order linked to a provider payment ID, if any.
    async fn by_payment_id(&self, payment_id: &str) -> Result<Option<Order>, StoreError>;

    /// Persists status changes for an existing order.
    ///
    /// Returns false when no order with this ID exists.
    async fn update(&self, order: &Order) -> Result<bool, StoreError>;
}

/// Persistence port for the product catalog.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Loads a product by ID.
    async fn get(&self, id: &ProductId) -> Result<Option<Product>, StoreError>;

    /// Runs a filtered, sorted, paginated catalog query.
    async fn query(&self, filter: &ProductFilter) -> Result<ProductPage, StoreError>;

    /// Persists a new product.
    async fn insert(&self, product: &Product) -> Result<(), StoreError>;

    /// Replaces an existing product. Returns false when it does not exist.
    async fn update(&self, product: &Product) -> Result<bool, StoreError>;

    /// Deletes a product. Returns false when it does not exist.
    async fn delete(&self, id: &ProductId) -> Result<bool, StoreError>;
}

/// Persistence port for user profiles.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Loads a profile by identity.
    async fn get(&self, id: &ShopperId) -> Result<Option<UserProfile>, StoreError>;

    /// Creates or replaces a profile.
    async fn upsert(&self, profile: &UserProfile) -> Result<(), StoreError>;

    /// All profiles, newest first.
    async fn list(&self) -> Result<Vec<UserProfile>, StoreError>;
}
