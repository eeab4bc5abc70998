//! Cart service: the mutation surface for the cart aggregate.
//!
//! Every mutation is a read-modify-write against the stored cart document,
//! guarded by the store's revision check so that two concurrent mutations on
//! the same cart serialize instead of clobbering each other.

use common::{ProductId, ShopperId};

use crate::cart::{Cart, CartError};
use crate::error::DomainError;
use crate::ports::{CartStore, ProductStore};

/// How many times a mutation is re-attempted after a revision conflict
/// before the conflict is surfaced to the caller.
pub const MAX_REPLACE_ATTEMPTS: usize = 3;

/// Service for reading and mutating shopper carts.
pub struct CartService<C, P> {
    carts: C,
    products: P,
}

impl<C: CartStore, P: ProductStore> CartService<C, P> {
    /// Creates a new cart service over the given stores.
    pub fn new(carts: C, products: P) -> Self {
        Self { carts, products }
    }

    /// Returns the shopper's cart, lazily creating an empty one on first
    /// touch.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, shopper: &ShopperId) -> Result<Cart, DomainError> {
        let (record, created) = self.carts.get_or_create(shopper).await?;
        if created {
            tracing::debug!(%shopper, "created empty cart");
        }
        Ok(record.cart)
    }

    /// Returns the shopper's cart without creating one, for callers that
    /// must not leave an empty cart behind (e.g. webhook processing).
    #[tracing::instrument(skip(self))]
    pub async fn peek(&self, shopper: &ShopperId) -> Result<Option<Cart>, DomainError> {
        Ok(self.carts.get(shopper).await?.map(|record| record.cart))
    }

    /// Adds `quantity` units of a product to the cart.
    ///
    /// The product is looked up in the catalog first; its current effective
    /// price, name, and image are snapshotted into the line.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        shopper: &ShopperId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Cart, DomainError> {
        let product = self
            .products
            .get(product_id)
            .await?
            .ok_or_else(|| DomainError::ProductNotFound {
                product_id: product_id.clone(),
            })?;

        metrics::counter!("cart_mutations_total", "op" => "add").increment(1);
        self.mutate(shopper, |cart| {
            cart.add_product(&product, quantity);
            Ok(())
        })
        .await
    }

    /// Sets a line's quantity exactly; zero removes the line.
    #[tracing::instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        shopper: &ShopperId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Cart, DomainError> {
        metrics::counter!("cart_mutations_total", "op" => "update").increment(1);
        self.mutate(shopper, |cart| cart.set_quantity(product_id, quantity))
            .await
    }

    /// Removes a line; removing an absent product is a no-op.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(
        &self,
        shopper: &ShopperId,
        product_id: &ProductId,
    ) -> Result<Cart, DomainError> {
        metrics::counter!("cart_mutations_total", "op" => "remove").increment(1);
        self.mutate(shopper, |cart| {
            cart.remove(product_id);
            Ok(())
        })
        .await
    }

    /// Empties the cart.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, shopper: &ShopperId) -> Result<Cart, DomainError> {
        metrics::counter!("cart_mutations_total", "op" => "clear").increment(1);
        self.mutate(shopper, |cart| {
            cart.clear();
            Ok(())
        })
        .await
    }

    /// Runs one atomic read-modify-write cycle, retrying on revision
    /// conflicts up to `MAX_REPLACE_ATTEMPTS` times.
    ///
    /// Validation failures from the mutation itself are returned immediately;
    /// retrying cannot change a validation outcome.
    async fn mutate<F>(&self, shopper: &ShopperId, mut apply: F) -> Result<Cart, DomainError>
    where
        F: FnMut(&mut Cart) -> Result<(), CartError>,
    {
        let mut attempt = 0;
        loop {
            let (mut record, _) = self.carts.get_or_create(shopper).await?;
            apply(&mut record.cart)?;

            match self
                .carts
                .replace(shopper, record.revision, &record.cart)
                .await
            {
                Ok(_) => return Ok(record.cart),
                Err(err) if err.is_conflict() && attempt + 1 < MAX_REPLACE_ATTEMPTS => {
                    attempt += 1;
                    metrics::counter!("cart_replace_conflicts_total").increment(1);
                    tracing::debug!(%shopper, attempt, "cart revision conflict, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}
