//! Product catalog: read-only queries plus the admin mutation surface.

use chrono::Utc;
use common::ProductId;

use crate::error::DomainError;
use crate::ports::ProductStore;
use crate::product::{NewProduct, Product, ProductFilter, ProductPage};

/// Service for catalog reads and admin product management.
///
/// The cart layer consumes only the read side, to fetch the authoritative
/// price/name/image at the moment an item is added.
pub struct Catalog<P> {
    products: P,
}

impl<P: ProductStore> Catalog<P> {
    /// Creates a new catalog over the given store.
    pub fn new(products: P) -> Self {
        Self { products }
    }

    /// Loads a product by ID. Returns None when it does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn product(&self, id: &ProductId) -> Result<Option<Product>, DomainError> {
        Ok(self.products.get(id).await?)
    }

    /// Runs a filtered, sorted, paginated catalog query.
    #[tracing::instrument(skip(self, filter))]
    pub async fn products(&self, filter: &ProductFilter) -> Result<ProductPage, DomainError> {
        Ok(self.products.query(filter).await?)
    }

    /// Creates a product under a fresh ID (admin).
    #[tracing::instrument(skip(self, new))]
    pub async fn create_product(&self, new: NewProduct) -> Result<Product, DomainError> {
        new.validate()?;
        let product = new.into_product(ProductId::generate());
        self.products.insert(&product).await?;
        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    /// Replaces an existing product's fields (admin), keeping its creation
    /// timestamp.
    #[tracing::instrument(skip(self, new))]
    pub async fn update_product(
        &self,
        id: &ProductId,
        new: NewProduct,
    ) -> Result<Product, DomainError> {
        new.validate()?;
        let existing = self
            .products
            .get(id)
            .await?
            .ok_or_else(|| DomainError::ProductNotFound {
                product_id: id.clone(),
            })?;

        let mut product = new.into_product(id.clone());
        product.created_at = existing.created_at;
        product.updated_at = Utc::now();

        if !self.products.update(&product).await? {
            return Err(DomainError::ProductNotFound {
                product_id: id.clone(),
            });
        }
        Ok(product)
    }

    /// Deletes a product (admin).
    #[tracing::instrument(skip(self))]
    pub async fn delete_product(&self, id: &ProductId) -> Result<(), DomainError> {
        if !self.products.delete(id).await? {
            return Err(DomainError::ProductNotFound {
                product_id: id.clone(),
            });
        }
        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }
}
