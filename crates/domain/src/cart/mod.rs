//! Cart aggregate and related types.

mod service;

pub use service::{CartService, MAX_REPLACE_ATTEMPTS};

use chrono::{DateTime, Utc};
use common::{Money, ProductId, ShopperId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::product::Product;

/// Errors that can occur during cart mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// The product is not in the cart.
    #[error("item not found in cart: {product_id}")]
    ItemNotFound { product_id: ProductId },
}

/// One line in a cart: a product reference with quantity and the price,
/// name, and image captured when the product was (last) added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLineItem {
    /// The product this line refers to.
    pub product_id: ProductId,

    /// Display name snapshot.
    pub name: String,

    /// Primary image snapshot.
    pub image: String,

    /// Units of the product. Always at least 1.
    pub quantity: u32,

    /// Unit price snapshot, refreshed each time the product is re-added.
    pub unit_price: Money,
}

impl CartLineItem {
    /// Returns this line's contribution to the cart total.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// Cart aggregate root: one cart per shopper identity.
///
/// The total is derived state. It is recomputed from the line items on every
/// mutation rather than adjusted incrementally, so it can never drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    shopper: ShopperId,
    items: Vec<CartLineItem>,
    total: Money,
    updated_at: DateTime<Utc>,
}

impl Cart {
    /// Creates an empty cart for the shopper.
    pub fn empty(shopper: ShopperId) -> Self {
        Self {
            shopper,
            items: Vec::new(),
            total: Money::zero(),
            updated_at: Utc::now(),
        }
    }

    /// Returns the owning shopper identity.
    pub fn shopper(&self) -> &ShopperId {
        &self.shopper
    }

    /// Returns the line items.
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    /// Returns the derived total.
    pub fn total(&self) -> Money {
        self.total
    }

    /// Returns the time of the last mutation.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns true when the cart has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the line for a product, if present.
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLineItem> {
        self.items.iter().find(|i| &i.product_id == product_id)
    }

    /// Adds `quantity` units of a product.
    ///
    /// If the product is already in the cart the existing line's quantity is
    /// increased and its unit price is refreshed to the product's current
    /// effective price ("last add wins"). Otherwise a new line is appended
    /// with at least one unit.
    pub fn add_product(&mut self, product: &Product, quantity: u32) {
        let unit_price = product.effective_price();
        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|i| i.product_id == product.id)
        {
            existing.quantity += quantity;
            existing.unit_price = unit_price;
            existing.name = product.name.clone();
            existing.image = product.primary_image().to_string();
        } else {
            self.items.push(CartLineItem {
                product_id: product.id.clone(),
                name: product.name.clone(),
                image: product.primary_image().to_string(),
                quantity: quantity.max(1),
                unit_price,
            });
        }
        self.recompute();
    }

    /// Sets a line's quantity exactly. A quantity of zero removes the line.
    ///
    /// Fails with `ItemNotFound` when the product is not in the cart.
    pub fn set_quantity(&mut self, product_id: &ProductId, quantity: u32) -> Result<(), CartError> {
        let index = self
            .items
            .iter()
            .position(|i| &i.product_id == product_id)
            .ok_or_else(|| CartError::ItemNotFound {
                product_id: product_id.clone(),
            })?;

        if quantity == 0 {
            self.items.remove(index);
        } else if let Some(item) = self.items.get_mut(index) {
            item.quantity = quantity;
        }
        self.recompute();
        Ok(())
    }

    /// Removes a line. Removing a product that is not in the cart is a no-op.
    pub fn remove(&mut self, product_id: &ProductId) {
        let before = self.items.len();
        self.items.retain(|i| &i.product_id != product_id);
        if self.items.len() != before {
            self.recompute();
        }
    }

    /// Empties the cart.
    pub fn clear(&mut self) {
        self.items.clear();
        self.recompute();
    }

    fn recompute(&mut self) {
        self.total = self.items.iter().map(CartLineItem::line_total).sum();
        self.updated_at = Utc::now();
    }
}
