//! Product catalog types.

use chrono::{DateTime, Utc};
use common::{Money, ProductId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of products per catalog page.
pub const DEFAULT_PAGE_SIZE: u32 = 12;

/// Upper bound on the requested page size.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A catalog product.
///
/// Products are owned by the catalog/admin component; carts and orders only
/// ever hold snapshots of the fields they need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique product identifier.
    pub id: ProductId,

    /// Display name.
    pub name: String,

    /// Long-form description.
    pub description: String,

    /// List price. Never negative.
    pub price: Money,

    /// Whether the sale price currently applies.
    pub on_sale: bool,

    /// Discounted price; only honored while `on_sale` is set.
    pub sale_price: Option<Money>,

    /// Image references, first entry is the primary image.
    pub images: Vec<String>,

    /// Category the product is filed under.
    pub category: String,

    /// Units in stock. Never negative.
    pub stock: u32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price a shopper pays right now: the sale price while the
    /// product is on sale and one is set, the list price otherwise.
    pub fn effective_price(&self) -> Money {
        match (self.on_sale, self.sale_price) {
            (true, Some(sale)) => sale,
            _ => self.price,
        }
    }

    /// Returns true while at least one unit is in stock.
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Returns the primary image reference, or an empty string when the
    /// product has no images.
    pub fn primary_image(&self) -> &str {
        self.images.first().map(String::as_str).unwrap_or("")
    }
}

/// Validation errors raised by catalog admin operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// Price must not be negative.
    #[error("invalid price: {price} (must not be negative)")]
    InvalidPrice { price: Money },

    /// Sale price must not exceed the list price.
    #[error("sale price {sale_price} exceeds list price {price}")]
    SalePriceAboveList { sale_price: Money, price: Money },
}

/// Fields accepted when creating or replacing a product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    #[serde(default)]
    pub on_sale: bool,
    #[serde(default)]
    pub sale_price: Option<Money>,
    #[serde(default)]
    pub images: Vec<String>,
    pub category: String,
    #[serde(default)]
    pub stock: u32,
}

impl NewProduct {
    /// Checks the price invariants: list price non-negative, sale price
    /// non-negative and at most the list price.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.price.is_negative() {
            return Err(CatalogError::InvalidPrice { price: self.price });
        }
        if let Some(sale_price) = self.sale_price {
            if sale_price.is_negative() {
                return Err(CatalogError::InvalidPrice { price: sale_price });
            }
            if sale_price > self.price {
                return Err(CatalogError::SalePriceAboveList {
                    sale_price,
                    price: self.price,
                });
            }
        }
        Ok(())
    }

    /// Builds the stored product under the given ID, stamping both timestamps
    /// with the current time.
    pub fn into_product(self, id: ProductId) -> Product {
        let now = Utc::now();
        Product {
            id,
            name: self.name,
            description: self.description,
            price: self.price,
            on_sale: self.on_sale,
            sale_price: self.sale_price,
            images: self.images,
            category: self.category,
            stock: self.stock,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Sort order for catalog queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductSort {
    /// Cheapest list price first.
    PriceAsc,
    /// Highest list price first.
    PriceDesc,
    /// Most recently created first.
    #[default]
    Newest,
}

impl ProductSort {
    /// Comparison function for the given sort order.
    pub fn compare(self, a: &Product, b: &Product) -> std::cmp::Ordering {
        match self {
            ProductSort::PriceAsc => a.price.cmp(&b.price),
            ProductSort::PriceDesc => b.price.cmp(&a.price),
            ProductSort::Newest => b.created_at.cmp(&a.created_at),
        }
    }
}

/// Filter, sort, and pagination parameters for catalog queries.
#[derive(Debug, Clone)]
pub struct ProductFilter {
    /// Match any of these categories; empty means all categories.
    pub categories: Vec<String>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    pub in_stock: Option<bool>,
    pub on_sale: Option<bool>,
    /// Case-insensitive substring match on the product name.
    pub search: Option<String>,
    pub sort: ProductSort,
    /// 1-based page number.
    pub page: u32,
    pub per_page: u32,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            categories: Vec::new(),
            min_price: None,
            max_price: None,
            in_stock: None,
            on_sale: None,
            search: None,
            sort: ProductSort::default(),
            page: 1,
            per_page: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ProductFilter {
    /// Returns the page size clamped to `1..=MAX_PAGE_SIZE`.
    pub fn page_size(&self) -> u32 {
        self.per_page.clamp(1, MAX_PAGE_SIZE)
    }

    /// Returns the number of products to skip before the requested page.
    pub fn offset(&self) -> usize {
        ((self.page.max(1) - 1) * self.page_size()) as usize
    }

    /// Returns true when the product passes every filter predicate.
    ///
    /// Sorting and pagination are applied by the store on top of this.
    pub fn matches(&self, product: &Product) -> bool {
        if !self.categories.is_empty() && !self.categories.contains(&product.category) {
            return false;
        }
        if let Some(min) = self.min_price
            && product.price < min
        {
            return false;
        }
        if let Some(max) = self.max_price
            && product.price > max
        {
            return false;
        }
        if let Some(in_stock) = self.in_stock
            && product.in_stock() != in_stock
        {
            return false;
        }
        if let Some(on_sale) = self.on_sale
            && product.on_sale != on_sale
        {
            return false;
        }
        if let Some(ref search) = self.search {
            let needle = search.to_lowercase();
            if !product.name.to_lowercase().contains(&needle) {
                return false;
            }
        }
        true
    }
}

/// One page of catalog query results.
#[derive(Debug, Clone, Serialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    /// True when another page follows this one.
    pub has_more: bool,
}
