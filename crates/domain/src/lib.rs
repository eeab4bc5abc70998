//! Domain layer for the storefront service.
//!
//! This crate provides the core commerce abstractions:
//! - Product catalog types and the effective-price rule
//! - Cart aggregate with full total recomputation on every mutation
//! - Order aggregate with a forward-only status state machine
//! - Storage ports (`CartStore`, `OrderStore`, `ProductStore`, `UserStore`)
//!   implemented by the `store` crate
//! - Services wiring the aggregates to the ports

pub mod cart;
pub mod catalog;
pub mod error;
pub mod order;
pub mod ports;
pub mod product;
pub mod user;

pub use cart::{Cart, CartError, CartLineItem, CartService, MAX_REPLACE_ATTEMPTS};
pub use catalog::Catalog;
pub use error::DomainError;
pub use order::{Address, Order, OrderError, OrderService, OrderStatus, PaymentStatus};
pub use ports::{CartRecord, CartStore, OrderStore, ProductStore, Revision, StoreError, UserStore};
pub use product::{
    CatalogError, NewProduct, Product, ProductFilter, ProductPage, ProductSort, DEFAULT_PAGE_SIZE,
    MAX_PAGE_SIZE,
};
pub use user::{UserDirectory, UserProfile};
