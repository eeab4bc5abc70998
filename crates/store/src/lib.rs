//! Store implementations for the storefront storage ports.
//!
//! Two backends are provided:
//! - [`memory`] — in-memory stores used by tests and local development
//! - [`postgres`] — PostgreSQL document tables with a revision column for
//!   optimistic concurrency

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryCartStore, InMemoryOrderStore, InMemoryProductStore, InMemoryUserStore};
pub use postgres::{
    PostgresCartStore, PostgresOrderStore, PostgresProductStore, PostgresUserStore, connect,
    run_migrations, DEFAULT_CALL_TIMEOUT,
};
