//! PostgreSQL-backed store implementations.
//!
//! Each aggregate lives in its own document table: a JSONB `doc` column
//! plus the handful of denormalized columns the queries filter on. Carts
//! carry a `revision` column checked on every replace for optimistic
//! concurrency. Every call runs under a configurable deadline and surfaces
//! expiry as `StoreError::Timeout` instead of hanging.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use common::{OrderId, ProductId, ShopperId};
use domain::{
    Cart, CartRecord, CartStore, Order, OrderStore, Product, ProductFilter, ProductPage,
    ProductSort, ProductStore, Revision, StoreError, UserProfile, UserStore,
};
use sqlx::{PgPool, Row, postgres::PgRow};

/// Default per-call deadline for store queries.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a connection pool against the given database URL.
pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Runs the database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}

/// Awaits a store query under a deadline, mapping failures to `StoreError`.
async fn bounded<T, F>(deadline: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(StoreError::Unavailable(err.to_string())),
        Err(_) => Err(StoreError::Timeout(deadline)),
    }
}

fn row_error(err: sqlx::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

fn doc_column<T: serde::de::DeserializeOwned>(row: &PgRow) -> Result<T, StoreError> {
    let doc: serde_json::Value = row.try_get("doc").map_err(row_error)?;
    Ok(serde_json::from_value(doc)?)
}

/// PostgreSQL cart store. One row per shopper.
#[derive(Clone)]
pub struct PostgresCartStore {
    pool: PgPool,
    call_timeout: Duration,
}

impl PostgresCartStore {
    /// Creates a cart store with the default call timeout.
    pub fn new(pool: PgPool) -> Self {
        Self::with_timeout(pool, DEFAULT_CALL_TIMEOUT)
    }

    /// Creates a cart store with an explicit per-call timeout.
    pub fn with_timeout(pool: PgPool, call_timeout: Duration) -> Self {
        Self { pool, call_timeout }
    }
}

#[async_trait]
impl CartStore for PostgresCartStore {
    async fn get_or_create(
        &self,
        shopper: &ShopperId,
    ) -> Result<(CartRecord, bool), StoreError> {
        let cart = Cart::empty(shopper.clone());
        let doc = serde_json::to_value(&cart)?;

        let inserted = bounded(self.call_timeout, async {
            sqlx::query(
                "INSERT INTO carts (shopper_id, revision, doc) VALUES ($1, 1, $2) \
                 ON CONFLICT (shopper_id) DO NOTHING",
            )
            .bind(shopper.as_str())
            .bind(&doc)
            .execute(&self.pool)
            .await
        })
        .await?;

        if inserted.rows_affected() == 1 {
            return Ok((
                CartRecord {
                    cart,
                    revision: Revision::initial(),
                },
                true,
            ));
        }

        let row = bounded(self.call_timeout, async {
            sqlx::query("SELECT revision, doc FROM carts WHERE shopper_id = $1")
                .bind(shopper.as_str())
                .fetch_one(&self.pool)
                .await
        })
        .await?;

        let revision = Revision::new(row.try_get::<i64, _>("revision").map_err(row_error)? as u64);
        Ok((
            CartRecord {
                cart: doc_column(&row)?,
                revision,
            },
            false,
        ))
    }

    async fn get(&self, shopper: &ShopperId) -> Result<Option<CartRecord>, StoreError> {
        let row = bounded(self.call_timeout, async {
            sqlx::query("SELECT revision, doc FROM carts WHERE shopper_id = $1")
                .bind(shopper.as_str())
                .fetch_optional(&self.pool)
                .await
        })
        .await?;

        match row {
            Some(row) => {
                let revision =
                    Revision::new(row.try_get::<i64, _>("revision").map_err(row_error)? as u64);
                Ok(Some(CartRecord {
                    cart: doc_column(&row)?,
                    revision,
                }))
            }
            None => Ok(None),
        }
    }

    async fn replace(
        &self,
        shopper: &ShopperId,
        expected: Revision,
        cart: &Cart,
    ) -> Result<Revision, StoreError> {
        let doc = serde_json::to_value(cart)?;

        let row = bounded(self.call_timeout, async {
            sqlx::query(
                "UPDATE carts SET revision = revision + 1, doc = $3 \
                 WHERE shopper_id = $1 AND revision = $2 RETURNING revision",
            )
            .bind(shopper.as_str())
            .bind(expected.as_u64() as i64)
            .bind(&doc)
            .fetch_optional(&self.pool)
            .await
        })
        .await?;

        match row {
            Some(row) => Ok(Revision::new(
                row.try_get::<i64, _>("revision").map_err(row_error)? as u64,
            )),
            None => {
                // The revision moved under us; report what is stored now.
                let actual: Option<i64> = bounded(self.call_timeout, async {
                    sqlx::query_scalar("SELECT revision FROM carts WHERE shopper_id = $1")
                        .bind(shopper.as_str())
                        .fetch_optional(&self.pool)
                        .await
                })
                .await?;

                Err(StoreError::RevisionConflict {
                    shopper: shopper.clone(),
                    expected,
                    actual: Revision::new(actual.unwrap_or(0) as u64),
                })
            }
        }
    }
}

/// PostgreSQL order store.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
    call_timeout: Duration,
}

impl PostgresOrderStore {
    /// Creates an order store with the default call timeout.
    pub fn new(pool: PgPool) -> Self {
        Self::with_timeout(pool, DEFAULT_CALL_TIMEOUT)
    }

    /// Creates an order store with an explicit per-call timeout.
    pub fn with_timeout(pool: PgPool, call_timeout: Duration) -> Self {
        Self { pool, call_timeout }
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn insert(&self, order: &Order) -> Result<(), StoreError> {
        let doc = serde_json::to_value(order)?;

        bounded(self.call_timeout, async {
            sqlx::query(
                "INSERT INTO orders (id, shopper_id, payment_id, created_at, doc) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(order.id().as_uuid())
            .bind(order.user_id().as_str())
            .bind(order.payment_id())
            .bind(order.created_at())
            .bind(&doc)
            .execute(&self.pool)
            .await
        })
        .await?;
        Ok(())
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = bounded(self.call_timeout, async {
            sqlx::query("SELECT doc FROM orders WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
        })
        .await?;

        row.map(|row| doc_column(&row)).transpose()
    }

    async fn for_shopper(&self, shopper: &ShopperId) -> Result<Vec<Order>, StoreError> {
        let rows = bounded(self.call_timeout, async {
            sqlx::query("SELECT doc FROM orders WHERE shopper_id = $1 ORDER BY created_at DESC")
                .bind(shopper.as_str())
                .fetch_all(&self.pool)
                .await
        })
        .await?;

        rows.iter().map(doc_column).collect()
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Order>, StoreError> {
        let rows = bounded(self.call_timeout, async {
            sqlx::query("SELECT doc FROM orders ORDER BY created_at DESC LIMIT $1")
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await
        })
        .await?;

        rows.iter().map(doc_column).collect()
    }

    async fn by_payment_id(&self, payment_id: &str) -> Result<Option<Order>, StoreError> {
        let row = bounded(self.call_timeout, async {
            sqlx::query("SELECT doc FROM orders WHERE payment_id = $1 LIMIT 1")
                .bind(payment_id)
                .fetch_optional(&self.pool)
                .await
        })
        .await?;

        row.map(|row| doc_column(&row)).transpose()
    }

    async fn update(&self, order: &Order) -> Result<bool, StoreError> {
        let doc = serde_json::to_value(order)?;

        let result = bounded(self.call_timeout, async {
            sqlx::query("UPDATE orders SET doc = $2, payment_id = $3 WHERE id = $1")
                .bind(order.id().as_uuid())
                .bind(&doc)
                .bind(order.payment_id())
                .execute(&self.pool)
                .await
        })
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// PostgreSQL product store.
#[derive(Clone)]
pub struct PostgresProductStore {
    pool: PgPool,
    call_timeout: Duration,
}

impl PostgresProductStore {
    /// Creates a product store with the default call timeout.
    pub fn new(pool: PgPool) -> Self {
        Self::with_timeout(pool, DEFAULT_CALL_TIMEOUT)
    }

    /// Creates a product store with an explicit per-call timeout.
    pub fn with_timeout(pool: PgPool, call_timeout: Duration) -> Self {
        Self { pool, call_timeout }
    }
}

#[async_trait]
impl ProductStore for PostgresProductStore {
    async fn get(&self, id: &ProductId) -> Result<Option<Product>, StoreError> {
        let row = bounded(self.call_timeout, async {
            sqlx::query("SELECT doc FROM products WHERE id = $1")
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await
        })
        .await?;

        row.map(|row| doc_column(&row)).transpose()
    }

    async fn query(&self, filter: &ProductFilter) -> Result<ProductPage, StoreError> {
        let order_by = match filter.sort {
            ProductSort::PriceAsc => "price_cents ASC",
            ProductSort::PriceDesc => "price_cents DESC",
            ProductSort::Newest => "created_at DESC",
        };
        let sql = format!(
            "SELECT doc FROM products \
             WHERE ($1::text[] IS NULL OR category = ANY($1)) \
               AND ($2::bigint IS NULL OR price_cents >= $2) \
               AND ($3::bigint IS NULL OR price_cents <= $3) \
               AND ($4::bool IS NULL OR ((doc->>'stock')::int > 0) = $4) \
               AND ($5::bool IS NULL OR (doc->>'on_sale')::bool = $5) \
               AND ($6::text IS NULL OR doc->>'name' ILIKE '%' || $6 || '%') \
             ORDER BY {order_by} LIMIT $7 OFFSET $8"
        );

        let categories = if filter.categories.is_empty() {
            None
        } else {
            Some(filter.categories.clone())
        };
        let size = filter.page_size() as i64;

        let rows = bounded(self.call_timeout, async {
            sqlx::query(&sql)
                .bind(categories)
                .bind(filter.min_price.map(|m| m.cents()))
                .bind(filter.max_price.map(|m| m.cents()))
                .bind(filter.in_stock)
                .bind(filter.on_sale)
                .bind(filter.search.as_deref())
                // Fetch one extra row to learn whether another page follows.
                .bind(size + 1)
                .bind(filter.offset() as i64)
                .fetch_all(&self.pool)
                .await
        })
        .await?;

        let has_more = rows.len() as i64 > size;
        let products: Vec<Product> = rows
            .iter()
            .take(size as usize)
            .map(doc_column)
            .collect::<Result<_, _>>()?;

        Ok(ProductPage { products, has_more })
    }

    async fn insert(&self, product: &Product) -> Result<(), StoreError> {
        let doc = serde_json::to_value(product)?;

        bounded(self.call_timeout, async {
            sqlx::query(
                "INSERT INTO products (id, category, price_cents, created_at, doc) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(product.id.as_str())
            .bind(&product.category)
            .bind(product.price.cents())
            .bind(product.created_at)
            .bind(&doc)
            .execute(&self.pool)
            .await
        })
        .await?;
        Ok(())
    }

    async fn update(&self, product: &Product) -> Result<bool, StoreError> {
        let doc = serde_json::to_value(product)?;

        let result = bounded(self.call_timeout, async {
            sqlx::query(
                "UPDATE products SET category = $2, price_cents = $3, doc = $4 WHERE id = $1",
            )
            .bind(product.id.as_str())
            .bind(&product.category)
            .bind(product.price.cents())
            .bind(&doc)
            .execute(&self.pool)
            .await
        })
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: &ProductId) -> Result<bool, StoreError> {
        let result = bounded(self.call_timeout, async {
            sqlx::query("DELETE FROM products WHERE id = $1")
                .bind(id.as_str())
                .execute(&self.pool)
                .await
        })
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// PostgreSQL user profile store.
#[derive(Clone)]
pub struct PostgresUserStore {
    pool: PgPool,
    call_timeout: Duration,
}

impl PostgresUserStore {
    /// Creates a user store with the default call timeout.
    pub fn new(pool: PgPool) -> Self {
        Self::with_timeout(pool, DEFAULT_CALL_TIMEOUT)
    }

    /// Creates a user store with an explicit per-call timeout.
    pub fn with_timeout(pool: PgPool, call_timeout: Duration) -> Self {
        Self { pool, call_timeout }
    }
}

#[async_trait]
impl UserStore for PostgresUserStore {
    async fn get(&self, id: &ShopperId) -> Result<Option<UserProfile>, StoreError> {
        let row = bounded(self.call_timeout, async {
            sqlx::query("SELECT doc FROM users WHERE id = $1")
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await
        })
        .await?;

        row.map(|row| doc_column(&row)).transpose()
    }

    async fn upsert(&self, profile: &UserProfile) -> Result<(), StoreError> {
        let doc = serde_json::to_value(profile)?;

        bounded(self.call_timeout, async {
            sqlx::query(
                "INSERT INTO users (id, created_at, doc) VALUES ($1, $2, $3) \
                 ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc",
            )
            .bind(profile.id.as_str())
            .bind(profile.created_at)
            .bind(&doc)
            .execute(&self.pool)
            .await
        })
        .await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<UserProfile>, StoreError> {
        let rows = bounded(self.call_timeout, async {
            sqlx::query("SELECT doc FROM users ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await
        })
        .await?;

        rows.iter().map(doc_column).collect()
    }
}
