//! Product lookup used to validate and decorate inquiries.
//!
//! The full catalog (pricing, categories, images) belongs to another
//! system; inquiries only need to know a product exists and what it is
//! called.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// Minimal product view denormalised onto inquiry responses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductSummary {
    /// Product id.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// Errors from catalog lookups.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Database operation failed.
    #[error("catalog database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Product fields failed validation.
    #[error("invalid product: {0}")]
    Invalid(String),
}

/// Read access to products.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Look up a product by id.
    async fn get(&self, id: &str) -> Result<Option<ProductSummary>, CatalogError>;

    /// `true` if the product exists.
    async fn exists(&self, id: &str) -> Result<bool, CatalogError> {
        Ok(self.get(id).await?.is_some())
    }

    /// Number of products.
    async fn count(&self) -> Result<u64, CatalogError>;
}

// ---------------------------------------------------------------------------
// SQLite
// ---------------------------------------------------------------------------

/// Catalog backed by the local `products` table.
#[derive(Debug, Clone)]
pub struct SqliteCatalog {
    db: SqlitePool,
}

impl SqliteCatalog {
    /// Wrap a migrated pool.
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Insert a product or rename an existing one.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Invalid`] for a blank id or name.
    pub async fn upsert(&self, id: &str, name: &str) -> Result<ProductSummary, CatalogError> {
        let id = id.trim();
        let name = name.trim();
        if id.is_empty() || name.is_empty() {
            return Err(CatalogError::Invalid(
                "product id and name must not be blank".to_owned(),
            ));
        }
        sqlx::query(
            "INSERT INTO products (id, name) VALUES (?1, ?2) \
             ON CONFLICT(id) DO UPDATE SET name = ?2",
        )
        .bind(id)
        .bind(name)
        .execute(&self.db)
        .await?;
        Ok(ProductSummary {
            id: id.to_owned(),
            name: name.to_owned(),
        })
    }
}

#[async_trait]
impl ProductCatalog for SqliteCatalog {
    async fn get(&self, id: &str) -> Result<Option<ProductSummary>, CatalogError> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT id, name FROM products WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.db)
                .await?;
        Ok(row.map(|(id, name)| ProductSummary { id, name }))
    }

    async fn count(&self) -> Result<u64, CatalogError> {
        let (n,): (i64,) = sqlx::query_as("SELECT count(*) FROM products")
            .fetch_one(&self.db)
            .await?;
        // count(*) is always non-negative.
        Ok(n.cast_unsigned())
    }
}

// ---------------------------------------------------------------------------
// Static
// ---------------------------------------------------------------------------

/// Fixed in-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    products: HashMap<String, ProductSummary>,
}

impl StaticCatalog {
    /// Build from `(id, name)` pairs.
    pub fn new<I, K, V>(products: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let products = products
            .into_iter()
            .map(|(id, name)| {
                let id = id.into();
                let summary = ProductSummary {
                    id: id.clone(),
                    name: name.into(),
                };
                (id, summary)
            })
            .collect();
        Self { products }
    }
}

#[async_trait]
impl ProductCatalog for StaticCatalog {
    async fn get(&self, id: &str) -> Result<Option<ProductSummary>, CatalogError> {
        Ok(self.products.get(id).cloned())
    }

    async fn count(&self) -> Result<u64, CatalogError> {
        Ok(u64::try_from(self.products.len()).unwrap_or(u64::MAX))
    }
}
