pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::content::{Page, SiteSettings};
use crate::models::product::{PhaseCategory, Product, SystemType};
use crate::models::quote::{NewQuote, Quote};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Stored record is invalid: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                RepositoryError::Connection(err.to_string())
            }
            other => RepositoryError::Database(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub product_type: Option<SystemType>,
    pub category: Option<PhaseCategory>,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        self.product_type.map_or(true, |t| t == product.product_type)
            && self.category.map_or(true, |c| c == product.category)
    }
}

/// Read access to the product catalog.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Active products matching `filter`, popular ones first.
    async fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>, RepositoryError>;

    /// A single active product.
    async fn get_product(&self, id: i64) -> Result<Product, RepositoryError>;

    /// Products with the given ids whether active or not. Missing ids are
    /// simply absent from the result.
    async fn products_by_ids(&self, ids: &[i64]) -> Result<Vec<Product>, RepositoryError>;
}

#[async_trait]
pub trait QuoteStore: Send + Sync {
    async fn create_quote(&self, quote: NewQuote) -> Result<Quote, RepositoryError>;
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn get_page(&self, slug: &str) -> Result<Page, RepositoryError>;
    async fn get_site_settings(&self) -> Result<SiteSettings, RepositoryError>;
}
