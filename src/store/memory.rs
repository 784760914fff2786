use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use super::{CatalogStore, ContentStore, ProductFilter, QuoteStore, RepositoryError};
use crate::models::content::{Page, SiteSettings};
use crate::models::product::Product;
use crate::models::quote::{NewQuote, Quote, QuoteStatus};

/// Store kept entirely in process memory, used by the test suites.
#[derive(Default)]
pub struct MemoryStore {
    products: RwLock<Vec<Product>>,
    quotes: RwLock<Vec<Quote>>,
    pages: RwLock<HashMap<String, Page>>,
    site: RwLock<Option<SiteSettings>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let store = Self::new();
        store.products.write().extend(products);
        store
    }

    pub fn insert_page(&self, page: Page) {
        self.pages.write().insert(page.slug.clone(), page);
    }

    pub fn set_site_settings(&self, settings: SiteSettings) {
        *self.site.write() = Some(settings);
    }

    /// Makes every subsequent write fail as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn quotes(&self) -> Vec<Quote> {
        self.quotes.read().clone()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let mut products: Vec<Product> = self
            .products
            .read()
            .iter()
            .filter(|p| p.active && filter.matches(p))
            .cloned()
            .collect();
        products.sort_by(|a, b| b.popular.cmp(&a.popular).then(a.price.cmp(&b.price)).then(a.id.cmp(&b.id)));
        Ok(products)
    }

    async fn get_product(&self, id: i64) -> Result<Product, RepositoryError> {
        self.products
            .read()
            .iter()
            .find(|p| p.id == id && p.active)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn products_by_ids(&self, ids: &[i64]) -> Result<Vec<Product>, RepositoryError> {
        Ok(self.products.read().iter().filter(|p| ids.contains(&p.id)).cloned().collect())
    }
}

#[async_trait]
impl QuoteStore for MemoryStore {
    async fn create_quote(&self, quote: NewQuote) -> Result<Quote, RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Connection("store unavailable".to_string()));
        }
        let mut quotes = self.quotes.write();
        let now = Utc::now();
        let stored = Quote {
            id: quotes.len() as i64 + 1,
            contact: quote.contact,
            systems: quote.systems,
            power_supply: quote.power_supply,
            solar_package_id: quote.solar_package_id,
            battery_system_id: quote.battery_system_id,
            ev_charger_id: quote.ev_charger_id,
            total_price: quote.total_price,
            rebate_amount: quote.rebate_amount,
            final_price: quote.final_price,
            photo_path: quote.photo_path,
            status: QuoteStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        quotes.push(stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn get_page(&self, slug: &str) -> Result<Page, RepositoryError> {
        self.pages.read().get(slug).cloned().ok_or(RepositoryError::NotFound)
    }

    async fn get_site_settings(&self) -> Result<SiteSettings, RepositoryError> {
        self.site.read().clone().ok_or(RepositoryError::NotFound)
    }
}
