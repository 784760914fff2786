use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use tracing::instrument;

use super::{CatalogStore, ContentStore, ProductFilter, QuoteStore, RepositoryError};
use crate::models::content::{Page, SiteSettings};
use crate::models::product::{Product, ProductSpecifications};
use crate::models::quote::{ContactDetails, NewQuote, Quote};
use crate::models::ParseValueError;

const PRODUCT_COLUMNS: &str = "id, name, product_type, category, capacity, price, rebate_eligible,
    rebate_amount, specifications, warranty, popular, active, created_at";

const QUOTE_COLUMNS: &str = "id, first_name, last_name, email, phone, address, suburb, postcode,
    state, notes, systems, power_supply, solar_package_id, battery_system_id, ev_charger_id,
    total_price, rebate_amount, final_price, photo_path, status, created_at, updated_at";

/// PostgreSQL-backed implementation of every store trait.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    product_type: String,
    category: String,
    capacity: String,
    price: Decimal,
    rebate_eligible: bool,
    rebate_amount: Option<Decimal>,
    specifications: serde_json::Value,
    warranty: String,
    popular: bool,
    active: bool,
    created_at: Option<DateTime<Utc>>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let corrupt = move |detail: String| RepositoryError::Corrupt(format!("product {id}: {detail}"));

        let specifications: ProductSpecifications =
            serde_json::from_value(row.specifications).map_err(|e| corrupt(e.to_string()))?;
        let product_type = row.product_type.parse().map_err(|e: ParseValueError| corrupt(e.to_string()))?;
        let category = row.category.parse().map_err(|e: ParseValueError| corrupt(e.to_string()))?;

        let product = Product {
            id,
            name: row.name,
            product_type,
            category,
            capacity: row.capacity,
            price: row.price,
            rebate_eligible: row.rebate_eligible,
            rebate_amount: row.rebate_amount,
            specifications,
            warranty: row.warranty,
            popular: row.popular,
            active: row.active,
            created_at: row.created_at,
        };
        product.validate().map_err(|e| corrupt(e.to_string()))?;
        Ok(product)
    }
}

#[derive(FromRow)]
struct QuoteRow {
    id: i64,
    first_name: String,
    last_name: String,
    email: String,
    phone: Option<String>,
    address: String,
    suburb: String,
    postcode: String,
    state: Option<String>,
    notes: Option<String>,
    systems: Vec<String>,
    power_supply: String,
    solar_package_id: Option<i64>,
    battery_system_id: Option<i64>,
    ev_charger_id: Option<i64>,
    total_price: Decimal,
    rebate_amount: Decimal,
    final_price: Decimal,
    photo_path: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<QuoteRow> for Quote {
    type Error = RepositoryError;

    fn try_from(row: QuoteRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let corrupt = move |e: ParseValueError| RepositoryError::Corrupt(format!("quote {id}: {e}"));

        let systems = row
            .systems
            .iter()
            .map(|s| s.parse())
            .collect::<Result<Vec<_>, _>>()
            .map_err(corrupt)?;

        Ok(Quote {
            id,
            contact: ContactDetails {
                first_name: row.first_name,
                last_name: row.last_name,
                email: row.email,
                phone: row.phone,
                address: row.address,
                suburb: row.suburb,
                postcode: row.postcode,
                state: row.state,
                notes: row.notes,
            },
            systems,
            power_supply: row.power_supply.parse().map_err(corrupt)?,
            solar_package_id: row.solar_package_id,
            battery_system_id: row.battery_system_id,
            ev_charger_id: row.ev_charger_id,
            total_price: row.total_price,
            rebate_amount: row.rebate_amount,
            final_price: row.final_price,
            photo_path: row.photo_path,
            status: row.status.parse().map_err(corrupt)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct PageRow {
    slug: String,
    title: String,
    description: Option<String>,
    blocks: serde_json::Value,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(FromRow)]
struct SiteSettingsRow {
    header: serde_json::Value,
    theme: serde_json::Value,
}

#[async_trait]
impl CatalogStore for PgStore {
    #[instrument(skip(self))]
    async fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE active
               AND ($1::TEXT IS NULL OR product_type = $1)
               AND ($2::TEXT IS NULL OR category = $2)
             ORDER BY popular DESC, price ASC, id"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(filter.product_type.map(|t| t.as_str()))
            .bind(filter.category.map(|c| c.as_str()))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn get_product(&self, id: i64) -> Result<Product, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 AND active");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        Product::try_from(row)
    }

    #[instrument(skip(self))]
    async fn products_by_ids(&self, ids: &[i64]) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)");
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Product::try_from).collect()
    }
}

#[async_trait]
impl QuoteStore for PgStore {
    #[instrument(skip(self, quote))]
    async fn create_quote(&self, quote: NewQuote) -> Result<Quote, RepositoryError> {
        let sql = format!(
            "INSERT INTO quotes (first_name, last_name, email, phone, address, suburb, postcode,
                 state, notes, systems, power_supply, solar_package_id, battery_system_id,
                 ev_charger_id, total_price, rebate_amount, final_price, photo_path, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, 'pending')
             RETURNING {QUOTE_COLUMNS}"
        );
        let systems: Vec<String> = quote.systems.iter().map(|s| s.as_str().to_string()).collect();
        let contact = quote.contact;

        let row = sqlx::query_as::<_, QuoteRow>(&sql)
            .bind(contact.first_name)
            .bind(contact.last_name)
            .bind(contact.email)
            .bind(contact.phone)
            .bind(contact.address)
            .bind(contact.suburb)
            .bind(contact.postcode)
            .bind(contact.state)
            .bind(contact.notes)
            .bind(systems)
            .bind(quote.power_supply.as_str())
            .bind(quote.solar_package_id)
            .bind(quote.battery_system_id)
            .bind(quote.ev_charger_id)
            .bind(quote.total_price)
            .bind(quote.rebate_amount)
            .bind(quote.final_price)
            .bind(quote.photo_path)
            .fetch_one(&self.pool)
            .await?;

        Quote::try_from(row)
    }
}

#[async_trait]
impl ContentStore for PgStore {
    #[instrument(skip(self))]
    async fn get_page(&self, slug: &str) -> Result<Page, RepositoryError> {
        let row = sqlx::query_as::<_, PageRow>(
            "SELECT slug, title, description, blocks, updated_at
             FROM pages WHERE slug = $1 AND published",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let blocks = Page::parse_blocks(row.blocks)
            .map_err(|e| RepositoryError::Corrupt(format!("page {}: {e}", row.slug)))?;

        Ok(Page {
            slug: row.slug,
            title: row.title,
            description: row.description,
            blocks,
            updated_at: row.updated_at,
        })
    }

    #[instrument(skip(self))]
    async fn get_site_settings(&self) -> Result<SiteSettings, RepositoryError> {
        let row = sqlx::query_as::<_, SiteSettingsRow>("SELECT header, theme FROM site_settings WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        SiteSettings::parse(row.header, row.theme)
            .map_err(|e| RepositoryError::Corrupt(format!("site settings: {e}")))
    }
}
