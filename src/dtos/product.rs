// src/dtos/product.rs
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, FieldErrors};
use crate::models::product::{PhaseCategory, Product, ProductSpecifications, SystemType};
use crate::store::ProductFilter;

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    #[serde(rename = "type")]
    pub product_type: Option<String>,
    pub category: Option<String>,
}

impl ProductQuery {
    pub fn into_filter(self) -> Result<ProductFilter, AppError> {
        let mut errors = FieldErrors::new();
        let product_type = match self.product_type.as_deref() {
            Some(raw) => raw.parse::<SystemType>().map_err(|e| errors.insert("type".into(), e.to_string())).ok(),
            None => None,
        };
        let category = match self.category.as_deref() {
            Some(raw) => raw.parse::<PhaseCategory>().map_err(|e| errors.insert("category".into(), e.to_string())).ok(),
            None => None,
        };
        if !errors.is_empty() {
            return Err(AppError::invalid_fields(errors));
        }
        Ok(ProductFilter { product_type, category })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub product_type: SystemType,
    pub category: PhaseCategory,
    pub capacity: String,
    pub price: Decimal,
    pub rebate_eligible: bool,
    pub rebate_amount: Option<Decimal>,
    pub specifications: ProductSpecifications,
    pub warranty: String,
    pub popular: bool,
    pub created_at: Option<String>,
}

// Convert from Model to Response DTO
impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            product_type: product.product_type,
            category: product.category,
            capacity: product.capacity,
            price: product.price,
            rebate_eligible: product.rebate_eligible,
            rebate_amount: product.rebate_amount,
            specifications: product.specifications,
            warranty: product.warranty,
            popular: product.popular,
            created_at: product.created_at.map(|dt| dt.to_rfc3339()),
        }
    }
}
