//! Price and rebate calculation for a quote selection.
//!
//! [`calculate`] is a pure function over the selection and the products it
//! references. [`price_selection`] loads those products from a
//! [`CatalogStore`] first.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::error::AppError;
use crate::models::product::{PhaseCategory, PowerSupply, Product, SystemType};
use crate::models::selection::QuoteSelection;
use crate::store::CatalogStore;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("product {id} is not an available {system} product")]
    ProductUnavailable { system: SystemType, id: i64 },

    #[error("product {id} is a {found} product, not {system}")]
    WrongType { system: SystemType, id: i64, found: SystemType },

    #[error("product {id} needs {category} supply but the property has {supply} phase")]
    PhaseMismatch {
        system: SystemType,
        id: i64,
        category: PhaseCategory,
        supply: PowerSupply,
    },
}

impl PricingError {
    pub fn system(&self) -> SystemType {
        match self {
            PricingError::ProductUnavailable { system, .. }
            | PricingError::WrongType { system, .. }
            | PricingError::PhaseMismatch { system, .. } => *system,
        }
    }

    /// Request field the error belongs to.
    pub fn field(&self) -> &'static str {
        self.system().product_field()
    }
}

/// Contribution of one selected system to the quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemBreakdown {
    pub system: SystemType,
    pub product_id: Option<i64>,
    pub product_name: Option<String>,
    pub subtotal: Decimal,
    pub rebate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingResult {
    pub total_price: Decimal,
    pub rebate_amount: Decimal,
    pub final_price: Decimal,
    pub breakdown: Vec<SystemBreakdown>,
}

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Prices `selection` against `products`.
///
/// Every chosen product of a selected system must be present in `products`,
/// active, of that system's type and compatible with the power supply.
/// Selected systems without a chosen product contribute zero, and chosen
/// products of unselected systems are ignored.
pub fn calculate(selection: &QuoteSelection, products: &[Product]) -> Result<PricingResult, PricingError> {
    let supply = selection.power_supply().unwrap_or(PowerSupply::Unknown);
    let mut total = Decimal::ZERO;
    let mut rebate = Decimal::ZERO;
    let mut breakdown = Vec::with_capacity(selection.systems().len());

    for &system in selection.systems() {
        let Some(id) = selection.product_for(system) else {
            breakdown.push(SystemBreakdown {
                system,
                product_id: None,
                product_name: None,
                subtotal: Decimal::ZERO,
                rebate: Decimal::ZERO,
            });
            continue;
        };

        let product = products
            .iter()
            .find(|p| p.id == id && p.active)
            .ok_or(PricingError::ProductUnavailable { system, id })?;
        if product.product_type != system {
            return Err(PricingError::WrongType { system, id, found: product.product_type });
        }
        if !supply.admits(product.category) {
            return Err(PricingError::PhaseMismatch { system, id, category: product.category, supply });
        }

        let subtotal = round_money(product.price);
        let sub_rebate = round_money(product.rebate());
        total += subtotal;
        rebate += sub_rebate;
        breakdown.push(SystemBreakdown {
            system,
            product_id: Some(id),
            product_name: Some(product.name.clone()),
            subtotal,
            rebate: sub_rebate,
        });
    }

    let final_price = (total - rebate).max(Decimal::ZERO);
    Ok(PricingResult { total_price: total, rebate_amount: rebate, final_price, breakdown })
}

/// Loads the products a selection references and prices it.
pub async fn price_selection(
    catalog: &dyn CatalogStore,
    selection: &QuoteSelection,
) -> Result<PricingResult, AppError> {
    let ids: Vec<i64> = selection.chosen_products().map(|(_, id)| id).collect();
    let products = catalog.products_by_ids(&ids).await?;
    let result = calculate(selection, &products)?;
    debug!(total = %result.total_price, rebate = %result.rebate_amount, "Priced selection");
    Ok(result)
}
