// src/dtos/pricing.rs
use std::collections::BTreeSet;

use serde::Deserialize;

use crate::error::{AppError, FieldErrors};
use crate::models::product::{PowerSupply, SystemType};
use crate::models::selection::QuoteSelection;

/// Product choice per system as sent by the browser.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductChoices {
    pub solar_package: Option<i64>,
    pub battery_system: Option<i64>,
    pub ev_charger: Option<i64>,
}

impl ProductChoices {
    pub fn for_system(&self, system: SystemType) -> Option<i64> {
        match system {
            SystemType::Solar => self.solar_package,
            SystemType::Battery => self.battery_system,
            SystemType::EvCharger => self.ev_charger,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingRequest {
    #[serde(default)]
    pub selected_systems: Vec<String>,
    pub power_supply: Option<String>,
    #[serde(flatten)]
    pub products: ProductChoices,
}

pub(crate) fn parse_systems(raw: &[String], errors: &mut FieldErrors) -> BTreeSet<SystemType> {
    let mut systems = BTreeSet::new();
    for value in raw {
        match value.parse::<SystemType>() {
            Ok(system) => {
                systems.insert(system);
            }
            Err(e) => {
                errors.insert("systems".into(), e.to_string());
            }
        }
    }
    systems
}

pub(crate) fn parse_power_supply(raw: &str, errors: &mut FieldErrors) -> Option<PowerSupply> {
    match raw.parse::<PowerSupply>() {
        Ok(supply) => Some(supply),
        Err(e) => {
            errors.insert("powerSupply".into(), e.to_string());
            None
        }
    }
}

impl PricingRequest {
    /// Builds the selection to price. Products named for systems that are not
    /// selected are dropped.
    pub fn into_selection(self) -> Result<QuoteSelection, AppError> {
        let mut errors = FieldErrors::new();
        let systems = parse_systems(&self.selected_systems, &mut errors);
        let power_supply = match self.power_supply.as_deref() {
            Some(raw) => parse_power_supply(raw, &mut errors),
            None => {
                errors.insert("powerSupply".into(), "Power supply is required".into());
                None
            }
        };
        if !errors.is_empty() {
            return Err(AppError::invalid_fields(errors));
        }

        let products = &self.products;
        let chosen = SystemType::ALL
            .into_iter()
            .filter_map(|system| products.for_system(system).map(|id| (system, id)));
        Ok(QuoteSelection::with_products(systems, power_supply, chosen))
    }
}
