use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ParseValueError;

/// The independently selectable system kinds a customer can ask a quote for.
///
/// The order of the variants is the order systems appear in a price breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemType {
    Solar,
    Battery,
    #[serde(alias = "ev")]
    EvCharger,
}

impl SystemType {
    pub const ALL: [SystemType; 3] = [SystemType::Solar, SystemType::Battery, SystemType::EvCharger];

    pub fn as_str(self) -> &'static str {
        match self {
            SystemType::Solar => "solar",
            SystemType::Battery => "battery",
            SystemType::EvCharger => "ev_charger",
        }
    }

    /// Name of the request field carrying the chosen product for this system.
    pub fn product_field(self) -> &'static str {
        match self {
            SystemType::Solar => "solarPackage",
            SystemType::Battery => "batterySystem",
            SystemType::EvCharger => "evCharger",
        }
    }
}

impl fmt::Display for SystemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SystemType {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "solar" => Ok(SystemType::Solar),
            "battery" => Ok(SystemType::Battery),
            "ev" | "ev_charger" => Ok(SystemType::EvCharger),
            other => Err(ParseValueError::new("system type", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseCategory {
    SinglePhase,
    ThreePhase,
}

impl PhaseCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            PhaseCategory::SinglePhase => "single_phase",
            PhaseCategory::ThreePhase => "three_phase",
        }
    }
}

impl fmt::Display for PhaseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhaseCategory {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "single_phase" => Ok(PhaseCategory::SinglePhase),
            "three_phase" => Ok(PhaseCategory::ThreePhase),
            other => Err(ParseValueError::new("phase category", other)),
        }
    }
}

/// Electrical service at the property, as reported by the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerSupply {
    Single,
    Three,
    Unknown,
}

impl PowerSupply {
    pub fn as_str(self) -> &'static str {
        match self {
            PowerSupply::Single => "single",
            PowerSupply::Three => "three",
            PowerSupply::Unknown => "unknown",
        }
    }

    /// Whether a product built for `category` can be installed on this supply.
    /// An unknown supply admits either phase.
    pub fn admits(self, category: PhaseCategory) -> bool {
        match self {
            PowerSupply::Single => category == PhaseCategory::SinglePhase,
            PowerSupply::Three => category == PhaseCategory::ThreePhase,
            PowerSupply::Unknown => true,
        }
    }
}

impl fmt::Display for PowerSupply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PowerSupply {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "single" => Ok(PowerSupply::Single),
            "three" => Ok(PowerSupply::Three),
            "unknown" => Ok(PowerSupply::Unknown),
            other => Err(ParseValueError::new("power supply", other)),
        }
    }
}

/// Technical details shown on a product card. The tag must match the
/// product's [`SystemType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ProductSpecifications {
    Solar {
        panel_count: u32,
        panel_wattage: u32,
        inverter: String,
    },
    Battery {
        usable_kwh: Decimal,
        chemistry: String,
        #[serde(default)]
        inverter: Option<String>,
    },
    EvCharger {
        kw_rating: Decimal,
        connector: String,
    },
}

impl ProductSpecifications {
    pub fn system(&self) -> SystemType {
        match self {
            ProductSpecifications::Solar { .. } => SystemType::Solar,
            ProductSpecifications::Battery { .. } => SystemType::Battery,
            ProductSpecifications::EvCharger { .. } => SystemType::EvCharger,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductInvariantError {
    #[error("price must not be negative")]
    NegativePrice,
    #[error("rebate-eligible product has no rebate amount")]
    MissingRebate,
    #[error("rebate amount must be between zero and the price")]
    RebateOutOfRange,
    #[error("specifications describe a {found} product, not {expected}")]
    SpecificationMismatch { expected: SystemType, found: SystemType },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub product_type: SystemType,
    pub category: PhaseCategory,
    pub capacity: String,
    pub price: Decimal,
    pub rebate_eligible: bool,
    pub rebate_amount: Option<Decimal>,
    pub specifications: ProductSpecifications,
    pub warranty: String,
    pub popular: bool,
    pub active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl Product {
    pub fn validate(&self) -> Result<(), ProductInvariantError> {
        if self.price.is_sign_negative() {
            return Err(ProductInvariantError::NegativePrice);
        }
        if self.rebate_eligible {
            let amount = self.rebate_amount.ok_or(ProductInvariantError::MissingRebate)?;
            if amount.is_sign_negative() || amount > self.price {
                return Err(ProductInvariantError::RebateOutOfRange);
            }
        }
        let found = self.specifications.system();
        if found != self.product_type {
            return Err(ProductInvariantError::SpecificationMismatch {
                expected: self.product_type,
                found,
            });
        }
        Ok(())
    }

    /// Rebate this product contributes to a quote; zero unless eligible.
    pub fn rebate(&self) -> Decimal {
        if self.rebate_eligible {
            self.rebate_amount.unwrap_or(Decimal::ZERO)
        } else {
            Decimal::ZERO
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use rust_decimal::Decimal;

    use super::*;

    pub fn product(id: i64, product_type: SystemType, price: Decimal, rebate: Option<Decimal>) -> Product {
        let specifications = match product_type {
            SystemType::Solar => ProductSpecifications::Solar {
                panel_count: 20,
                panel_wattage: 440,
                inverter: "Fronius Primo 8.2".to_string(),
            },
            SystemType::Battery => ProductSpecifications::Battery {
                usable_kwh: Decimal::new(135, 1),
                chemistry: "LFP".to_string(),
                inverter: None,
            },
            SystemType::EvCharger => ProductSpecifications::EvCharger {
                kw_rating: Decimal::new(74, 1),
                connector: "Type 2".to_string(),
            },
        };
        Product {
            id,
            name: format!("{product_type} #{id}"),
            product_type,
            category: PhaseCategory::SinglePhase,
            capacity: "standard".to_string(),
            price,
            rebate_eligible: rebate.is_some(),
            rebate_amount: rebate,
            specifications,
            warranty: "10 years".to_string(),
            popular: false,
            active: true,
            created_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::fixtures::product;
    use super::*;

    #[test]
    fn ev_is_accepted_as_an_alias() {
        assert_eq!("ev".parse::<SystemType>(), Ok(SystemType::EvCharger));
        assert_eq!("ev_charger".parse::<SystemType>(), Ok(SystemType::EvCharger));
    }

    #[test]
    fn malformed_power_supply_is_rejected() {
        let err = "two".parse::<PowerSupply>().unwrap_err();

        assert_eq!(err.to_string(), "'two' is not a valid power supply");
    }

    #[test]
    fn unknown_supply_admits_both_phases() {
        assert!(PowerSupply::Unknown.admits(PhaseCategory::SinglePhase));
        assert!(PowerSupply::Unknown.admits(PhaseCategory::ThreePhase));
        assert!(!PowerSupply::Single.admits(PhaseCategory::ThreePhase));
    }

    #[test]
    fn eligible_product_requires_rebate_amount() {
        let mut p = product(1, SystemType::Solar, dec!(10000), Some(dec!(3000)));
        p.rebate_amount = None;

        assert_eq!(p.validate(), Err(ProductInvariantError::MissingRebate));
    }

    #[test]
    fn rebate_cannot_exceed_price() {
        let p = product(1, SystemType::Solar, dec!(1000), Some(dec!(1500)));

        assert_eq!(p.validate(), Err(ProductInvariantError::RebateOutOfRange));
    }

    #[test]
    fn specifications_must_match_type() {
        let mut p = product(1, SystemType::Battery, dec!(8000), None);
        p.product_type = SystemType::Solar;

        assert_eq!(
            p.validate(),
            Err(ProductInvariantError::SpecificationMismatch {
                expected: SystemType::Solar,
                found: SystemType::Battery,
            })
        );
    }

    #[test]
    fn ineligible_product_contributes_no_rebate() {
        let mut p = product(1, SystemType::Solar, dec!(10000), Some(dec!(3000)));
        p.rebate_eligible = false;

        assert_eq!(p.rebate(), Decimal::ZERO);
    }

    #[test]
    fn specifications_parse_from_tagged_json() {
        let raw = serde_json::json!({
            "kind": "ev_charger",
            "kwRating": "7.4",
            "connector": "Type 2"
        });

        let spec: ProductSpecifications = serde_json::from_value(raw).unwrap();

        assert_eq!(spec.system(), SystemType::EvCharger);
    }
}
