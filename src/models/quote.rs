use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::product::{PowerSupply, SystemType};
use super::ParseValueError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Pending,
    Contacted,
    Converted,
    Lost,
}

impl QuoteStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            QuoteStatus::Pending => "pending",
            QuoteStatus::Contacted => "contacted",
            QuoteStatus::Converted => "converted",
            QuoteStatus::Lost => "lost",
        }
    }
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuoteStatus {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(QuoteStatus::Pending),
            "contacted" => Ok(QuoteStatus::Contacted),
            "converted" => Ok(QuoteStatus::Converted),
            "lost" => Ok(QuoteStatus::Lost),
            other => Err(ParseValueError::new("quote status", other)),
        }
    }
}

/// Who to contact and where the installation would go.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: String,
    pub suburb: String,
    pub postcode: String,
    pub state: Option<String>,
    pub notes: Option<String>,
}

impl ContactDetails {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewQuote {
    pub contact: ContactDetails,
    pub systems: Vec<SystemType>,
    pub power_supply: PowerSupply,
    pub solar_package_id: Option<i64>,
    pub battery_system_id: Option<i64>,
    pub ev_charger_id: Option<i64>,
    pub total_price: Decimal,
    pub rebate_amount: Decimal,
    pub final_price: Decimal,
    pub photo_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub id: i64,
    pub contact: ContactDetails,
    pub systems: Vec<SystemType>,
    pub power_supply: PowerSupply,
    pub solar_package_id: Option<i64>,
    pub battery_system_id: Option<i64>,
    pub ev_charger_id: Option<i64>,
    pub total_price: Decimal,
    pub rebate_amount: Decimal,
    pub final_price: Decimal,
    pub photo_path: Option<String>,
    pub status: QuoteStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quote {
    pub fn receipt(&self) -> QuoteReceipt {
        QuoteReceipt { id: self.id, status: self.status }
    }
}

/// What the customer gets back once a quote is on record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuoteReceipt {
    pub id: i64,
    pub status: QuoteStatus,
}
