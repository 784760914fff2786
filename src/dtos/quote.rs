// src/dtos/quote.rs
use serde::{Deserialize, Serialize};

use super::pricing::PricingRequest;
use crate::models::quote::{ContactDetails, QuoteReceipt, QuoteStatus};

/// Contact fields as typed into the property-details form. Every field is
/// optional on the wire so that missing ones come back as field errors.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub suburb: Option<String>,
    pub postcode: Option<String>,
    pub state: Option<String>,
    pub notes: Option<String>,
}

impl From<ContactRequest> for ContactDetails {
    fn from(req: ContactRequest) -> Self {
        Self {
            first_name: req.first_name.unwrap_or_default(),
            last_name: req.last_name.unwrap_or_default(),
            email: req.email.unwrap_or_default(),
            phone: req.phone,
            address: req.address.unwrap_or_default(),
            suburb: req.suburb.unwrap_or_default(),
            postcode: req.postcode.unwrap_or_default(),
            state: req.state,
            notes: req.notes,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateQuoteRequest {
    pub selection: PricingRequest,
    #[serde(default)]
    pub contact: ContactRequest,
}

#[derive(Debug, Serialize)]
pub struct QuoteCreatedResponse {
    pub id: i64,
    pub status: QuoteStatus,
}

impl From<QuoteReceipt> for QuoteCreatedResponse {
    fn from(receipt: QuoteReceipt) -> Self {
        Self { id: receipt.id, status: receipt.status }
    }
}
