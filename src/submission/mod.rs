//! Turning a finished quote request into a persisted [`Quote`].
//!
//! The database write is the only step that can fail a submission. Email and
//! CRM delivery happen afterwards through the [`Outbox`].

pub mod photo;
pub mod validation;

use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::error::AppError;
use crate::models::quote::{ContactDetails, NewQuote, QuoteReceipt};
use crate::models::product::{PowerSupply, SystemType};
use crate::models::selection::QuoteSelection;
use crate::notify::Outbox;
use crate::pricing::PricingResult;
use crate::store::QuoteStore;

pub use photo::{PhotoStore, PhotoUpload};
use validation::{validate_contact, validate_requirements};

#[derive(Debug, Clone)]
pub struct QuoteSubmission {
    pub selection: QuoteSelection,
    pub contact: ContactDetails,
    pub pricing: PricingResult,
    pub photo: Option<PhotoUpload>,
}

pub struct SubmissionPipeline {
    quotes: Arc<dyn QuoteStore>,
    photos: PhotoStore,
    outbox: Outbox,
}

impl SubmissionPipeline {
    pub fn new(quotes: Arc<dyn QuoteStore>, photos: PhotoStore, outbox: Outbox) -> Self {
        Self { quotes, photos, outbox }
    }

    pub fn photos(&self) -> &PhotoStore {
        &self.photos
    }

    /// Validates, stores and announces a quote.
    ///
    /// Succeeds once the quote is in the database, whatever happens to the
    /// notifications afterwards.
    #[instrument(skip_all)]
    pub async fn submit(&self, submission: QuoteSubmission) -> Result<QuoteReceipt, AppError> {
        let mut errors = validate_requirements(&submission.selection);
        errors.extend(validate_contact(&submission.contact));
        if let Some(problem) = submission.photo.as_ref().and_then(|p| self.photos.check(p)) {
            errors.insert("photo".to_string(), problem);
        }
        if !errors.is_empty() {
            return Err(AppError::invalid_fields(errors));
        }

        let photo_path = match &submission.photo {
            Some(photo) => Some(
                self.photos
                    .save(photo)
                    .await
                    .map_err(|e| AppError::internal(format!("saving photo: {e}")))?,
            ),
            None => None,
        };

        let selection = &submission.selection;
        let new_quote = NewQuote {
            contact: trimmed(submission.contact),
            systems: selection.systems().iter().copied().collect(),
            power_supply: selection.power_supply().unwrap_or(PowerSupply::Unknown),
            solar_package_id: selection.product_for(SystemType::Solar),
            battery_system_id: selection.product_for(SystemType::Battery),
            ev_charger_id: selection.product_for(SystemType::EvCharger),
            total_price: submission.pricing.total_price,
            rebate_amount: submission.pricing.rebate_amount,
            final_price: submission.pricing.final_price,
            photo_path: photo_path.as_ref().map(|p| p.display().to_string()),
        };

        let quote = match self.quotes.create_quote(new_quote).await {
            Ok(quote) => quote,
            Err(e) => {
                error!(error = %e, "Failed to persist quote");
                if let Some(path) = &photo_path {
                    self.photos.discard(path).await;
                }
                return Err(e.into());
            }
        };

        info!(quote_id = quote.id, final_price = %quote.final_price, "Quote persisted");
        let receipt = quote.receipt();
        self.outbox.enqueue(quote);
        Ok(receipt)
    }
}

fn trimmed(contact: ContactDetails) -> ContactDetails {
    let opt = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    ContactDetails {
        first_name: contact.first_name.trim().to_string(),
        last_name: contact.last_name.trim().to_string(),
        email: contact.email.trim().to_string(),
        phone: opt(contact.phone),
        address: contact.address.trim().to_string(),
        suburb: contact.suburb.trim().to_string(),
        postcode: contact.postcode.trim().to_string(),
        state: opt(contact.state),
        notes: opt(contact.notes),
    }
}
