// src/dtos/wizard.rs
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::pricing::{parse_power_supply, parse_systems, ProductChoices};
use crate::error::{AppError, FieldErrors};
use crate::models::product::{PowerSupply, SystemType};
use crate::models::quote::{ContactDetails, QuoteReceipt};
use crate::models::selection::QuoteSelection;
use crate::pricing::PricingResult;
use crate::wizard::{PricingState, QuoteWizard, WizardStep};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementsRequest {
    #[serde(default)]
    pub systems: Vec<String>,
    pub power_supply: Option<String>,
}

impl RequirementsRequest {
    pub fn parse(self) -> Result<(BTreeSet<SystemType>, Option<PowerSupply>), AppError> {
        let mut errors = FieldErrors::new();
        let systems = parse_systems(&self.systems, &mut errors);
        let power_supply = self.power_supply.as_deref().and_then(|raw| parse_power_supply(raw, &mut errors));
        if !errors.is_empty() {
            return Err(AppError::invalid_fields(errors));
        }
        Ok((systems, power_supply))
    }
}

/// Replaces the product choice of every selected system.
pub type ProductsRequest = ProductChoices;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingView {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<PricingResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

impl From<&PricingState> for PricingView {
    fn from(state: &PricingState) -> Self {
        match state {
            PricingState::Idle => Self { status: "idle", result: None, error: None, fields: None },
            PricingState::Pending => Self { status: "pending", result: None, error: None, fields: None },
            PricingState::Ready(result) => Self {
                status: "ready",
                result: Some(result.clone()),
                error: None,
                fields: None,
            },
            PricingState::Failed(failure) => Self {
                status: "failed",
                result: None,
                error: Some(failure.message.clone()),
                fields: (!failure.fields.is_empty()).then(|| failure.fields.clone()),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardResponse {
    pub id: Uuid,
    pub step: u8,
    pub step_name: WizardStep,
    pub selection: QuoteSelection,
    pub contact: ContactDetails,
    pub pricing: PricingView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<QuoteReceipt>,
}

impl WizardResponse {
    pub fn new(id: Uuid, wizard: &QuoteWizard) -> Self {
        Self {
            id,
            step: wizard.step().number(),
            step_name: wizard.step(),
            selection: wizard.selection().clone(),
            contact: wizard.contact().clone(),
            pricing: PricingView::from(wizard.pricing()),
            receipt: wizard.receipt(),
        }
    }
}
