//! The four-step quote wizard.
//!
//! [`QuoteWizard`] is a synchronous state machine. Pricing runs elsewhere: the
//! wizard hands out a [`PricingTicket`] when it needs a price and only accepts
//! the result that matches the most recent ticket.

pub mod session;

use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;

use crate::error::FieldErrors;
use crate::models::product::{PowerSupply, SystemType};
use crate::models::quote::{ContactDetails, QuoteReceipt};
use crate::models::selection::QuoteSelection;
use crate::pricing::PricingResult;
use crate::submission::validation::{validate_contact, validate_requirements};
use crate::submission::QuoteSubmission;

pub use session::WizardSessions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WizardStep {
    SystemRequirements,
    ProductSelection,
    PropertyDetails,
    Summary,
}

impl WizardStep {
    pub fn number(self) -> u8 {
        match self {
            WizardStep::SystemRequirements => 1,
            WizardStep::ProductSelection => 2,
            WizardStep::PropertyDetails => 3,
            WizardStep::Summary => 4,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(WizardStep::SystemRequirements),
            2 => Some(WizardStep::ProductSelection),
            3 => Some(WizardStep::PropertyDetails),
            4 => Some(WizardStep::Summary),
            _ => None,
        }
    }

    fn previous(self) -> Option<Self> {
        Self::from_number(self.number() - 1)
    }
}

/// Identifies one pricing request issued by a wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingTicket(u64);

impl PricingTicket {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Identifies one hand-off of the wizard's quote to the submission pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionTicket(u64);

/// Why a pricing request produced no price. `fields` names the product
/// choices at fault and is empty when the catalog could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingFailure {
    pub message: String,
    pub fields: FieldErrors,
}

impl PricingFailure {
    pub fn unavailable() -> Self {
        Self { message: "Pricing is temporarily unavailable".to_string(), fields: FieldErrors::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PricingState {
    Idle,
    Pending,
    Ready(PricingResult),
    Failed(PricingFailure),
}

/// What happened when the wizard was asked to move forward.
#[derive(Debug)]
pub enum Advance {
    Moved(WizardStep),
    /// Now on property details; the caller must price `selection` and report
    /// back with `ticket`.
    PricingRequested { ticket: PricingTicket, selection: QuoteSelection },
    /// Property details are complete; the caller persists the submission and
    /// then calls [`QuoteWizard::mark_submitted`], or
    /// [`QuoteWizard::abandon_submission`] if persisting failed.
    ReadyToSubmit { ticket: SubmissionTicket, submission: QuoteSubmission },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("step {0} has not been reached yet")]
    StepUnavailable(u8),
    #[error("already on the first step")]
    AtFirstStep,
    #[error("selections can only change on the first two steps")]
    SelectionLocked,
    #[error("this quote has already been submitted")]
    AlreadySubmitted,
    #[error("this quote is being submitted")]
    SubmissionInProgress,
    #[error("pricing is still being calculated")]
    PricingPending,
    #[error("pricing failed: {0}")]
    PricingFailed(String),
    #[error("some fields need attention")]
    Invalid(FieldErrors),
}

#[derive(Debug, Clone)]
pub struct QuoteWizard {
    step: WizardStep,
    selection: QuoteSelection,
    contact: ContactDetails,
    pricing: PricingState,
    issued_tickets: u64,
    current_ticket: Option<u64>,
    issued_submissions: u64,
    submitting: Option<u64>,
    receipt: Option<QuoteReceipt>,
}

impl Default for QuoteWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl QuoteWizard {
    pub fn new() -> Self {
        Self {
            step: WizardStep::SystemRequirements,
            selection: QuoteSelection::default(),
            contact: ContactDetails::default(),
            pricing: PricingState::Idle,
            issued_tickets: 0,
            current_ticket: None,
            issued_submissions: 0,
            submitting: None,
            receipt: None,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn selection(&self) -> &QuoteSelection {
        &self.selection
    }

    pub fn contact(&self) -> &ContactDetails {
        &self.contact
    }

    pub fn pricing(&self) -> &PricingState {
        &self.pricing
    }

    pub fn receipt(&self) -> Option<QuoteReceipt> {
        self.receipt
    }

    fn ensure_open(&self) -> Result<(), WizardError> {
        if self.receipt.is_some() {
            return Err(WizardError::AlreadySubmitted);
        }
        if self.submitting.is_some() {
            return Err(WizardError::SubmissionInProgress);
        }
        Ok(())
    }

    fn ensure_selection_editable(&self) -> Result<(), WizardError> {
        self.ensure_open()?;
        if self.step > WizardStep::ProductSelection {
            return Err(WizardError::SelectionLocked);
        }
        Ok(())
    }

    /// Drops the current price and makes every outstanding ticket stale.
    fn invalidate_pricing(&mut self) {
        self.pricing = PricingState::Idle;
        self.current_ticket = None;
    }

    pub fn set_requirements(
        &mut self,
        systems: BTreeSet<SystemType>,
        power_supply: Option<PowerSupply>,
    ) -> Result<(), WizardError> {
        self.ensure_selection_editable()?;
        self.selection.set_requirements(systems, power_supply);
        self.invalidate_pricing();
        Ok(())
    }

    /// Sets or clears the product for one system.
    pub fn choose_product(&mut self, system: SystemType, product_id: Option<i64>) -> Result<(), WizardError> {
        self.ensure_selection_editable()?;
        match product_id {
            Some(id) => self.selection.choose_product(system, id).map_err(|e| {
                let mut fields = FieldErrors::new();
                fields.insert(system.product_field().to_string(), e.to_string());
                WizardError::Invalid(fields)
            })?,
            None => self.selection.clear_product(system),
        }
        self.invalidate_pricing();
        Ok(())
    }

    pub fn set_contact(&mut self, contact: ContactDetails) -> Result<(), WizardError> {
        self.ensure_open()?;
        self.contact = contact;
        Ok(())
    }

    fn issue_ticket(&mut self) -> PricingTicket {
        self.issued_tickets += 1;
        self.current_ticket = Some(self.issued_tickets);
        self.pricing = PricingState::Pending;
        PricingTicket(self.issued_tickets)
    }

    pub fn advance(&mut self) -> Result<Advance, WizardError> {
        self.ensure_open()?;
        match self.step {
            WizardStep::SystemRequirements => {
                let errors = validate_requirements(&self.selection);
                if !errors.is_empty() {
                    return Err(WizardError::Invalid(errors));
                }
                self.step = WizardStep::ProductSelection;
                Ok(Advance::Moved(self.step))
            }
            WizardStep::ProductSelection => {
                self.step = WizardStep::PropertyDetails;
                let ticket = self.issue_ticket();
                Ok(Advance::PricingRequested { ticket, selection: self.selection.clone() })
            }
            WizardStep::PropertyDetails => {
                let errors = validate_contact(&self.contact);
                if !errors.is_empty() {
                    return Err(WizardError::Invalid(errors));
                }
                let pricing = match &self.pricing {
                    PricingState::Ready(result) => result.clone(),
                    PricingState::Failed(failure) => {
                        return Err(WizardError::PricingFailed(failure.message.clone()))
                    }
                    PricingState::Idle | PricingState::Pending => return Err(WizardError::PricingPending),
                };
                self.issued_submissions += 1;
                self.submitting = Some(self.issued_submissions);
                Ok(Advance::ReadyToSubmit {
                    ticket: SubmissionTicket(self.issued_submissions),
                    submission: QuoteSubmission {
                        selection: self.selection.clone(),
                        contact: self.contact.clone(),
                        pricing,
                        photo: None,
                    },
                })
            }
            // Summary is only reachable through `mark_submitted`.
            WizardStep::Summary => Err(WizardError::AlreadySubmitted),
        }
    }

    pub fn back(&mut self) -> Result<WizardStep, WizardError> {
        self.ensure_open()?;
        self.step = self.step.previous().ok_or(WizardError::AtFirstStep)?;
        Ok(self.step)
    }

    /// Jumps to `step`, which must not be ahead of the current step.
    pub fn go_to(&mut self, step: u8) -> Result<WizardStep, WizardError> {
        self.ensure_open()?;
        match WizardStep::from_number(step) {
            Some(target) if target <= self.step => {
                self.step = target;
                Ok(target)
            }
            _ => Err(WizardError::StepUnavailable(step)),
        }
    }

    /// Records the outcome of a pricing request. Returns `false` when the
    /// ticket is stale and the outcome was ignored.
    pub fn apply_pricing(&mut self, ticket: PricingTicket, outcome: Result<PricingResult, PricingFailure>) -> bool {
        if self.current_ticket != Some(ticket.0) || self.receipt.is_some() {
            return false;
        }
        self.pricing = match outcome {
            Ok(result) => PricingState::Ready(result),
            Err(failure) => PricingState::Failed(failure),
        };
        true
    }

    /// Moves to the summary with `receipt`. Returns `false` and changes nothing
    /// when `ticket` is no longer the submission in progress, which happens
    /// after a start over.
    pub fn mark_submitted(&mut self, ticket: SubmissionTicket, receipt: QuoteReceipt) -> bool {
        if self.submitting != Some(ticket.0) {
            return false;
        }
        self.submitting = None;
        self.receipt = Some(receipt);
        self.step = WizardStep::Summary;
        true
    }

    /// Reopens property details after the submission under `ticket` failed.
    pub fn abandon_submission(&mut self, ticket: SubmissionTicket) {
        if self.submitting == Some(ticket.0) {
            self.submitting = None;
        }
    }

    /// Discards everything and returns to the first step. Tickets issued
    /// before the reset stay stale.
    pub fn start_over(&mut self) {
        let issued_tickets = self.issued_tickets;
        let issued_submissions = self.issued_submissions;
        *self = Self { issued_tickets, issued_submissions, ..Self::new() };
    }
}
