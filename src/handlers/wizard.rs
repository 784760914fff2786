// src/handlers/wizard.rs
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::dtos::quote::ContactRequest;
use crate::dtos::wizard::{ProductsRequest, RequirementsRequest, WizardResponse};
use crate::error::AppError;
use crate::models::product::SystemType;
use crate::models::quote::ContactDetails;
use crate::state::AppState;
use crate::submission::QuoteSubmission;
use crate::wizard::{Advance, QuoteWizard, SubmissionTicket, WizardError, WizardStep};

/// Runs `f` against the wizard of session `id` under its lock.
fn with_session<R>(state: &AppState, id: Uuid, f: impl FnOnce(&mut QuoteWizard) -> R) -> Result<R, AppError> {
    state
        .wizards
        .with(id, f)
        .ok_or_else(|| AppError::not_found("Wizard session not found"))
}

fn snapshot(state: &AppState, id: Uuid) -> Result<Json<WizardResponse>, AppError> {
    with_session(state, id, |wizard| Json(WizardResponse::new(id, wizard)))
}

/// Acts on the outcome of a forward move. Pricing is started in the background
/// and submissions are persisted before the wizard is moved to the summary.
async fn follow_up(state: &AppState, id: Uuid, advance: Advance) -> Result<Json<WizardResponse>, AppError> {
    match advance {
        Advance::Moved(_) => {}
        Advance::PricingRequested { ticket, selection } => {
            state
                .wizards
                .spawn_pricing(state.catalog.clone(), id, ticket, selection);
        }
        Advance::ReadyToSubmit { ticket, submission } => submit_from_wizard(state, id, ticket, submission).await?,
    }
    snapshot(state, id)
}

async fn submit_from_wizard(
    state: &AppState,
    id: Uuid,
    ticket: SubmissionTicket,
    submission: QuoteSubmission,
) -> Result<(), AppError> {
    let receipt = match state.pipeline.submit(submission).await {
        Ok(receipt) => receipt,
        Err(e) => {
            // An expired session has nothing to reopen.
            state.wizards.with(id, |wizard| wizard.abandon_submission(ticket));
            return Err(e);
        }
    };
    info!(%id, quote_id = receipt.id, "Wizard submitted");
    if !with_session(state, id, |wizard| wizard.mark_submitted(ticket, receipt))? {
        info!(%id, quote_id = receipt.id, "Wizard restarted during submission; receipt not shown");
    }
    Ok(())
}

// POST /wizard - Start a new wizard session
#[instrument(skip(state))]
pub async fn create_wizard(State(state): State<AppState>) -> (StatusCode, Json<WizardResponse>) {
    let (id, wizard) = state.wizards.create();
    (StatusCode::CREATED, Json(WizardResponse::new(id, &wizard)))
}

// GET /wizard/{id} - Current state of a wizard session
#[instrument(skip(state))]
pub async fn get_wizard(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Json<WizardResponse>, AppError> {
    snapshot(&state, id)
}

// DELETE /wizard/{id} - Start over from the first step
#[instrument(skip(state))]
pub async fn start_over(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Json<WizardResponse>, AppError> {
    with_session(&state, id, |wizard| {
        wizard.start_over();
        Json(WizardResponse::new(id, wizard))
    })
}

// PUT /wizard/{id}/requirements - Selected systems and power supply
#[instrument(skip(state, payload))]
pub async fn update_requirements(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<RequirementsRequest>,
) -> Result<Json<WizardResponse>, AppError> {
    let (systems, power_supply) = payload.parse()?;
    let response = with_session(&state, id, |wizard| {
        wizard.set_requirements(systems, power_supply)?;
        Ok::<_, WizardError>(Json(WizardResponse::new(id, wizard)))
    })??;
    Ok(response)
}

// PUT /wizard/{id}/products - Product choice for every selected system
#[instrument(skip(state, payload))]
pub async fn update_products(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<ProductsRequest>,
) -> Result<Json<WizardResponse>, AppError> {
    let response = with_session(&state, id, |wizard| {
        // All choices apply or none do.
        let mut draft = wizard.clone();
        for system in SystemType::ALL {
            draft.choose_product(system, payload.for_system(system))?;
        }
        *wizard = draft;
        Ok::<_, WizardError>(Json(WizardResponse::new(id, wizard)))
    })??;
    Ok(response)
}

// PUT /wizard/{id}/contact - Property and contact details
#[instrument(skip(state, payload))]
pub async fn update_contact(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<ContactRequest>,
) -> Result<Json<WizardResponse>, AppError> {
    let contact = ContactDetails::from(payload);
    let response = with_session(&state, id, |wizard| {
        wizard.set_contact(contact)?;
        Ok::<_, WizardError>(Json(WizardResponse::new(id, wizard)))
    })??;
    Ok(response)
}

// POST /wizard/{id}/next - Move forward one step, submitting from property details
#[instrument(skip(state))]
pub async fn next_step(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Json<WizardResponse>, AppError> {
    let advance = with_session(&state, id, |wizard| wizard.advance())??;
    follow_up(&state, id, advance).await
}

// POST /wizard/{id}/back - Move back one step
#[instrument(skip(state))]
pub async fn previous_step(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<WizardResponse>, AppError> {
    with_session(&state, id, |wizard| wizard.back())??;
    snapshot(&state, id)
}

// POST /wizard/{id}/goto/{step} - Jump to a step already reached
#[instrument(skip(state))]
pub async fn go_to_step(
    Path((id, step)): Path<(Uuid, u8)>,
    State(state): State<AppState>,
) -> Result<Json<WizardResponse>, AppError> {
    with_session(&state, id, |wizard| wizard.go_to(step))??;
    snapshot(&state, id)
}

// POST /wizard/{id}/submit - Submit the quote from property details
#[instrument(skip(state))]
pub async fn submit_wizard(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Json<WizardResponse>, AppError> {
    let advance = with_session(&state, id, |wizard| {
        if wizard.step() < WizardStep::PropertyDetails {
            return Err(WizardError::StepUnavailable(WizardStep::Summary.number()));
        }
        wizard.advance()
    })??;
    follow_up(&state, id, advance).await
}
