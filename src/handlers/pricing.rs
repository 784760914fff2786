// src/handlers/pricing.rs
use axum::{extract::State, Json};
use tracing::instrument;

use crate::dtos::pricing::PricingRequest;
use crate::error::AppError;
use crate::pricing::{price_selection, PricingResult};
use crate::state::AppState;

// POST /pricing/calculate - Price a selection without saving anything
#[instrument(skip(state, payload))]
pub async fn calculate_pricing(
    State(state): State<AppState>,
    Json(payload): Json<PricingRequest>,
) -> Result<Json<PricingResult>, AppError> {
    let selection = payload.into_selection()?;
    let result = price_selection(state.catalog.as_ref(), &selection).await?;
    Ok(Json(result))
}
