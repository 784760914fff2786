// src/handlers/content.rs
use axum::{
    extract::{Path, State},
    Json,
};
use tracing::instrument;

use crate::error::AppError;
use crate::models::content::{Page, SiteSettings};
use crate::state::AppState;
use crate::store::RepositoryError;

// GET /pages/{slug} - Published page with its content blocks
#[instrument(skip(state))]
pub async fn get_page(Path(slug): Path<String>, State(state): State<AppState>) -> Result<Json<Page>, AppError> {
    let page = state.content.get_page(&slug).await.map_err(|e| match e {
        RepositoryError::NotFound => AppError::not_found("Page not found"),
        other => other.into(),
    })?;
    Ok(Json(page))
}

// GET /site - Header and theme shared by every page
#[instrument(skip(state))]
pub async fn get_site(State(state): State<AppState>) -> Result<Json<SiteSettings>, AppError> {
    let settings = state.content.get_site_settings().await?;
    Ok(Json(settings))
}
