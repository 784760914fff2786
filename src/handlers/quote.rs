// src/handlers/quote.rs
use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::{header, StatusCode},
    Json,
};
use tracing::instrument;

use crate::dtos::quote::{CreateQuoteRequest, QuoteCreatedResponse};
use crate::error::AppError;
use crate::models::quote::ContactDetails;
use crate::pricing::price_selection;
use crate::state::AppState;
use crate::submission::{PhotoUpload, QuoteSubmission};

/// A quote request sent either as plain JSON or as `multipart/form-data` with
/// the JSON in a `quote` part and an optional `photo` part.
#[derive(Debug)]
pub struct QuotePayload {
    pub request: CreateQuoteRequest,
    pub photo: Option<PhotoUpload>,
}

impl<S> FromRequest<S> for QuotePayload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("multipart/form-data"));

        if !is_multipart {
            let Json(request) = Json::<CreateQuoteRequest>::from_request(req, state)
                .await
                .map_err(|e| AppError::validation(e.body_text()))?;
            return Ok(Self { request, photo: None });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::validation(e.body_text()))?;
        let mut request = None;
        let mut photo = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::validation(e.body_text()))?
        {
            match field.name() {
                Some("quote") => {
                    let text = field.text().await.map_err(|e| AppError::validation(e.body_text()))?;
                    let parsed = serde_json::from_str::<CreateQuoteRequest>(&text)
                        .map_err(|e| AppError::validation(format!("Invalid quote part: {e}")))?;
                    request = Some(parsed);
                }
                Some("photo") => {
                    let file_name = field.file_name().map(str::to_owned);
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_owned();
                    let bytes = field.bytes().await.map_err(|e| AppError::validation(e.body_text()))?;
                    // Browsers send an empty part when no file was picked.
                    if !bytes.is_empty() {
                        photo = Some(PhotoUpload { file_name, content_type, bytes: bytes.to_vec() });
                    }
                }
                _ => {}
            }
        }

        let request = request.ok_or_else(|| AppError::validation("Missing quote part"))?;
        Ok(Self { request, photo })
    }
}

// POST /quotes - Submit a finished quote request
#[instrument(skip(state, payload))]
pub async fn create_quote(
    State(state): State<AppState>,
    payload: QuotePayload,
) -> Result<(StatusCode, Json<QuoteCreatedResponse>), AppError> {
    let QuotePayload { request, photo } = payload;
    let selection = request.selection.into_selection()?;
    let contact = ContactDetails::from(request.contact);

    // Prices sent by the browser are never trusted.
    let pricing = price_selection(state.catalog.as_ref(), &selection).await?;

    let receipt = state
        .pipeline
        .submit(QuoteSubmission { selection, contact, pricing, photo })
        .await?;

    Ok((StatusCode::CREATED, Json(QuoteCreatedResponse::from(receipt))))
}
