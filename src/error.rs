// src/error.rs
use std::collections::BTreeMap;

use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use thiserror::Error;

use crate::pricing::PricingError;
use crate::store::RepositoryError;
use crate::wizard::WizardError;

/// Per-field validation messages keyed by the camelCase field name.
pub type FieldErrors = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{message}")]
    Validation { message: String, fields: FieldErrors },
    #[error("{0}")]
    Conflict(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation { message: msg.into(), fields: FieldErrors::new() }
    }

    pub fn invalid_fields(fields: FieldErrors) -> Self {
        AppError::Validation { message: "Some fields need attention".to_string(), fields }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Storage(detail) => {
                tracing::error!(%detail, "Storage failure");
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "Database error occurred" }))
            }
            AppError::Internal(detail) => {
                tracing::error!(%detail, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "Internal server error" }))
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            AppError::Validation { message, fields } if fields.is_empty() => {
                (StatusCode::BAD_REQUEST, json!({ "error": message }))
            }
            AppError::Validation { message, fields } => {
                (StatusCode::BAD_REQUEST, json!({ "error": message, "fields": fields }))
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => AppError::NotFound("Record not found".to_string()),
            other => AppError::Storage(other.to_string()),
        }
    }
}

impl From<PricingError> for AppError {
    fn from(err: PricingError) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(err.field().to_string(), err.to_string());
        AppError::Validation { message: "Invalid product selection".to_string(), fields }
    }
}

impl From<WizardError> for AppError {
    fn from(err: WizardError) -> Self {
        match err {
            WizardError::Invalid(fields) => AppError::invalid_fields(fields),
            other => AppError::Conflict(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    use super::*;

    async fn render(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_errors_list_their_fields() {
        let mut fields = FieldErrors::new();
        fields.insert("email".to_string(), "Email is required".to_string());

        let (status, body) = render(AppError::invalid_fields(fields)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["fields"]["email"], "Email is required");
    }

    #[tokio::test]
    async fn storage_errors_hide_details() {
        let (status, body) = render(AppError::Storage("connection refused".into())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Database error occurred");
    }

    #[tokio::test]
    async fn repository_not_found_maps_to_404() {
        let (status, _) = render(RepositoryError::NotFound.into()).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
