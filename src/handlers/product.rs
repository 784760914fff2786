// src/handlers/product.rs
use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::{error, instrument};

use crate::dtos::product::{ProductQuery, ProductResponse};
use crate::error::AppError;
use crate::state::AppState;
use crate::store::RepositoryError;

// GET /products - List active products, optionally filtered by type and category
#[instrument(skip(state))]
pub async fn get_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<ProductResponse>>, AppError> {
    let filter = query.into_filter()?;
    match state.catalog.list_products(filter).await {
        Ok(products) => {
            let response = products.into_iter().map(ProductResponse::from).collect();
            Ok(Json(response))
        }
        Err(e) => {
            error!(?e, "Failed to fetch products");
            Err(e.into())
        }
    }
}

// GET /products/{id} - Get single product
#[instrument(skip(state))]
pub async fn get_product(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<ProductResponse>, AppError> {
    let product = state.catalog.get_product(id).await.map_err(|e| match e {
        RepositoryError::NotFound => AppError::not_found("Product not found"),
        other => other.into(),
    })?;
    Ok(Json(ProductResponse::from(product)))
}
