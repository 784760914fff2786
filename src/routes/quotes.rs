use axum::{routing::post, Router};
use crate::handlers::quote::create_quote;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/quotes", post(create_quote))
}
