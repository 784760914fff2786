use axum::{routing::post, Router};
use crate::handlers::pricing::calculate_pricing;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/pricing/calculate", post(calculate_pricing))
}
