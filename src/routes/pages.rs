use axum::{routing::get, Router};
use crate::handlers::content::{get_page, get_site};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/pages/{slug}", get(get_page))
        .route("/site", get(get_site))
}
