use axum::{
    routing::{get, post, put},
    Router,
};
use crate::handlers::wizard::{
    create_wizard, get_wizard, go_to_step, next_step, previous_step, start_over, submit_wizard,
    update_contact, update_products, update_requirements,
};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/wizard", post(create_wizard))
        .route("/wizard/{id}", get(get_wizard).delete(start_over))
        .route("/wizard/{id}/requirements", put(update_requirements))
        .route("/wizard/{id}/products", put(update_products))
        .route("/wizard/{id}/contact", put(update_contact))
        .route("/wizard/{id}/next", post(next_step))
        .route("/wizard/{id}/back", post(previous_step))
        .route("/wizard/{id}/goto/{step}", post(go_to_step))
        .route("/wizard/{id}/submit", post(submit_wizard))
}
