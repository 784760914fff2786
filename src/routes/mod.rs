pub mod pages;
pub mod pricing;
pub mod products;
pub mod quotes;
pub mod wizard;

use axum::Router;
use crate::state::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .merge(products::routes())
        .merge(pricing::routes())
        .merge(quotes::routes())
        .merge(wizard::routes())
        .merge(pages::routes())
}
