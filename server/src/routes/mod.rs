//! HTTP route definitions.

mod events;
mod health;
mod lists;
mod orders;

use crate::AppState;
use axum::Router;

/// Create all application routes.
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(lists::routes())
        .merge(orders::routes())
        .merge(events::routes())
}
