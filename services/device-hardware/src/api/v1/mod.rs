//! API v1 routes.

mod hardware;

use axum::Router;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().nest("/hardware", hardware::routes())
}
