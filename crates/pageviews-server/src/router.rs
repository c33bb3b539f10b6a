//! Axum router wiring.
//!
//! Exposes a single `/` route that accepts any method.

use axum::{routing::any, Router};

use crate::{app_state::AppState, handler};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", any(handler::count_visit))
        .with_state(state)
}
