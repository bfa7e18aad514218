use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/validate", post(handlers::validate))
        .route("/submissions", post(handlers::submit))
        .route("/submissions/:tokens", get(handlers::get_results))
        .route("/languages", get(handlers::list_languages))
        .route("/health", get(handlers::health_check))
}
