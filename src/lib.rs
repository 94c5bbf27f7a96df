use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod capture;
pub mod config;
pub mod error;
pub mod models;
pub mod onboarding;
pub mod routes;
pub mod state;
pub mod store;
pub mod timeline;

use state::AppState;

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::auth::routes(state.clone()))
        .merge(routes::onboarding::routes(state.clone()))
        .merge(routes::doses::routes(state.clone()))
        .merge(routes::symptoms::routes(state.clone()))
        .merge(routes::reports::routes(state.clone()))
        .merge(routes::timeline::routes(state.clone()))
        .merge(routes::dashboard::routes(state))
        .route("/health", get(|| async { "✅ Backend up" }))
        .layer(TraceLayer::new_for_http())
}
