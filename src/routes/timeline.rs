use axum::{
    extract::State,
    middleware,
    routing::get,
    Extension, Router,
};

use crate::auth::{require_auth, Claims};
use crate::error::{AppError, Json};
use crate::state::AppState;
use crate::timeline::{self, TimelineEvent};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/timeline", get(get_timeline))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
}

async fn get_timeline(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<TimelineEvent>>, AppError> {
    let page = state.config.timeline_page_size;

    let events = timeline::load(
        state.store.list_doses(claims.sub, page),
        state.store.list_symptoms(claims.sub, page),
    )
    .await?;

    Ok(Json(events))
}
