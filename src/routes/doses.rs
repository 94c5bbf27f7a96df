use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{delete, get},
    Extension, Router,
};
use uuid::Uuid;

use super::{local_now, ListQuery};
use crate::auth::{require_auth, Claims};
use crate::capture::DoseForm;
use crate::error::{AppError, Json};
use crate::models::DoseEntry;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/doses", get(list_recent_doses).post(submit_dose))
        .route("/doses/:id", delete(delete_dose))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
}

async fn submit_dose(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(form): Json<DoseForm>,
) -> Result<(StatusCode, Json<DoseEntry>), AppError> {
    let dose = form.validate(claims.sub, local_now())?;
    let created = state.store.create_dose(dose).await?;

    tracing::info!("💉 Dose {} logged", created.id);

    Ok((StatusCode::CREATED, Json(created)))
}

async fn delete_dose(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.store.delete_dose(claims.sub, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_recent_doses(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<DoseEntry>>, AppError> {
    let limit = query.limit_or(state.config.list_page_size);
    let doses = state.store.list_doses(claims.sub, limit).await?;
    Ok(Json(doses))
}
