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
use crate::capture::ReportForm;
use crate::error::{AppError, Json};
use crate::models::ProgressReport;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/reports", get(list_reports).post(submit_report))
        .route("/reports/:id", delete(delete_report))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
}

async fn submit_report(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(form): Json<ReportForm>,
) -> Result<(StatusCode, Json<ProgressReport>), AppError> {
    let report = form.validate(claims.sub, local_now().date())?;
    let created = state.store.create_report(report).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn delete_report(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.store.delete_report(claims.sub, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_reports(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ProgressReport>>, AppError> {
    let limit = query.limit_or(state.config.list_page_size);
    Ok(Json(state.store.list_reports(claims.sub, limit).await?))
}
