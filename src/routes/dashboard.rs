use axum::{
    extract::State,
    middleware,
    routing::get,
    Extension, Router,
};

use crate::auth::{require_auth, Claims};
use crate::error::{AppError, Json};
use crate::models::DashboardStats;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/dashboard/stats", get(get_dashboard_stats))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
}

async fn get_dashboard_stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<DashboardStats>, AppError> {
    let user_id = claims.sub;

    let (total_doses, latest, symptoms_logged, reports_created) = tokio::try_join!(
        state.store.count_doses(user_id),
        state.store.list_doses(user_id, 1),
        state.store.count_symptoms(user_id),
        state.store.count_reports(user_id),
    )?;

    Ok(Json(DashboardStats {
        total_doses,
        last_dose: latest.first().map(|d| d.dose_date),
        symptoms_logged,
        reports_created,
    }))
}
