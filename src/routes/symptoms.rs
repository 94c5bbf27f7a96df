use axum::{
    Router,
    routing::{get, delete},
    extract::{State, Query, Path},
    middleware,
    Extension,
    http::StatusCode,
};
use uuid::Uuid;

use super::{local_now, ListQuery};
use crate::auth::{require_auth, Claims};
use crate::capture::SymptomForm;
use crate::error::{AppError, Json};
use crate::models::{SymptomEntry, COMMON_SYMPTOMS};
use crate::state::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/symptoms", get(list_recent_symptoms).post(submit_symptoms))
        .route("/symptoms/vocabulary", get(vocabulary))
        .route("/symptoms/:id", delete(delete_symptom))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
}

async fn submit_symptoms(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(form): Json<SymptomForm>,
) -> Result<(StatusCode, Json<SymptomEntry>), AppError> {
    // Rejected here, before the store sees anything.
    let symptom = form.validate(claims.sub, local_now())?;
    let created = state.store.create_symptom(symptom).await?;

    tracing::info!("🤒 Symptoms {} logged ({})", created.id, created.severity);

    Ok((StatusCode::CREATED, Json(created)))
}

async fn delete_symptom(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.store.delete_symptom(claims.sub, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_recent_symptoms(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<SymptomEntry>>, AppError> {
    let limit = query.limit_or(state.config.list_page_size);
    let symptoms = state.store.list_symptoms(claims.sub, limit).await?;
    Ok(Json(symptoms))
}

async fn vocabulary() -> Json<Vec<&'static str>> {
    Json(COMMON_SYMPTOMS.to_vec())
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::routes::testing::{request, send, sign_up, test_app};

    #[tokio::test]
    async fn empty_selection_never_reaches_the_store() {
        let app = test_app();
        let token = sign_up(&app, "ana@example.com").await;

        let (status, body) = send(
            &app,
            request("POST", "/symptoms", Some(&token), Some(json!({ "symptoms": [], "severity": "high" }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION");

        let (_, listed) = send(&app, request("GET", "/symptoms", Some(&token), None)).await;
        assert!(listed.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn symptoms_round_trip_through_the_api() {
        let app = test_app();
        let token = sign_up(&app, "ana@example.com").await;

        let (status, created) = send(
            &app,
            request(
                "POST",
                "/symptoms",
                Some(&token),
                Some(json!({
                    "symptoms": ["Nausea", "Headache"],
                    "severity": "medium",
                    "logged_at": "2024-05-02T20:15:00"
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["severity"], "medium");

        let (_, listed) = send(&app, request("GET", "/symptoms", Some(&token), None)).await;
        assert_eq!(listed[0]["symptoms"], json!(["Nausea", "Headache"]));

        let uri = format!("/symptoms/{}", created["id"].as_str().unwrap());
        let (status, _) = send(&app, request("DELETE", &uri, Some(&token), None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn unknown_severity_is_rejected() {
        let app = test_app();
        let token = sign_up(&app, "ana@example.com").await;

        let (status, body) = send(
            &app,
            request("POST", "/symptoms", Some(&token), Some(json!({ "symptoms": ["Nausea"], "severity": "extreme" }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION");
    }

    #[tokio::test]
    async fn malformed_bodies_get_the_error_envelope() {
        let app = test_app();
        let token = sign_up(&app, "ana@example.com").await;

        for payload in [
            json!({ "symptoms": "Nausea" }),
            json!({ "symptoms": ["Nausea"], "logged_at": "yesterday evening" }),
            json!({ "symptoms": ["Nausea"], "dose_log_id": "not-a-uuid" }),
            json!("Nausea"),
        ] {
            let (status, body) = send(&app, request("POST", "/symptoms", Some(&token), Some(payload.clone()))).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{payload}");
            assert_eq!(body["error"]["code"], "VALIDATION", "{payload}");
            assert!(body["error"]["message"].is_string(), "{payload}");
        }
    }

    #[tokio::test]
    async fn symptoms_link_only_to_own_doses() {
        let app = test_app();
        let ana = sign_up(&app, "ana@example.com").await;
        let bia = sign_up(&app, "bia@example.com").await;

        let (_, dose) = send(&app, request("POST", "/doses", Some(&bia), Some(json!({ "dose_amount": 0.5 })))).await;
        let (status, body) = send(
            &app,
            request(
                "POST",
                "/symptoms",
                Some(&ana),
                Some(json!({ "symptoms": ["Nausea"], "dose_log_id": dose["id"] })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "STORE");

        let (_, own) = send(&app, request("POST", "/doses", Some(&ana), Some(json!({ "dose_amount": 0.5 })))).await;
        let (status, created) = send(
            &app,
            request(
                "POST",
                "/symptoms",
                Some(&ana),
                Some(json!({ "symptoms": ["Nausea"], "dose_log_id": own["id"] })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["dose_log_id"], own["id"]);
    }

    #[tokio::test]
    async fn vocabulary_lists_common_symptoms() {
        let app = test_app();
        let token = sign_up(&app, "ana@example.com").await;

        let (status, body) = send(&app, request("GET", "/symptoms/vocabulary", Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 10);
        assert_eq!(body[0], "Náusea");
        assert_eq!(body[7], "Dor de cabeça");
    }
}
