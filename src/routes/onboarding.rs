use axum::{
    extract::State,
    middleware,
    routing::{get, post},
    Extension, Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::{require_auth, Claims};
use crate::error::{AppError, Json, ValidationError};
use crate::models::Screen;
use crate::onboarding::{progress_percent, FlowState, OnboardingFlow, OnboardingStep, Transition, STEPS};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct TransitionRequest {
    #[serde(default)]
    pub current_step: usize,
    #[serde(flatten)]
    pub transition: Transition,
}

#[derive(Serialize)]
pub struct TransitionResponse {
    #[serde(flatten)]
    pub state: FlowState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_percent: Option<u8>,
    pub next_screen: Screen,
}

#[derive(Serialize)]
pub struct StepView {
    pub index: usize,
    #[serde(flatten)]
    pub step: OnboardingStep,
    pub progress_percent: u8,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/onboarding/steps", get(list_steps))
        .route("/onboarding/transition", post(transition))
        .route("/onboarding/complete", post(complete))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
}

async fn list_steps() -> Json<Vec<StepView>> {
    let steps = STEPS
        .iter()
        .enumerate()
        .map(|(index, step)| StepView {
            index,
            step: *step,
            progress_percent: progress_percent(index),
        })
        .collect();
    Json(steps)
}

async fn transition(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<TransitionRequest>,
) -> Result<Json<TransitionResponse>, AppError> {
    let mut flow = OnboardingFlow::at(req.current_step)
        .map_err(|e| ValidationError::new(e.to_string()))?;
    let next = flow
        .apply(req.transition)
        .map_err(|e| ValidationError::new(e.to_string()))?;

    match next {
        FlowState::Step { step } => Ok(Json(TransitionResponse {
            state: next,
            progress_percent: Some(progress_percent(step)),
            next_screen: Screen::Onboarding,
        })),
        FlowState::Complete => complete(State(state), Extension(claims)).await,
    }
}

async fn complete(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<TransitionResponse>, AppError> {
    state.store.set_onboarding_completed(claims.sub, true).await?;

    tracing::info!("🎉 Onboarding completed for {}", claims.sub);

    Ok(Json(TransitionResponse {
        state: FlowState::Complete,
        progress_percent: None,
        next_screen: Screen::Dashboard,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::routes::testing::{request, send, sign_up, test_app};

    #[tokio::test]
    async fn steps_are_listed_with_progress() {
        let app = test_app();
        let token = sign_up(&app, "ana@example.com").await;

        let (status, body) = send(&app, request("GET", "/onboarding/steps", Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 3);
        assert_eq!(body[2]["progress_percent"], 100);
        assert_eq!(body[0]["title"], "Log your doses");
    }

    #[tokio::test]
    async fn intermediate_transitions_do_not_complete() {
        let app = test_app();
        let token = sign_up(&app, "ana@example.com").await;

        let (status, body) = send(
            &app,
            request("POST", "/onboarding/transition", Some(&token), Some(json!({ "current_step": 0, "action": "next" }))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "state": "step", "step": 1, "progress_percent": 66, "next_screen": "onboarding" }));

        let (_, me) = send(&app, request("GET", "/me", Some(&token), None)).await;
        assert_eq!(me["user"]["onboarding_completed"], false);
    }

    #[tokio::test]
    async fn next_on_last_step_persists_completion() {
        let app = test_app();
        let token = sign_up(&app, "ana@example.com").await;

        let (_, body) = send(
            &app,
            request("POST", "/onboarding/transition", Some(&token), Some(json!({ "current_step": 2, "action": "next" }))),
        )
        .await;
        assert_eq!(body["state"], "complete");
        assert_eq!(body["next_screen"], "dashboard");

        let (_, me) = send(&app, request("GET", "/me", Some(&token), None)).await;
        assert_eq!(me["user"]["onboarding_completed"], true);
        assert_eq!(me["next_screen"], "dashboard");
    }

    #[tokio::test]
    async fn skip_completes_immediately() {
        let app = test_app();
        let token = sign_up(&app, "ana@example.com").await;

        let (status, body) = send(
            &app,
            request("POST", "/onboarding/transition", Some(&token), Some(json!({ "action": "skip" }))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "complete");
    }

    #[tokio::test]
    async fn unknown_actions_are_validation_errors() {
        let app = test_app();
        let token = sign_up(&app, "ana@example.com").await;

        for payload in [
            json!({ "current_step": 0, "action": "finish" }),
            json!({ "current_step": 0, "action": "jump_to" }),
            json!({ "current_step": "first", "action": "next" }),
        ] {
            let (status, body) =
                send(&app, request("POST", "/onboarding/transition", Some(&token), Some(payload.clone()))).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{payload}");
            assert_eq!(body["error"]["code"], "VALIDATION", "{payload}");
        }
    }

    #[tokio::test]
    async fn jumping_past_the_last_step_is_rejected() {
        let app = test_app();
        let token = sign_up(&app, "ana@example.com").await;

        let (status, body) = send(
            &app,
            request(
                "POST",
                "/onboarding/transition",
                Some(&token),
                Some(json!({ "current_step": 0, "action": "jump_to", "step": 7 })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "step 7 is out of range (0..3)");
    }

    #[tokio::test]
    async fn signing_in_after_completion_routes_to_dashboard() {
        let app = test_app();
        let token = sign_up(&app, "ana@example.com").await;
        send(&app, request("POST", "/onboarding/complete", Some(&token), None)).await;

        let (_, body) = send(
            &app,
            request("POST", "/auth/sign-in", None, Some(json!({ "email": "ana@example.com", "password": "s3cret-pass" }))),
        )
        .await;
        assert_eq!(body["next_screen"], "dashboard");
    }
}
