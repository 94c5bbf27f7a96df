use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{hash_password, issue_token, require_auth, verify_password, Claims};
use crate::error::{AppError, Json, ValidationError};
use crate::models::{NewUser, Screen, User};
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 8;
const RESET_TOKEN_TTL_HOURS: i64 = 1;

#[derive(Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ConfirmResetRequest {
    pub token: Uuid,
    pub new_password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
    pub next_screen: Screen,
}

#[derive(Serialize)]
pub struct CurrentUser {
    pub user: User,
    pub next_screen: Screen,
}

pub fn routes(state: AppState) -> Router {
    let protected = Router::new()
        .route("/auth/sign-out", post(sign_out))
        .route("/me", get(current_user))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/auth/sign-up", post(sign_up))
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/reset-password", post(request_password_reset))
        .route("/auth/reset-password/confirm", post(confirm_password_reset))
        .merge(protected)
        .with_state(state)
}

fn normalize_email(raw: &str) -> Result<String, ValidationError> {
    let email = raw.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(ValidationError::new("a valid email is required")),
    }
}

fn check_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::new(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn authenticated(state: &AppState, user: User) -> Result<AuthResponse, AppError> {
    let token = issue_token(&state.config.jwt_secret, &user, state.config.token_ttl_days)?;
    Ok(AuthResponse {
        next_screen: Screen::for_user(&user),
        user,
        token,
    })
}

async fn sign_up(
    State(state): State<AppState>,
    Json(req): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let email = normalize_email(&req.email)?;
    check_password(&req.password)?;
    let full_name = req.full_name.trim().to_string();
    if full_name.is_empty() {
        return Err(ValidationError::new("full name is required").into());
    }

    let password_hash = hash_password(&req.password)?;
    let user = state
        .store
        .create_user(NewUser { email, full_name, password_hash })
        .await?;

    tracing::info!("👤 New account {}", user.id);

    Ok((StatusCode::CREATED, Json(authenticated(&state, user)?)))
}

async fn sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = normalize_email(&req.email).map_err(|_| AppError::Unauthorized)?;

    let credentials = state
        .store
        .find_credentials(email)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !verify_password(&req.password, &credentials.password_hash) {
        return Err(AppError::Unauthorized);
    }

    Ok(Json(authenticated(&state, credentials.user)?))
}

async fn sign_out(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> StatusCode {
    let now = chrono::Utc::now().timestamp() as usize;
    state.revoke(claims.jti, claims.exp, now).await;
    StatusCode::NO_CONTENT
}

async fn current_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<CurrentUser>, AppError> {
    let user = state
        .store
        .find_user(claims.sub)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(CurrentUser {
        next_screen: Screen::for_user(&user),
        user,
    }))
}

/// Always accepted for a well-formed email so callers cannot tell which
/// accounts exist. The token is only logged at debug level for out-of-band
/// delivery.
async fn request_password_reset(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<StatusCode, AppError> {
    let email = normalize_email(&req.email)?;

    if let Some(credentials) = state.store.find_credentials(email).await? {
        let token = Uuid::new_v4();
        let expires_at = chrono::Utc::now() + chrono::Duration::hours(RESET_TOKEN_TTL_HOURS);
        state
            .store
            .set_reset_token(credentials.user.id, token, expires_at)
            .await?;
        tracing::info!(user_id = %credentials.user.id, "📧 Password reset requested");
        tracing::debug!(user_id = %credentials.user.id, %token, "📧 Reset token issued");
    }

    Ok(StatusCode::ACCEPTED)
}

async fn confirm_password_reset(
    State(state): State<AppState>,
    Json(req): Json<ConfirmResetRequest>,
) -> Result<StatusCode, AppError> {
    check_password(&req.new_password)?;
    let password_hash = hash_password(&req.new_password)?;

    state
        .store
        .reset_password(req.token, chrono::Utc::now(), password_hash)
        .await?
        .ok_or_else(|| ValidationError::new("reset token is invalid or expired"))?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::routes::testing::{request, send, sign_up, test_app};

    #[tokio::test]
    async fn sign_up_routes_new_users_to_onboarding() {
        let app = test_app();
        let (status, body) = send(
            &app,
            request(
                "POST",
                "/auth/sign-up",
                None,
                Some(json!({ "email": " Ana@Example.com ", "password": "s3cret-pass", "full_name": "Ana" })),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"]["email"], "ana@example.com");
        assert_eq!(body["next_screen"], "onboarding");
        assert!(body["user"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn duplicate_sign_up_conflicts() {
        let app = test_app();
        sign_up(&app, "ana@example.com").await;
        let (status, body) = send(
            &app,
            request(
                "POST",
                "/auth/sign-up",
                None,
                Some(json!({ "email": "ana@example.com", "password": "another-pass", "full_name": "Ana" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn short_passwords_are_rejected() {
        let app = test_app();
        let (status, body) = send(
            &app,
            request(
                "POST",
                "/auth/sign-up",
                None,
                Some(json!({ "email": "ana@example.com", "password": "short", "full_name": "Ana" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION");
    }

    #[tokio::test]
    async fn incomplete_sign_up_is_a_validation_error() {
        let app = test_app();
        for payload in [
            json!({ "email": "ana@example.com", "full_name": "Ana" }),
            json!({ "email": "ana@example.com", "password": 12345678, "full_name": "Ana" }),
        ] {
            let (status, body) = send(&app, request("POST", "/auth/sign-up", None, Some(payload.clone()))).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{payload}");
            assert_eq!(body["error"]["code"], "VALIDATION", "{payload}");
        }
    }

    #[tokio::test]
    async fn malformed_reset_token_is_a_validation_error() {
        let app = test_app();
        let (status, body) = send(
            &app,
            request(
                "POST",
                "/auth/reset-password/confirm",
                None,
                Some(json!({ "token": "abc", "new_password": "long-enough" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION");
    }

    #[tokio::test]
    async fn sign_in_checks_password() {
        let app = test_app();
        sign_up(&app, "ana@example.com").await;

        let (status, _) = send(
            &app,
            request("POST", "/auth/sign-in", None, Some(json!({ "email": "ana@example.com", "password": "nope-nope" }))),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(
            &app,
            request("POST", "/auth/sign-in", None, Some(json!({ "email": "ANA@example.com", "password": "s3cret-pass" }))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["token"].is_string());
    }

    #[tokio::test]
    async fn me_requires_a_token() {
        let app = test_app();
        let (status, body) = send(&app, request("GET", "/me", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "AUTH_REQUIRED");
    }

    #[tokio::test]
    async fn signed_out_tokens_stop_working() {
        let app = test_app();
        let token = sign_up(&app, "ana@example.com").await;

        let (status, body) = send(&app, request("GET", "/me", Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["full_name"], "Test Patient");

        let (status, _) = send(&app, request("POST", "/auth/sign-out", Some(&token), None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, request("GET", "/me", Some(&token), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn reset_is_accepted_for_unknown_accounts() {
        let app = test_app();
        let (status, _) = send(
            &app,
            request("POST", "/auth/reset-password", None, Some(json!({ "email": "nobody@example.com" }))),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let (status, _) = send(
            &app,
            request("POST", "/auth/reset-password", None, Some(json!({ "email": "not-an-email" }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_reset_token_is_rejected() {
        let app = test_app();
        let (status, body) = send(
            &app,
            request(
                "POST",
                "/auth/reset-password/confirm",
                None,
                Some(json!({ "token": uuid::Uuid::new_v4(), "new_password": "brand-new-pass" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "reset token is invalid or expired");
    }
}
