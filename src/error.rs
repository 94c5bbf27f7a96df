use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Local input problem, raised before any store call.
#[derive(Debug, Error, PartialEq)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Failure reported by the record store. The message is the backend's own.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    Backend(String),
}

impl StoreError {
    /// A linked dose that is missing or belongs to someone else.
    pub fn unknown_dose(id: uuid::Uuid) -> Self {
        StoreError::Rejected(format!("dose {id} does not exist"))
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Could not load the timeline")]
    AggregateFetch,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Not found")]
    NotFound,

    #[error("An internal error occurred")]
    Internal(#[from] anyhow::Error),
}

/// JSON body extractor and response. Bodies that fail to parse or
/// deserialize become `AppError::Validation`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(ValidationError::new(rejection.body_text()))
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION"),
            AppError::Store(StoreError::Conflict(_)) => (StatusCode::CONFLICT, "CONFLICT"),
            AppError::Store(StoreError::Rejected(_)) => (StatusCode::UNPROCESSABLE_ENTITY, "STORE"),
            AppError::Store(StoreError::Backend(_)) => (StatusCode::INTERNAL_SERVER_ERROR, "STORE"),
            AppError::AggregateFetch => (StatusCode::BAD_GATEWAY, "TIMELINE_UNAVAILABLE"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "AUTH_REQUIRED"),
            AppError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        match &self {
            AppError::Internal(e) => tracing::error!("❌ {code}: {e:?}"),
            _ if status.is_server_error() => tracing::error!("❌ {code}: {self}"),
            _ => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message: self.to_string(),
            },
        };

        (status, axum::Json(body)).into_response()
    }
}
