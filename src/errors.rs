use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::enrichment::EnrichmentFailed;

/// StoreError
///
/// Failures raised by the Resource Store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness rule was broken (duplicate user email).
    #[error("constraint violated: {0}")]
    ConstraintViolation(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// ManagerError
///
/// Outcomes of a rejected Resource Manager operation.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("{0}")]
    ConstraintViolation(String),

    /// A referenced user (team leader or chief) does not exist.
    #[error("{field} {id} does not reference an existing user")]
    ReferenceNotFound { field: &'static str, id: i64 },

    /// The record is missing, or the principal may not touch it. Deliberately
    /// indistinguishable.
    #[error("Not found")]
    NotFoundOrForbidden,

    #[error("passwords do not match")]
    PasswordMismatch,

    #[error("incorrect login or password")]
    InvalidCredentials,

    #[error("authentication required")]
    Unauthenticated,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("session token could not be issued: {0}")]
    Session(#[from] jsonwebtoken::errors::Error),

    #[error("session lifetime of {0} hours is out of range")]
    SessionLifetime(i64),

    /// The request body could not be read as the expected JSON document.
    #[error("{reason}")]
    InvalidPayload { status: StatusCode, reason: String },

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ManagerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConstraintViolation(reason) => ManagerError::ConstraintViolation(reason),
            other => ManagerError::Store(other),
        }
    }
}

impl ManagerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ManagerError::ConstraintViolation(_) => StatusCode::CONFLICT,
            ManagerError::ReferenceNotFound { .. } | ManagerError::PasswordMismatch => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ManagerError::NotFoundOrForbidden => StatusCode::NOT_FOUND,
            ManagerError::InvalidCredentials | ManagerError::Unauthenticated => {
                StatusCode::UNAUTHORIZED
            }
            ManagerError::InvalidPayload { status, .. } => *status,
            ManagerError::Hashing(_)
            | ManagerError::Session(_)
            | ManagerError::SessionLifetime(_)
            | ManagerError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ManagerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            // Internal detail stays in the logs.
            tracing::error!("request failed: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        ManagerError::from(self).into_response()
    }
}

impl IntoResponse for EnrichmentFailed {
    fn into_response(self) -> Response {
        tracing::warn!(stage = %self.stage, "hometown enrichment failed: {}", self.reason);
        (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": self.to_string(), "stage": self.stage.to_string() })),
        )
            .into_response()
    }
}
