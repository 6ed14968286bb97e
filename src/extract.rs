//! Request extractors that reject with the service's JSON error body instead
//! of axum's plain-text rejections.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Path, Request, rejection::JsonRejection},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::errors::ManagerError;

/// RecordId
///
/// The integer `{id}` path segment. A segment that is not an integer names no
/// record, so it is rejected as `404 {"error":"Not found"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordId(pub i64);

impl<S> FromRequestParts<S> for RecordId
where
    S: Send + Sync,
{
    type Rejection = ManagerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                tracing::debug!("unmatched record id: {}", rejection.body_text());
                ManagerError::NotFoundOrForbidden
            })?;
        Ok(RecordId(id))
    }
}

/// JsonBody
///
/// Drop-in replacement for `Json<T>` whose rejection keeps axum's status
/// (400, 415 or 422) but answers with `{"error": ...}`.
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ManagerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| ManagerError::InvalidPayload {
                status: rejection.status(),
                reason: rejection.body_text(),
            })?;
        Ok(JsonBody(value))
    }
}
