//! Caller location extractor.
//!
//! Authentication happens in front of this service; the access layer
//! forwards the caller's resolved location in the `X-Location-Id` header.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::LocationId;

use crate::error::ApiError;

pub const LOCATION_HEADER: &str = "x-location-id";

/// Location the authenticated caller is operating from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerLocation(pub LocationId);

impl<S: Send + Sync> FromRequestParts<S> for CallerLocation {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(LOCATION_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
            .map(|id| CallerLocation(LocationId::new(id)))
            .ok_or_else(|| ApiError::Forbidden("caller location is not available".to_string()))
    }
}
