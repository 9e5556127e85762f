//! Location endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use store::{InventoryStore, Location, NewLocation};

use super::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct PositionQuery {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
pub struct CreateLocationRequest {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius: f64,
}

/// GET /api/v1/location: the location containing a position.
#[tracing::instrument(skip(state))]
pub async fn resolve<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<PositionQuery>,
) -> Result<Json<Location>, ApiError> {
    state
        .catalog
        .resolve_location(query.latitude, query.longitude)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Position is not inside any location".to_string()))
}

/// POST /api/v1/location
#[tracing::instrument(skip(state, req))]
pub async fn create<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateLocationRequest>,
) -> Result<(StatusCode, Json<Location>), ApiError> {
    let location = state
        .catalog
        .create_location(NewLocation {
            name: req.name,
            latitude: req.latitude,
            longitude: req.longitude,
            radius: req.radius,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(location)))
}

/// GET /api/v1/locations
#[tracing::instrument(skip(state))]
pub async fn list<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Location>>, ApiError> {
    Ok(Json(state.catalog.list_locations().await?))
}
