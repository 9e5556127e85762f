//! Outbound shipment endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{LocationId, OperationId, OperationKind};
use domain::{NewShipment, OperationView};
use serde::Deserialize;
use store::{InventoryStore, LineItems};

use super::AppState;
use crate::caller::CallerLocation;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShipmentRequest {
    #[serde(alias = "idLocation")]
    pub location_id: LocationId,
    pub product_amount: LineItems,
    pub customer_name: String,
}

/// POST /api/v1/shipments: create a shipment in `PENDING`.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateShipmentRequest>,
) -> Result<(StatusCode, Json<OperationView>), ApiError> {
    let view = state
        .operations
        .create_shipment(NewShipment {
            location_id: req.location_id,
            line_items: req.product_amount,
            customer_name: req.customer_name,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/v1/shipments: shipments at the caller's location.
#[tracing::instrument(skip(state))]
pub async fn list<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CallerLocation(location_id): CallerLocation,
) -> Result<Json<Vec<OperationView>>, ApiError> {
    let views = state
        .operations
        .list(OperationKind::Shipment, location_id)
        .await?;
    Ok(Json(views))
}

/// GET /api/v1/shipments/{id}
#[tracing::instrument(skip(state, _caller))]
pub async fn get<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _caller: CallerLocation,
    Path(id): Path<i64>,
) -> Result<Json<OperationView>, ApiError> {
    let view = state
        .operations
        .get(OperationKind::Shipment, OperationId::new(id))
        .await?;
    Ok(Json(view))
}

/// POST /api/v1/shipments/{id}/start: 409 with the shipment left `BLOCKED`
/// when stock does not cover it.
#[tracing::instrument(skip(state, _caller))]
pub async fn start<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _caller: CallerLocation,
    Path(id): Path<i64>,
) -> Result<Json<OperationView>, ApiError> {
    let view = state
        .operations
        .start(OperationKind::Shipment, OperationId::new(id))
        .await?;
    Ok(Json(view))
}

/// POST /api/v1/shipments/{id}/finish
#[tracing::instrument(skip(state, _caller))]
pub async fn finish<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _caller: CallerLocation,
    Path(id): Path<i64>,
) -> Result<Json<OperationView>, ApiError> {
    let view = state
        .operations
        .finish(OperationKind::Shipment, OperationId::new(id), None)
        .await?;
    Ok(Json(view))
}

/// POST /api/v1/shipments/{id}/block
#[tracing::instrument(skip(state, _caller))]
pub async fn block<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _caller: CallerLocation,
    Path(id): Path<i64>,
) -> Result<Json<OperationView>, ApiError> {
    let view = state.operations.block(OperationId::new(id)).await?;
    Ok(Json(view))
}
