//! Inbound order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{LocationId, OperationId, OperationKind};
use domain::{NewOrder, OperationView};
use serde::Deserialize;
use store::{InventoryStore, LineItems};

use super::AppState;
use crate::caller::CallerLocation;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(alias = "idLocation")]
    pub location_id: LocationId,
    pub product_amount: LineItems,
    pub sender: String,
    #[serde(default)]
    pub scheduled_date: Option<DateTime<Utc>>,
}

/// POST /api/v1/orders: create an order in `PENDING`.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OperationView>), ApiError> {
    let view = state
        .operations
        .create_order(NewOrder {
            location_id: req.location_id,
            line_items: req.product_amount,
            sender: req.sender,
            scheduled_date: req.scheduled_date,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/v1/orders: orders at the caller's location.
#[tracing::instrument(skip(state))]
pub async fn list<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CallerLocation(location_id): CallerLocation,
) -> Result<Json<Vec<OperationView>>, ApiError> {
    let views = state
        .operations
        .list(OperationKind::Order, location_id)
        .await?;
    Ok(Json(views))
}

/// GET /api/v1/orders/{id}
#[tracing::instrument(skip(state, _caller))]
pub async fn get<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _caller: CallerLocation,
    Path(id): Path<i64>,
) -> Result<Json<OperationView>, ApiError> {
    let view = state
        .operations
        .get(OperationKind::Order, OperationId::new(id))
        .await?;
    Ok(Json(view))
}

/// POST /api/v1/orders/{id}/start
#[tracing::instrument(skip(state, _caller))]
pub async fn start<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _caller: CallerLocation,
    Path(id): Path<i64>,
) -> Result<Json<OperationView>, ApiError> {
    let view = state
        .operations
        .start(OperationKind::Order, OperationId::new(id))
        .await?;
    Ok(Json(view))
}

/// POST /api/v1/orders/{id}/finish: body maps product id to received amount.
#[tracing::instrument(skip(state, _caller, processed))]
pub async fn finish<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _caller: CallerLocation,
    Path(id): Path<i64>,
    Json(processed): Json<LineItems>,
) -> Result<Json<OperationView>, ApiError> {
    let view = state
        .operations
        .finish(OperationKind::Order, OperationId::new(id), Some(processed))
        .await?;
    Ok(Json(view))
}
