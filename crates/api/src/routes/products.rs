//! Product catalog and stock endpoints.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use common::{LocationId, ProductId};
use serde::Deserialize;
use store::{InventoryStore, NewProduct, Product, StockEntry};

use super::{AppState, parse_list};
use crate::caller::CallerLocation;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "ean13")]
    pub barcode: Option<String>,
    #[serde(default, alias = "imageURL")]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStockEntryRequest {
    pub product_id: ProductId,
    pub location_id: LocationId,
    #[serde(alias = "stock")]
    pub quantity: i64,
    #[serde(default, alias = "innerLocation")]
    pub sub_location: Option<String>,
}

/// Comma-separated filters, e.g. `?ids=1,2&barcodes=7791234567890`.
#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub ids: Option<String>,
    #[serde(alias = "ean13s")]
    pub barcodes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StockQuery {
    pub ids: Option<String>,
}

/// POST /api/v1/products
#[tracing::instrument(skip(state, req))]
pub async fn create<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = state
        .catalog
        .create_product(NewProduct {
            name: req.name,
            description: req.description,
            barcode: req.barcode,
            image_url: req.image_url,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /api/v1/products: products by id or barcode, all when unfiltered.
#[tracing::instrument(skip(state, _caller))]
pub async fn find<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _caller: CallerLocation,
    Query(query): Query<ProductQuery>,
) -> Result<Json<BTreeMap<ProductId, Product>>, ApiError> {
    let ids: Vec<ProductId> = parse_list::<i64>("ids", query.ids.as_deref())?
        .into_iter()
        .map(ProductId::new)
        .collect();
    let barcodes: Vec<String> = parse_list("barcodes", query.barcodes.as_deref())?;

    let products = state.catalog.find_products(&ids, &barcodes).await?;
    Ok(Json(products))
}

/// POST /api/v1/products/stock: register a product at a location.
#[tracing::instrument(skip(state, req))]
pub async fn create_stock<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateStockEntryRequest>,
) -> Result<(StatusCode, Json<StockEntry>), ApiError> {
    let entry = state
        .ledger
        .create_entry(StockEntry {
            product_id: req.product_id,
            location_id: req.location_id,
            quantity: req.quantity,
            sub_location: req.sub_location,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /api/v1/products/stock: quantities at the caller's location.
#[tracing::instrument(skip(state))]
pub async fn stock<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CallerLocation(location_id): CallerLocation,
    Query(query): Query<StockQuery>,
) -> Result<Json<BTreeMap<ProductId, i64>>, ApiError> {
    let ids: Vec<ProductId> = parse_list::<i64>("ids", query.ids.as_deref())?
        .into_iter()
        .map(ProductId::new)
        .collect();

    let levels = state.ledger.levels(&ids, location_id).await?;
    Ok(Json(levels))
}
