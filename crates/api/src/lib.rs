//! HTTP API server with observability for the inventory system.
//!
//! Provides REST endpoints under `/api/v1` for orders, shipments, products,
//! stock and locations, with structured logging (tracing) and Prometheus
//! metrics.

pub mod caller;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use domain::{Catalog, EntityLocks, OperationService, StockLedger};
use metrics_exporter_prometheus::PrometheusHandle;
use store::InventoryStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: InventoryStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let v1 = Router::new()
        .route(
            "/orders",
            post(routes::orders::create::<S>).get(routes::orders::list::<S>),
        )
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/start", post(routes::orders::start::<S>))
        .route("/orders/{id}/finish", post(routes::orders::finish::<S>))
        .route(
            "/shipments",
            post(routes::shipments::create::<S>).get(routes::shipments::list::<S>),
        )
        .route("/shipments/{id}", get(routes::shipments::get::<S>))
        .route("/shipments/{id}/start", post(routes::shipments::start::<S>))
        .route("/shipments/{id}/finish", post(routes::shipments::finish::<S>))
        .route("/shipments/{id}/block", post(routes::shipments::block::<S>))
        .route(
            "/products",
            post(routes::products::create::<S>).get(routes::products::find::<S>),
        )
        .route(
            "/products/stock",
            post(routes::products::create_stock::<S>).get(routes::products::stock::<S>),
        )
        .route(
            "/location",
            get(routes::locations::resolve::<S>).post(routes::locations::create::<S>),
        )
        .route("/locations", get(routes::locations::list::<S>));

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .nest("/api/v1", v1)
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state over a store.
///
/// All services share the store and one lock registry.
pub fn create_state<S: InventoryStore + 'static>(store: S) -> Arc<AppState<S>> {
    let store = Arc::new(store);
    let locks = Arc::new(EntityLocks::new());

    Arc::new(AppState {
        operations: OperationService::new(Arc::clone(&store), locks),
        catalog: Catalog::new(Arc::clone(&store)),
        ledger: StockLedger::new(store),
    })
}
