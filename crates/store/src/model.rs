//! Records persisted by the inventory store.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::{LocationId, OperationId, OperationKind, ProductId, Status};
use serde::{Deserialize, Serialize};

/// Requested amount per product for one operation.
pub type LineItems = BTreeMap<ProductId, u32>;

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    /// EAN-13 barcode, unique across the catalog.
    pub barcode: Option<String>,
    pub image_url: Option<String>,
}

/// Data required to insert a product.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub barcode: Option<String>,
    pub image_url: Option<String>,
}

/// A physical location, described as a circle around a coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Radius in meters.
    pub radius: f64,
}

/// Data required to insert a location.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLocation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius: f64,
}

/// Quantity of one product held at one location.
///
/// Unique per `(product_id, location_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockEntry {
    pub product_id: ProductId,
    pub location_id: LocationId,
    pub quantity: i64,
    /// Free-text placement inside the location (aisle, shelf).
    pub sub_location: Option<String>,
}

/// Variant-specific fields of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationDetails {
    Order {
        sender: String,
        scheduled_date: Option<DateTime<Utc>>,
    },
    Shipment {
        customer_name: String,
    },
}

impl OperationDetails {
    pub fn kind(&self) -> OperationKind {
        match self {
            OperationDetails::Order { .. } => OperationKind::Order,
            OperationDetails::Shipment { .. } => OperationKind::Shipment,
        }
    }
}

/// A persisted order or shipment row, without its line items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub id: OperationId,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub location_id: LocationId,
    pub details: OperationDetails,
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        self.details.kind()
    }
}

/// A new operation together with the line items written alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOperation {
    pub location_id: LocationId,
    pub details: OperationDetails,
    pub line_items: LineItems,
}

/// A relative adjustment of one ledger row.
///
/// Positive deltas create the row when it does not exist yet; negative
/// deltas only touch existing rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockChange {
    pub product_id: ProductId,
    pub location_id: LocationId,
    pub delta: i64,
}

/// A status write plus the ledger adjustments committed with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub kind: OperationKind,
    pub id: OperationId,
    pub status: Status,
    pub stock_changes: Vec<StockChange>,
}

impl Transition {
    /// A transition that only changes the status.
    pub fn status_only(kind: OperationKind, id: OperationId, status: Status) -> Self {
        Self {
            kind,
            id,
            status,
            stock_changes: Vec::new(),
        }
    }

    pub fn with_stock_changes(mut self, changes: Vec<StockChange>) -> Self {
        self.stock_changes = changes;
        self
    }
}

/// Result of a committed transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedTransition {
    /// The operation row after the write.
    pub operation: Operation,
    /// Resulting quantity of every ledger row touched by the transition.
    pub stock_levels: BTreeMap<ProductId, i64>,
}
