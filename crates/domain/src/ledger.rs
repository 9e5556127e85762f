//! Stock ledger: per-(product, location) quantities.
//!
//! Reads and new rows go through [`StockLedger`]. Adjustments caused by a
//! transition are planned here as [`StockChange`]s and committed by the
//! store together with the status write.

use std::collections::BTreeMap;
use std::sync::Arc;

use common::{LocationId, ProductId};
use store::{InventoryStore, InventoryStoreExt, LineItems, StockChange, StockEntry};

use crate::error::{DomainError, Result};

/// Read and create access to the ledger.
pub struct StockLedger<S> {
    store: Arc<S>,
}

impl<S: InventoryStore> StockLedger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Quantity of each requested product at a location, 0 where no row exists.
    #[tracing::instrument(skip(self))]
    pub async fn levels(
        &self,
        product_ids: &[ProductId],
        location_id: LocationId,
    ) -> Result<BTreeMap<ProductId, i64>> {
        let stored = self.store.get_stock(product_ids, location_id).await?;
        Ok(product_ids
            .iter()
            .map(|id| (*id, stored.get(id).copied().unwrap_or(0)))
            .collect())
    }

    /// Inserts a new ledger row.
    ///
    /// Fails with `NotFound` for an unknown product or location and with
    /// `StoreError::Duplicate` when the row already exists.
    #[tracing::instrument(skip(self))]
    pub async fn create_entry(&self, entry: StockEntry) -> Result<StockEntry> {
        if entry.quantity < 0 {
            return Err(DomainError::Validation(format!(
                "quantity must not be negative, got {}",
                entry.quantity
            )));
        }
        if !self.store.product_exists(entry.product_id).await? {
            return Err(DomainError::not_found("product", entry.product_id));
        }
        if !self.store.location_exists(entry.location_id).await? {
            return Err(DomainError::not_found("location", entry.location_id));
        }

        self.store.insert_stock_entry(entry.clone()).await?;
        tracing::info!(
            product_id = %entry.product_id,
            location_id = %entry.location_id,
            quantity = entry.quantity,
            "stock entry created"
        );
        Ok(entry)
    }
}

/// Whether `actual` holds at least the requested amount of every product.
pub fn covers(required: &LineItems, actual: &BTreeMap<ProductId, i64>) -> bool {
    required
        .iter()
        .all(|(id, amount)| i64::from(*amount) <= actual.get(id).copied().unwrap_or(0))
}

/// Decreases taking a finished shipment's line items out of its location.
pub fn shipment_decrease(location_id: LocationId, items: &LineItems) -> Vec<StockChange> {
    plan(location_id, items, -1)
}

/// Increases adding an order's processed stock to its location.
pub fn order_increase(location_id: LocationId, processed: &LineItems) -> Vec<StockChange> {
    plan(location_id, processed, 1)
}

fn plan(location_id: LocationId, items: &LineItems, sign: i64) -> Vec<StockChange> {
    items
        .iter()
        .filter(|(_, amount)| **amount > 0)
        .map(|(product_id, amount)| StockChange {
            product_id: *product_id,
            location_id,
            delta: sign * i64::from(*amount),
        })
        .collect()
}
