use std::collections::HashMap;

use async_trait::async_trait;
use common::{LocationId, OperationId, OperationKind, ProductId};

use crate::{
    CommittedTransition, LineItems, Location, NewLocation, NewOperation, NewProduct, Operation,
    Product, Result, StockEntry, Transition,
};

/// Core trait for inventory persistence.
///
/// Every method is atomic on its own: multi-row writes (an operation with its
/// line items, a status flip with its ledger adjustments) are either fully
/// visible to readers or not at all. All implementations must be thread-safe
/// (Send + Sync).
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Checks that the backing storage is reachable.
    async fn ping(&self) -> Result<()>;

    /// Inserts a product. Fails with `Duplicate` if the barcode is taken.
    async fn insert_product(&self, product: NewProduct) -> Result<Product>;

    /// Retrieves a product by id.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Retrieves every product.
    async fn list_products(&self) -> Result<Vec<Product>>;

    /// Retrieves products whose id is in `ids` or whose barcode is in `barcodes`.
    async fn find_products(&self, ids: &[ProductId], barcodes: &[String]) -> Result<Vec<Product>>;

    /// Inserts a location.
    async fn insert_location(&self, location: NewLocation) -> Result<Location>;

    /// Retrieves a location by id.
    async fn get_location(&self, id: LocationId) -> Result<Option<Location>>;

    /// Retrieves every location.
    async fn list_locations(&self) -> Result<Vec<Location>>;

    /// Inserts a ledger row. Fails with `Duplicate` if `(product, location)` exists.
    async fn insert_stock_entry(&self, entry: StockEntry) -> Result<()>;

    /// Retrieves the quantities of existing ledger rows for the given products
    /// at one location. Products without a row are absent from the result.
    async fn get_stock(
        &self,
        product_ids: &[ProductId],
        location_id: LocationId,
    ) -> Result<HashMap<ProductId, i64>>;

    /// Inserts an operation in `Pending` together with its line items.
    async fn insert_operation(&self, operation: NewOperation) -> Result<Operation>;

    /// Retrieves an operation row by kind and id.
    async fn get_operation(&self, kind: OperationKind, id: OperationId)
    -> Result<Option<Operation>>;

    /// Retrieves every operation of a kind owned by a location, oldest first.
    async fn list_operations(
        &self,
        kind: OperationKind,
        location_id: LocationId,
    ) -> Result<Vec<Operation>>;

    /// Retrieves the line items of an operation.
    async fn line_items(&self, kind: OperationKind, id: OperationId) -> Result<LineItems>;

    /// Writes a new status (refreshing the modification timestamp) and applies
    /// the transition's ledger adjustments in one atomic unit.
    ///
    /// Returns None if the operation does not exist; nothing is written then.
    async fn commit_transition(&self, transition: Transition)
    -> Result<Option<CommittedTransition>>;
}

/// Extension trait providing convenience methods for stores.
#[async_trait]
pub trait InventoryStoreExt: InventoryStore {
    /// Checks if a product exists.
    async fn product_exists(&self, id: ProductId) -> Result<bool> {
        Ok(self.get_product(id).await?.is_some())
    }

    /// Checks if a location exists.
    async fn location_exists(&self, id: LocationId) -> Result<bool> {
        Ok(self.get_location(id).await?.is_some())
    }

    /// Retrieves the names of the given products; unknown ids are skipped.
    async fn product_names(&self, ids: &[ProductId]) -> Result<HashMap<ProductId, String>> {
        let products = self.find_products(ids, &[]).await?;
        Ok(products.into_iter().map(|p| (p.id, p.name)).collect())
    }
}

// Blanket implementation for all InventoryStore implementations
impl<T: InventoryStore + ?Sized> InventoryStoreExt for T {}
