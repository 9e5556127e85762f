use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{LocationId, OperationId, OperationKind, ProductId, Status};
use tokio::sync::RwLock;

use crate::{
    CommittedTransition, InventoryStore, LineItems, Location, NewLocation, NewOperation,
    NewProduct, Operation, Product, Result, StockEntry, StoreError, Transition,
};

#[derive(Default)]
struct Tables {
    products: BTreeMap<ProductId, Product>,
    locations: BTreeMap<LocationId, Location>,
    stock: HashMap<(ProductId, LocationId), StockEntry>,
    orders: BTreeMap<OperationId, Operation>,
    shipments: BTreeMap<OperationId, Operation>,
    line_items: HashMap<(OperationKind, OperationId), LineItems>,
    last_product_id: i64,
    last_location_id: i64,
    last_order_id: i64,
    last_shipment_id: i64,
}

impl Tables {
    fn operations(&self, kind: OperationKind) -> &BTreeMap<OperationId, Operation> {
        match kind {
            OperationKind::Order => &self.orders,
            OperationKind::Shipment => &self.shipments,
        }
    }

    fn operations_mut(&mut self, kind: OperationKind) -> &mut BTreeMap<OperationId, Operation> {
        match kind {
            OperationKind::Order => &mut self.orders,
            OperationKind::Shipment => &mut self.shipments,
        }
    }

    fn next_operation_id(&mut self, kind: OperationKind) -> OperationId {
        let counter = match kind {
            OperationKind::Order => &mut self.last_order_id,
            OperationKind::Shipment => &mut self.last_shipment_id,
        };
        *counter += 1;
        OperationId::new(*counter)
    }
}

/// In-memory inventory store for tests and local runs.
///
/// All tables sit behind a single lock, so every trait method is atomic
/// with respect to every other, matching the transactional guarantees of
/// the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the full ledger row for a product at a location, if any.
    pub async fn stock_entry(
        &self,
        product_id: ProductId,
        location_id: LocationId,
    ) -> Option<StockEntry> {
        self.tables
            .read()
            .await
            .stock
            .get(&(product_id, location_id))
            .cloned()
    }

    /// Overwrites the status of an operation without touching anything else.
    ///
    /// Intended for setting up fixtures in tests.
    pub async fn force_status(&self, kind: OperationKind, id: OperationId, status: Status) {
        let mut tables = self.tables.write().await;
        if let Some(operation) = tables.operations_mut(kind).get_mut(&id) {
            operation.status = status;
        }
    }
}

#[async_trait]
impl InventoryStore for InMemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product> {
        let mut tables = self.tables.write().await;

        if let Some(barcode) = &product.barcode
            && tables
                .products
                .values()
                .any(|p| p.barcode.as_ref() == Some(barcode))
        {
            return Err(StoreError::Duplicate {
                entity: "product barcode",
                key: barcode.clone(),
            });
        }

        tables.last_product_id += 1;
        let stored = Product {
            id: ProductId::new(tables.last_product_id),
            name: product.name,
            description: product.description,
            barcode: product.barcode,
            image_url: product.image_url,
        };
        tables.products.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self.tables.read().await.products.values().cloned().collect())
    }

    async fn find_products(&self, ids: &[ProductId], barcodes: &[String]) -> Result<Vec<Product>> {
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .values()
            .filter(|p| {
                ids.contains(&p.id)
                    || p.barcode
                        .as_ref()
                        .is_some_and(|code| barcodes.contains(code))
            })
            .cloned()
            .collect())
    }

    async fn insert_location(&self, location: NewLocation) -> Result<Location> {
        let mut tables = self.tables.write().await;
        tables.last_location_id += 1;
        let stored = Location {
            id: LocationId::new(tables.last_location_id),
            name: location.name,
            latitude: location.latitude,
            longitude: location.longitude,
            radius: location.radius,
        };
        tables.locations.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_location(&self, id: LocationId) -> Result<Option<Location>> {
        Ok(self.tables.read().await.locations.get(&id).cloned())
    }

    async fn list_locations(&self) -> Result<Vec<Location>> {
        Ok(self.tables.read().await.locations.values().cloned().collect())
    }

    async fn insert_stock_entry(&self, entry: StockEntry) -> Result<()> {
        let mut tables = self.tables.write().await;
        let key = (entry.product_id, entry.location_id);
        if tables.stock.contains_key(&key) {
            return Err(StoreError::Duplicate {
                entity: "stock entry",
                key: format!("product {} at location {}", key.0, key.1),
            });
        }
        tables.stock.insert(key, entry);
        Ok(())
    }

    async fn get_stock(
        &self,
        product_ids: &[ProductId],
        location_id: LocationId,
    ) -> Result<HashMap<ProductId, i64>> {
        let tables = self.tables.read().await;
        Ok(product_ids
            .iter()
            .filter_map(|id| {
                tables
                    .stock
                    .get(&(*id, location_id))
                    .map(|entry| (*id, entry.quantity))
            })
            .collect())
    }

    async fn insert_operation(&self, operation: NewOperation) -> Result<Operation> {
        let mut tables = self.tables.write().await;
        let kind = operation.details.kind();
        let id = tables.next_operation_id(kind);
        let now = Utc::now();

        let stored = Operation {
            id,
            status: Status::Pending,
            created_at: now,
            updated_at: now,
            location_id: operation.location_id,
            details: operation.details,
        };
        tables.operations_mut(kind).insert(id, stored.clone());
        tables.line_items.insert((kind, id), operation.line_items);
        Ok(stored)
    }

    async fn get_operation(
        &self,
        kind: OperationKind,
        id: OperationId,
    ) -> Result<Option<Operation>> {
        Ok(self.tables.read().await.operations(kind).get(&id).cloned())
    }

    async fn list_operations(
        &self,
        kind: OperationKind,
        location_id: LocationId,
    ) -> Result<Vec<Operation>> {
        let tables = self.tables.read().await;
        Ok(tables
            .operations(kind)
            .values()
            .filter(|op| op.location_id == location_id)
            .cloned()
            .collect())
    }

    async fn line_items(&self, kind: OperationKind, id: OperationId) -> Result<LineItems> {
        let tables = self.tables.read().await;
        Ok(tables
            .line_items
            .get(&(kind, id))
            .cloned()
            .unwrap_or_default())
    }

    async fn commit_transition(
        &self,
        transition: Transition,
    ) -> Result<Option<CommittedTransition>> {
        let mut tables = self.tables.write().await;

        let Some(operation) = tables
            .operations_mut(transition.kind)
            .get_mut(&transition.id)
        else {
            return Ok(None);
        };
        operation.status = transition.status;
        operation.updated_at = Utc::now();
        let operation = operation.clone();

        let mut stock_levels = BTreeMap::new();
        for change in &transition.stock_changes {
            let key = (change.product_id, change.location_id);
            if let Some(entry) = tables.stock.get_mut(&key) {
                entry.quantity += change.delta;
                stock_levels.insert(change.product_id, entry.quantity);
            } else if change.delta > 0 {
                tables.stock.insert(
                    key,
                    StockEntry {
                        product_id: change.product_id,
                        location_id: change.location_id,
                        quantity: change.delta,
                        sub_location: None,
                    },
                );
                stock_levels.insert(change.product_id, change.delta);
            }
        }

        Ok(Some(CommittedTransition {
            operation,
            stock_levels,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InventoryStoreExt, OperationDetails, StockChange};

    fn widget() -> NewProduct {
        NewProduct {
            name: "Widget".to_string(),
            description: None,
            barcode: Some("7791234567890".to_string()),
            image_url: None,
        }
    }

    fn shipment(location_id: LocationId, items: &[(i64, u32)]) -> NewOperation {
        NewOperation {
            location_id,
            details: OperationDetails::Shipment {
                customer_name: "ACME".to_string(),
            },
            line_items: items
                .iter()
                .map(|(id, amount)| (ProductId::new(*id), *amount))
                .collect(),
        }
    }

    #[tokio::test]
    async fn insert_product_assigns_sequential_ids() {
        let store = InMemoryStore::new();
        let first = store.insert_product(widget()).await.unwrap();
        let mut second = widget();
        second.barcode = None;
        let second = store.insert_product(second).await.unwrap();

        assert_eq!(first.id, ProductId::new(1));
        assert_eq!(second.id, ProductId::new(2));
        assert!(store.product_exists(first.id).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_barcode_is_rejected() {
        let store = InMemoryStore::new();
        store.insert_product(widget()).await.unwrap();

        let result = store.insert_product(widget()).await;
        assert!(matches!(result, Err(StoreError::Duplicate { .. })));
        assert_eq!(store.list_products().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn find_products_matches_ids_or_barcodes() {
        let store = InMemoryStore::new();
        let coded = store.insert_product(widget()).await.unwrap();
        let mut plain = widget();
        plain.name = "Gadget".to_string();
        plain.barcode = None;
        let plain = store.insert_product(plain).await.unwrap();

        let by_barcode = store
            .find_products(&[], &["7791234567890".to_string()])
            .await
            .unwrap();
        assert_eq!(by_barcode, vec![coded.clone()]);

        let both = store
            .find_products(&[plain.id], &["7791234567890".to_string()])
            .await
            .unwrap();
        assert_eq!(both.len(), 2);

        let names = store
            .product_names(&[plain.id, ProductId::new(99)])
            .await
            .unwrap();
        assert_eq!(names.len(), 1);
        assert_eq!(names[&plain.id], "Gadget");
    }

    #[tokio::test]
    async fn duplicate_stock_entry_is_rejected() {
        let store = InMemoryStore::new();
        let entry = StockEntry {
            product_id: ProductId::new(1),
            location_id: LocationId::new(1),
            quantity: 4,
            sub_location: Some("A-3".to_string()),
        };
        store.insert_stock_entry(entry.clone()).await.unwrap();

        let result = store.insert_stock_entry(entry).await;
        assert!(matches!(result, Err(StoreError::Duplicate { .. })));
    }

    #[tokio::test]
    async fn get_stock_omits_missing_rows() {
        let store = InMemoryStore::new();
        store
            .insert_stock_entry(StockEntry {
                product_id: ProductId::new(1),
                location_id: LocationId::new(1),
                quantity: 4,
                sub_location: None,
            })
            .await
            .unwrap();

        let stock = store
            .get_stock(&[ProductId::new(1), ProductId::new(2)], LocationId::new(1))
            .await
            .unwrap();
        assert_eq!(stock.len(), 1);
        assert_eq!(stock[&ProductId::new(1)], 4);
    }

    #[tokio::test]
    async fn orders_and_shipments_are_numbered_independently() {
        let store = InMemoryStore::new();
        let location = LocationId::new(1);
        let s1 = store.insert_operation(shipment(location, &[(1, 1)])).await.unwrap();
        let o1 = store
            .insert_operation(NewOperation {
                location_id: location,
                details: OperationDetails::Order {
                    sender: "Supplier".to_string(),
                    scheduled_date: None,
                },
                line_items: LineItems::from([(ProductId::new(1), 2)]),
            })
            .await
            .unwrap();

        assert_eq!(s1.id, OperationId::new(1));
        assert_eq!(o1.id, OperationId::new(1));
        assert_eq!(s1.status, Status::Pending);
        assert!(
            store
                .get_operation(OperationKind::Order, OperationId::new(2))
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(
            store
                .line_items(OperationKind::Order, o1.id)
                .await
                .unwrap()
                .get(&ProductId::new(1)),
            Some(&2)
        );
    }

    #[tokio::test]
    async fn list_operations_filters_by_location() {
        let store = InMemoryStore::new();
        store
            .insert_operation(shipment(LocationId::new(1), &[(1, 1)]))
            .await
            .unwrap();
        store
            .insert_operation(shipment(LocationId::new(2), &[(1, 1)]))
            .await
            .unwrap();

        let here = store
            .list_operations(OperationKind::Shipment, LocationId::new(1))
            .await
            .unwrap();
        assert_eq!(here.len(), 1);
        assert_eq!(here[0].location_id, LocationId::new(1));
    }

    #[tokio::test]
    async fn commit_transition_updates_status_and_stock_together() {
        let store = InMemoryStore::new();
        let location = LocationId::new(1);
        store
            .insert_stock_entry(StockEntry {
                product_id: ProductId::new(1),
                location_id: location,
                quantity: 5,
                sub_location: None,
            })
            .await
            .unwrap();
        let op = store.insert_operation(shipment(location, &[(1, 3)])).await.unwrap();

        let committed = store
            .commit_transition(
                Transition::status_only(OperationKind::Shipment, op.id, Status::Completed)
                    .with_stock_changes(vec![
                        StockChange {
                            product_id: ProductId::new(1),
                            location_id: location,
                            delta: -3,
                        },
                        StockChange {
                            product_id: ProductId::new(2),
                            location_id: location,
                            delta: -1,
                        },
                    ]),
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(committed.operation.status, Status::Completed);
        assert!(committed.operation.updated_at >= op.updated_at);
        assert_eq!(committed.stock_levels[&ProductId::new(1)], 2);
        // decreases never create rows
        assert!(!committed.stock_levels.contains_key(&ProductId::new(2)));
        assert!(store.stock_entry(ProductId::new(2), location).await.is_none());
    }

    #[tokio::test]
    async fn positive_change_creates_missing_row() {
        let store = InMemoryStore::new();
        let location = LocationId::new(3);
        let op = store.insert_operation(shipment(location, &[(1, 1)])).await.unwrap();

        store
            .commit_transition(
                Transition::status_only(OperationKind::Shipment, op.id, Status::Completed)
                    .with_stock_changes(vec![StockChange {
                        product_id: ProductId::new(8),
                        location_id: location,
                        delta: 6,
                    }]),
            )
            .await
            .unwrap();

        let entry = store.stock_entry(ProductId::new(8), location).await.unwrap();
        assert_eq!(entry.quantity, 6);
    }

    #[tokio::test]
    async fn commit_transition_on_missing_operation_writes_nothing() {
        let store = InMemoryStore::new();
        let result = store
            .commit_transition(
                Transition::status_only(OperationKind::Order, OperationId::new(5), Status::InProgress)
                    .with_stock_changes(vec![StockChange {
                        product_id: ProductId::new(1),
                        location_id: LocationId::new(1),
                        delta: 10,
                    }]),
            )
            .await
            .unwrap();

        assert!(result.is_none());
        assert!(
            store
                .stock_entry(ProductId::new(1), LocationId::new(1))
                .await
                .is_none()
        );
    }
}
