//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency and are
//! serialized because each one truncates the tables it starts from.
//!
//! ```bash
//! cargo test -p store --test postgres_integration
//! ```

use std::sync::Arc;

use serial_test::serial;
use sqlx::PgPool;
use store::{
    InventoryStore, InventoryStoreExt, LineItems, LocationId, NewLocation, NewOperation,
    NewProduct, OperationDetails, OperationId, OperationKind, PostgresStore, ProductId, Status,
    StockChange, StockEntry, StoreError, Transition,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_inventory_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query(
        "TRUNCATE TABLE operation_items, orders, shipments, stock_entries, locations, products RESTART IDENTITY",
    )
    .execute(&pool)
    .await
    .unwrap();

    PostgresStore::new(pool)
}

async fn seed_catalog(store: &PostgresStore) -> (ProductId, ProductId, LocationId) {
    let a = store
        .insert_product(NewProduct {
            name: "Widget".to_string(),
            description: Some("A widget".to_string()),
            barcode: Some("7790000000011".to_string()),
            image_url: None,
        })
        .await
        .unwrap();
    let b = store
        .insert_product(NewProduct {
            name: "Gadget".to_string(),
            description: None,
            barcode: None,
            image_url: None,
        })
        .await
        .unwrap();
    let location = store
        .insert_location(NewLocation {
            name: "Main depot".to_string(),
            latitude: -34.6,
            longitude: -58.4,
            radius: 250.0,
        })
        .await
        .unwrap();
    (a.id, b.id, location.id)
}

fn shipment(location_id: LocationId, items: LineItems) -> NewOperation {
    NewOperation {
        location_id,
        details: OperationDetails::Shipment {
            customer_name: "ACME".to_string(),
        },
        line_items: items,
    }
}

#[tokio::test]
#[serial]
async fn insert_and_find_products() {
    let store = get_test_store().await;
    let (a, b, _) = seed_catalog(&store).await;

    let all = store.list_products().await.unwrap();
    assert_eq!(all.len(), 2);

    let found = store
        .find_products(&[b], &["7790000000011".to_string()])
        .await
        .unwrap();
    let ids: Vec<_> = found.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![a, b]);

    let names = store.product_names(&[a]).await.unwrap();
    assert_eq!(names[&a], "Widget");
}

#[tokio::test]
#[serial]
async fn duplicate_barcode_maps_to_duplicate_error() {
    let store = get_test_store().await;
    seed_catalog(&store).await;

    let result = store
        .insert_product(NewProduct {
            name: "Copy".to_string(),
            description: None,
            barcode: Some("7790000000011".to_string()),
            image_url: None,
        })
        .await;

    assert!(matches!(result, Err(StoreError::Duplicate { .. })));
}

#[tokio::test]
#[serial]
async fn duplicate_stock_entry_maps_to_duplicate_error() {
    let store = get_test_store().await;
    let (a, _, location) = seed_catalog(&store).await;
    let entry = StockEntry {
        product_id: a,
        location_id: location,
        quantity: 3,
        sub_location: Some("Shelf 2".to_string()),
    };

    store.insert_stock_entry(entry.clone()).await.unwrap();
    let result = store.insert_stock_entry(entry).await;

    assert!(matches!(result, Err(StoreError::Duplicate { .. })));
}

#[tokio::test]
#[serial]
async fn operation_round_trip_with_line_items() {
    let store = get_test_store().await;
    let (a, b, location) = seed_catalog(&store).await;

    let created = store
        .insert_operation(shipment(location, LineItems::from([(a, 3), (b, 2)])))
        .await
        .unwrap();
    assert_eq!(created.status, Status::Pending);

    let loaded = store
        .get_operation(OperationKind::Shipment, created.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded, created);

    let items = store
        .line_items(OperationKind::Shipment, created.id)
        .await
        .unwrap();
    assert_eq!(items, LineItems::from([(a, 3), (b, 2)]));

    // Same id in the other table does not exist.
    assert!(
        store
            .get_operation(OperationKind::Order, created.id)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
#[serial]
async fn order_details_are_persisted() {
    let store = get_test_store().await;
    let (a, _, location) = seed_catalog(&store).await;
    let scheduled = chrono::Utc::now() + chrono::Duration::days(2);

    let created = store
        .insert_operation(NewOperation {
            location_id: location,
            details: OperationDetails::Order {
                sender: "Supplier SA".to_string(),
                scheduled_date: Some(scheduled),
            },
            line_items: LineItems::from([(a, 10)]),
        })
        .await
        .unwrap();

    let listed = store
        .list_operations(OperationKind::Order, location)
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    match &listed[0].details {
        OperationDetails::Order {
            sender,
            scheduled_date,
        } => {
            assert_eq!(sender, "Supplier SA");
            let stored = scheduled_date.unwrap();
            assert!((stored - scheduled).num_milliseconds().abs() < 1);
        }
        other => panic!("unexpected details {other:?}"),
    }
    assert_eq!(listed[0].id, created.id);
}

#[tokio::test]
#[serial]
async fn commit_transition_applies_relative_stock_changes() {
    let store = get_test_store().await;
    let (a, b, location) = seed_catalog(&store).await;
    store
        .insert_stock_entry(StockEntry {
            product_id: a,
            location_id: location,
            quantity: 5,
            sub_location: None,
        })
        .await
        .unwrap();
    let op = store
        .insert_operation(shipment(location, LineItems::from([(a, 5)])))
        .await
        .unwrap();

    let committed = store
        .commit_transition(
            Transition::status_only(OperationKind::Shipment, op.id, Status::Completed)
                .with_stock_changes(vec![
                    StockChange {
                        product_id: a,
                        location_id: location,
                        delta: -5,
                    },
                    StockChange {
                        product_id: b,
                        location_id: location,
                        delta: 4,
                    },
                ]),
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(committed.operation.status, Status::Completed);
    assert!(committed.operation.updated_at >= op.updated_at);
    assert_eq!(committed.stock_levels[&a], 0);
    assert_eq!(committed.stock_levels[&b], 4);

    let stock = store.get_stock(&[a, b], location).await.unwrap();
    assert_eq!(stock[&a], 0);
    assert_eq!(stock[&b], 4);
}

#[tokio::test]
#[serial]
async fn decrease_may_drive_quantity_negative() {
    let store = get_test_store().await;
    let (a, _, location) = seed_catalog(&store).await;
    store
        .insert_stock_entry(StockEntry {
            product_id: a,
            location_id: location,
            quantity: 2,
            sub_location: None,
        })
        .await
        .unwrap();
    let op = store
        .insert_operation(shipment(location, LineItems::from([(a, 3)])))
        .await
        .unwrap();

    let committed = store
        .commit_transition(
            Transition::status_only(OperationKind::Shipment, op.id, Status::Completed)
                .with_stock_changes(vec![StockChange {
                    product_id: a,
                    location_id: location,
                    delta: -3,
                }]),
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(committed.stock_levels[&a], -1);
    assert_eq!(store.get_stock(&[a], location).await.unwrap()[&a], -1);
}

#[tokio::test]
#[serial]
async fn decrease_skips_missing_rows() {
    let store = get_test_store().await;
    let (a, b, location) = seed_catalog(&store).await;
    store
        .insert_stock_entry(StockEntry {
            product_id: a,
            location_id: location,
            quantity: 4,
            sub_location: None,
        })
        .await
        .unwrap();
    let op = store
        .insert_operation(shipment(location, LineItems::from([(a, 1), (b, 2)])))
        .await
        .unwrap();

    let committed = store
        .commit_transition(
            Transition::status_only(OperationKind::Shipment, op.id, Status::Completed)
                .with_stock_changes(vec![
                    StockChange {
                        product_id: a,
                        location_id: location,
                        delta: -1,
                    },
                    StockChange {
                        product_id: b,
                        location_id: location,
                        delta: -2,
                    },
                ]),
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(committed.operation.status, Status::Completed);
    assert_eq!(committed.stock_levels[&a], 3);
    assert!(!committed.stock_levels.contains_key(&b));

    let stock = store.get_stock(&[a, b], location).await.unwrap();
    assert_eq!(stock[&a], 3);
    assert!(!stock.contains_key(&b));
}

#[tokio::test]
#[serial]
async fn commit_transition_on_missing_operation_rolls_back() {
    let store = get_test_store().await;
    let (a, _, location) = seed_catalog(&store).await;

    let result = store
        .commit_transition(
            Transition::status_only(OperationKind::Order, OperationId::new(404), Status::Completed)
                .with_stock_changes(vec![StockChange {
                    product_id: a,
                    location_id: location,
                    delta: 7,
                }]),
        )
        .await
        .unwrap();

    assert!(result.is_none());
    assert!(store.get_stock(&[a], location).await.unwrap().is_empty());
}
