use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{LocationId, OperationId, OperationKind, ProductId, Status};
use sqlx::{PgPool, Postgres, Row, Transaction as PgTransaction, postgres::PgRow};

use crate::{
    CommittedTransition, InventoryStore, LineItems, Location, NewLocation, NewOperation,
    NewProduct, Operation, OperationDetails, Product, Result, StockEntry, StoreError, Transition,
};

const PRODUCT_COLUMNS: &str = "id, name, description, barcode, image_url";
const LOCATION_COLUMNS: &str = "id, name, latitude, longitude, radius";
const ORDER_COLUMNS: &str = "id, status, created_at, updated_at, location_id, sender, scheduled_date";
const SHIPMENT_COLUMNS: &str = "id, status, created_at, updated_at, location_id, customer_name";

/// PostgreSQL-backed inventory store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL inventory store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool against `url`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn table(kind: OperationKind) -> &'static str {
        match kind {
            OperationKind::Order => "orders",
            OperationKind::Shipment => "shipments",
        }
    }

    fn columns(kind: OperationKind) -> &'static str {
        match kind {
            OperationKind::Order => ORDER_COLUMNS,
            OperationKind::Shipment => SHIPMENT_COLUMNS,
        }
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            barcode: row.try_get("barcode")?,
            image_url: row.try_get("image_url")?,
        })
    }

    fn row_to_location(row: PgRow) -> Result<Location> {
        Ok(Location {
            id: LocationId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
            radius: row.try_get("radius")?,
        })
    }

    fn row_to_operation(kind: OperationKind, row: PgRow) -> Result<Operation> {
        let raw_status: String = row.try_get("status")?;
        let status = Status::parse(&raw_status)
            .ok_or_else(|| StoreError::InvalidData(format!("unknown status '{raw_status}'")))?;

        let details = match kind {
            OperationKind::Order => OperationDetails::Order {
                sender: row.try_get("sender")?,
                scheduled_date: row.try_get::<Option<DateTime<Utc>>, _>("scheduled_date")?,
            },
            OperationKind::Shipment => OperationDetails::Shipment {
                customer_name: row.try_get("customer_name")?,
            },
        };

        Ok(Operation {
            id: OperationId::new(row.try_get("id")?),
            status,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            location_id: LocationId::new(row.try_get("location_id")?),
            details,
        })
    }

    async fn insert_operation_row(
        tx: &mut PgTransaction<'_, Postgres>,
        operation: &NewOperation,
    ) -> Result<PgRow> {
        let location_id = operation.location_id.get();
        let row = match &operation.details {
            OperationDetails::Order {
                sender,
                scheduled_date,
            } => {
                sqlx::query(&format!(
                    r#"
                    INSERT INTO orders (status, created_at, updated_at, location_id, sender, scheduled_date)
                    VALUES ($1, NOW(), NOW(), $2, $3, $4)
                    RETURNING {ORDER_COLUMNS}
                    "#
                ))
                .bind(Status::Pending.as_str())
                .bind(location_id)
                .bind(sender)
                .bind(scheduled_date)
                .fetch_one(&mut **tx)
                .await?
            }
            OperationDetails::Shipment { customer_name } => {
                sqlx::query(&format!(
                    r#"
                    INSERT INTO shipments (status, created_at, updated_at, location_id, customer_name)
                    VALUES ($1, NOW(), NOW(), $2, $3)
                    RETURNING {SHIPMENT_COLUMNS}
                    "#
                ))
                .bind(Status::Pending.as_str())
                .bind(location_id)
                .bind(customer_name)
                .fetch_one(&mut **tx)
                .await?
            }
        };
        Ok(row)
    }
}

fn map_unique_violation(
    err: sqlx::Error,
    constraint: &str,
    entity: &'static str,
    key: String,
) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.constraint() == Some(constraint)
    {
        return StoreError::Duplicate { entity, key };
    }
    StoreError::Database(err)
}

fn raw_ids<T: Copy + Into<i64>>(ids: &[T]) -> Vec<i64> {
    ids.iter().map(|id| (*id).into()).collect()
}

#[async_trait]
impl InventoryStore for PostgresStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, product), fields(name = %product.name))]
    async fn insert_product(&self, product: NewProduct) -> Result<Product> {
        let barcode_key = product.barcode.clone().unwrap_or_default();
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO products (name, description, barcode, image_url)
            VALUES ($1, $2, $3, $4)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.barcode)
        .bind(&product.image_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            map_unique_violation(e, "unique_product_barcode", "product barcode", barcode_key)
        })?;

        Self::row_to_product(row)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn find_products(&self, ids: &[ProductId], barcodes: &[String]) -> Result<Vec<Product>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE id = ANY($1) OR barcode = ANY($2)
            ORDER BY id
            "#
        ))
        .bind(raw_ids(ids))
        .bind(barcodes)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    #[tracing::instrument(skip(self, location), fields(name = %location.name))]
    async fn insert_location(&self, location: NewLocation) -> Result<Location> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO locations (name, latitude, longitude, radius)
            VALUES ($1, $2, $3, $4)
            RETURNING {LOCATION_COLUMNS}
            "#
        ))
        .bind(&location.name)
        .bind(location.latitude)
        .bind(location.longitude)
        .bind(location.radius)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_location(row)
    }

    async fn get_location(&self, id: LocationId) -> Result<Option<Location>> {
        let row = sqlx::query(&format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_location).transpose()
    }

    async fn list_locations(&self) -> Result<Vec<Location>> {
        let rows = sqlx::query(&format!("SELECT {LOCATION_COLUMNS} FROM locations ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_location).collect()
    }

    #[tracing::instrument(skip(self))]
    async fn insert_stock_entry(&self, entry: StockEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_entries (product_id, location_id, quantity, sub_location)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(entry.product_id.get())
        .bind(entry.location_id.get())
        .bind(entry.quantity)
        .bind(&entry.sub_location)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_unique_violation(
                e,
                "unique_stock_product_location",
                "stock entry",
                format!(
                    "product {} at location {}",
                    entry.product_id, entry.location_id
                ),
            )
        })?;

        Ok(())
    }

    async fn get_stock(
        &self,
        product_ids: &[ProductId],
        location_id: LocationId,
    ) -> Result<HashMap<ProductId, i64>> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, quantity
            FROM stock_entries
            WHERE product_id = ANY($1) AND location_id = $2
            "#,
        )
        .bind(raw_ids(product_ids))
        .bind(location_id.get())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok((
                    ProductId::new(row.try_get("product_id")?),
                    row.try_get::<i64, _>("quantity")?,
                ))
            })
            .collect()
    }

    #[tracing::instrument(skip(self, operation), fields(kind = %operation.details.kind()))]
    async fn insert_operation(&self, operation: NewOperation) -> Result<Operation> {
        let kind = operation.details.kind();
        let mut tx = self.pool.begin().await?;

        let row = Self::insert_operation_row(&mut tx, &operation).await?;
        let stored = Self::row_to_operation(kind, row)?;

        for (product_id, amount) in &operation.line_items {
            sqlx::query(
                r#"
                INSERT INTO operation_items (operation_id, product_id, item_type, amount)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(stored.id.get())
            .bind(product_id.get())
            .bind(kind.as_str())
            .bind(i64::from(*amount))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(stored)
    }

    async fn get_operation(
        &self,
        kind: OperationKind,
        id: OperationId,
    ) -> Result<Option<Operation>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM {} WHERE id = $1",
            Self::columns(kind),
            Self::table(kind)
        ))
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| Self::row_to_operation(kind, row)).transpose()
    }

    async fn list_operations(
        &self,
        kind: OperationKind,
        location_id: LocationId,
    ) -> Result<Vec<Operation>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM {} WHERE location_id = $1 ORDER BY id ASC",
            Self::columns(kind),
            Self::table(kind)
        ))
        .bind(location_id.get())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| Self::row_to_operation(kind, row))
            .collect()
    }

    async fn line_items(&self, kind: OperationKind, id: OperationId) -> Result<LineItems> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, amount
            FROM operation_items
            WHERE operation_id = $1 AND item_type = $2
            "#,
        )
        .bind(id.get())
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let amount: i64 = row.try_get("amount")?;
                let amount = u32::try_from(amount).map_err(|_| {
                    StoreError::InvalidData(format!("line item amount {amount} out of range"))
                })?;
                Ok((ProductId::new(row.try_get("product_id")?), amount))
            })
            .collect()
    }

    #[tracing::instrument(skip(self, transition), fields(kind = %transition.kind, id = %transition.id, status = %transition.status))]
    async fn commit_transition(
        &self,
        transition: Transition,
    ) -> Result<Option<CommittedTransition>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "UPDATE {} SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING {}",
            Self::table(transition.kind),
            Self::columns(transition.kind)
        ))
        .bind(transition.status.as_str())
        .bind(transition.id.get())
        .fetch_optional(&mut *tx)
        .await?;

        // Dropping the transaction rolls it back.
        let Some(row) = row else {
            return Ok(None);
        };
        let operation = Self::row_to_operation(transition.kind, row)?;

        let mut stock_levels = BTreeMap::new();
        for change in &transition.stock_changes {
            let quantity: Option<i64> = if change.delta > 0 {
                sqlx::query_scalar(
                    r#"
                    INSERT INTO stock_entries (product_id, location_id, quantity)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (product_id, location_id)
                    DO UPDATE SET quantity = stock_entries.quantity + EXCLUDED.quantity
                    RETURNING quantity
                    "#,
                )
                .bind(change.product_id.get())
                .bind(change.location_id.get())
                .bind(change.delta)
                .fetch_optional(&mut *tx)
                .await?
            } else {
                sqlx::query_scalar(
                    r#"
                    UPDATE stock_entries
                    SET quantity = quantity + $3
                    WHERE product_id = $1 AND location_id = $2
                    RETURNING quantity
                    "#,
                )
                .bind(change.product_id.get())
                .bind(change.location_id.get())
                .bind(change.delta)
                .fetch_optional(&mut *tx)
                .await?
            };

            if let Some(quantity) = quantity {
                stock_levels.insert(change.product_id, quantity);
            }
        }

        tx.commit().await?;
        Ok(Some(CommittedTransition {
            operation,
            stock_levels,
        }))
    }
}
