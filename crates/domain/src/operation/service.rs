//! Operation lifecycle engine.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use common::{LocationId, OperationId, OperationKind, ProductId, Status};
use store::{
    CommittedTransition, InventoryStore, InventoryStoreExt, LineItems, NewOperation, Operation,
    OperationDetails, Transition,
};

use crate::error::{DomainError, Result, TransitionError};
use crate::ledger::{self, StockLedger};
use crate::lock::EntityLocks;

use super::{NewOrder, NewShipment, OperationView};

/// Drives orders and shipments through their status lifecycle.
///
/// Every transition runs under the per-operation lock and is committed to
/// the store as one atomic write: the new status together with any ledger
/// adjustments it causes.
pub struct OperationService<S> {
    store: Arc<S>,
    ledger: StockLedger<S>,
    locks: Arc<EntityLocks>,
}

impl<S: InventoryStore> OperationService<S> {
    pub fn new(store: Arc<S>, locks: Arc<EntityLocks>) -> Self {
        Self {
            ledger: StockLedger::new(Arc::clone(&store)),
            store,
            locks,
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn locks(&self) -> &EntityLocks {
        &self.locks
    }

    /// Creates an order in `Pending`.
    #[tracing::instrument(skip(self))]
    pub async fn create_order(&self, order: NewOrder) -> Result<OperationView> {
        require_text("sender", &order.sender)?;
        self.create(NewOperation {
            location_id: order.location_id,
            details: OperationDetails::Order {
                sender: order.sender,
                scheduled_date: order.scheduled_date,
            },
            line_items: order.line_items,
        })
        .await
    }

    /// Creates a shipment in `Pending`.
    #[tracing::instrument(skip(self))]
    pub async fn create_shipment(&self, shipment: NewShipment) -> Result<OperationView> {
        require_text("customer name", &shipment.customer_name)?;
        self.create(NewOperation {
            location_id: shipment.location_id,
            details: OperationDetails::Shipment {
                customer_name: shipment.customer_name,
            },
            line_items: shipment.line_items,
        })
        .await
    }

    /// Moves a pending operation to `InProgress`.
    ///
    /// A shipment whose line items are not covered by the stock at its
    /// location is moved to `Blocked` instead, and the call then fails with
    /// `NotEnoughStock`. The `Blocked` status stays committed.
    #[tracing::instrument(skip(self))]
    pub async fn start(&self, kind: OperationKind, id: OperationId) -> Result<OperationView> {
        let started = Instant::now();
        let result = self.start_locked(kind, id).await;
        record_transition(kind, "start", &result, started);
        result
    }

    /// Moves an in-progress operation to `Completed` and adjusts the ledger.
    ///
    /// A shipment takes its line items out of its location. An order adds
    /// `processed` (received amount per product) to its location; line items
    /// missing from `processed` add nothing. `processed` is only accepted
    /// for orders.
    #[tracing::instrument(skip(self))]
    pub async fn finish(
        &self,
        kind: OperationKind,
        id: OperationId,
        processed: Option<LineItems>,
    ) -> Result<OperationView> {
        let started = Instant::now();
        let result = self.finish_locked(kind, id, processed).await;
        record_transition(kind, "finish", &result, started);
        result
    }

    /// Moves an in-progress shipment to `Blocked` without touching stock.
    #[tracing::instrument(skip(self))]
    pub async fn block(&self, id: OperationId) -> Result<OperationView> {
        let kind = OperationKind::Shipment;
        let started = Instant::now();
        let result = self.block_locked(id).await;
        record_transition(kind, "block", &result, started);
        result
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, kind: OperationKind, id: OperationId) -> Result<OperationView> {
        let operation = self.load(kind, id).await?;
        let line_items = self.store.line_items(kind, id).await?;
        self.view(operation, line_items).await
    }

    /// Every operation of `kind` owned by a location, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn list(
        &self,
        kind: OperationKind,
        location_id: LocationId,
    ) -> Result<Vec<OperationView>> {
        let operations = self.store.list_operations(kind, location_id).await?;

        let mut rows = Vec::with_capacity(operations.len());
        let mut product_ids = BTreeSet::new();
        for operation in operations {
            let line_items = self.store.line_items(kind, operation.id).await?;
            product_ids.extend(line_items.keys().copied());
            rows.push((operation, line_items));
        }

        let ids: Vec<_> = product_ids.into_iter().collect();
        let names = self.store.product_names(&ids).await?;
        Ok(rows
            .into_iter()
            .map(|(operation, line_items)| OperationView::assemble(operation, line_items, &names))
            .collect())
    }

    async fn create(&self, operation: NewOperation) -> Result<OperationView> {
        if operation.line_items.is_empty() {
            return Err(DomainError::Validation(
                "at least one line item is required".to_string(),
            ));
        }
        if !self.store.location_exists(operation.location_id).await? {
            return Err(DomainError::not_found("location", operation.location_id));
        }
        let ids: Vec<_> = operation.line_items.keys().copied().collect();
        let names = self.require_products(&ids).await?;

        let line_items = operation.line_items.clone();
        let created = self.store.insert_operation(operation).await?;
        let kind = created.kind();

        metrics::counter!("operations_created_total", "kind" => kind.as_str()).increment(1);
        tracing::info!(
            %kind,
            id = %created.id,
            location_id = %created.location_id,
            items = line_items.len(),
            "operation created"
        );
        Ok(OperationView::assemble(created, line_items, &names))
    }

    async fn start_locked(&self, kind: OperationKind, id: OperationId) -> Result<OperationView> {
        let _guard = self.locks.acquire((kind, id)).await;

        let operation = self.load(kind, id).await?;
        if !operation.status.can_start() {
            tracing::warn!(%kind, %id, status = %operation.status, "start rejected");
            return Err(DomainError::transition(kind, id, TransitionError::NotPending));
        }
        let line_items = self.store.line_items(kind, id).await?;

        let target = match kind {
            OperationKind::Order => Status::InProgress,
            OperationKind::Shipment => {
                let ids: Vec<_> = line_items.keys().copied().collect();
                let actual = self.ledger.levels(&ids, operation.location_id).await?;
                if ledger::covers(&line_items, &actual) {
                    Status::InProgress
                } else {
                    Status::Blocked
                }
            }
        };

        let committed = self
            .commit(Transition::status_only(kind, id, target))
            .await?;
        if target == Status::Blocked {
            tracing::warn!(%kind, %id, "not enough stock, operation blocked");
            return Err(DomainError::transition(
                kind,
                id,
                TransitionError::NotEnoughStock,
            ));
        }

        tracing::info!(%kind, %id, "operation started");
        self.view(committed.operation, line_items).await
    }

    async fn finish_locked(
        &self,
        kind: OperationKind,
        id: OperationId,
        processed: Option<LineItems>,
    ) -> Result<OperationView> {
        if kind == OperationKind::Shipment && processed.is_some() {
            return Err(DomainError::Validation(
                "processed stock only applies to orders".to_string(),
            ));
        }

        let _guard = self.locks.acquire((kind, id)).await;

        let operation = self.load(kind, id).await?;
        if !operation.status.can_finish() {
            tracing::warn!(%kind, %id, status = %operation.status, "finish rejected");
            return Err(DomainError::transition(
                kind,
                id,
                TransitionError::NotInProgress,
            ));
        }
        let line_items = self.store.line_items(kind, id).await?;

        let changes = match kind {
            OperationKind::Shipment => ledger::shipment_decrease(operation.location_id, &line_items),
            OperationKind::Order => {
                let processed = processed.unwrap_or_default();
                let ids: Vec<_> = processed.keys().copied().collect();
                self.require_products(&ids).await?;
                ledger::order_increase(operation.location_id, &processed)
            }
        };

        let committed = self
            .commit(
                Transition::status_only(kind, id, Status::Completed)
                    .with_stock_changes(changes.clone()),
            )
            .await?;

        for change in &changes {
            let Some(quantity) = committed.stock_levels.get(&change.product_id) else {
                tracing::warn!(
                    %kind,
                    %id,
                    product_id = %change.product_id,
                    "no stock entry to decrease"
                );
                continue;
            };
            let direction = if change.delta > 0 {
                "increase"
            } else {
                "decrease"
            };
            metrics::counter!("stock_adjustments_total", "direction" => direction).increment(1);
            if *quantity < 0 {
                tracing::warn!(
                    %kind,
                    %id,
                    product_id = %change.product_id,
                    quantity,
                    "stock went negative"
                );
            }
        }

        tracing::info!(%kind, %id, adjustments = changes.len(), "operation finished");
        self.view(committed.operation, line_items).await
    }

    async fn block_locked(&self, id: OperationId) -> Result<OperationView> {
        let kind = OperationKind::Shipment;
        let _guard = self.locks.acquire((kind, id)).await;

        let operation = self.load(kind, id).await?;
        if !operation.status.can_block() {
            tracing::warn!(%id, status = %operation.status, "block rejected");
            return Err(DomainError::transition(
                kind,
                id,
                TransitionError::NotInProgress,
            ));
        }

        let committed = self
            .commit(Transition::status_only(kind, id, Status::Blocked))
            .await?;
        tracing::info!(%id, "shipment blocked");

        let line_items = self.store.line_items(kind, id).await?;
        self.view(committed.operation, line_items).await
    }

    async fn load(&self, kind: OperationKind, id: OperationId) -> Result<Operation> {
        self.store
            .get_operation(kind, id)
            .await?
            .ok_or_else(|| DomainError::not_found(entity_name(kind), id))
    }

    async fn commit(&self, transition: Transition) -> Result<CommittedTransition> {
        let (kind, id) = (transition.kind, transition.id);
        self.store
            .commit_transition(transition)
            .await?
            .ok_or_else(|| DomainError::not_found(entity_name(kind), id))
    }

    async fn view(&self, operation: Operation, line_items: LineItems) -> Result<OperationView> {
        let ids: Vec<_> = line_items.keys().copied().collect();
        let names = self.store.product_names(&ids).await?;
        Ok(OperationView::assemble(operation, line_items, &names))
    }

    /// Names of the given products; fails on the first unknown id.
    async fn require_products(
        &self,
        ids: &[ProductId],
    ) -> Result<std::collections::HashMap<ProductId, String>> {
        if ids.is_empty() {
            return Ok(Default::default());
        }
        let names = self.store.product_names(ids).await?;
        if let Some(missing) = ids.iter().find(|id| !names.contains_key(id)) {
            return Err(DomainError::not_found("product", *missing));
        }
        Ok(names)
    }
}

fn entity_name(kind: OperationKind) -> &'static str {
    match kind {
        OperationKind::Order => "order",
        OperationKind::Shipment => "shipment",
    }
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DomainError::Validation(format!("{field} must not be blank")));
    }
    Ok(())
}

fn record_transition(
    kind: OperationKind,
    transition: &'static str,
    result: &Result<OperationView>,
    started: Instant,
) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(DomainError::InvalidTransition {
            reason: TransitionError::NotEnoughStock,
            ..
        }) => "blocked",
        Err(DomainError::InvalidTransition { .. }) => "rejected",
        Err(DomainError::NotFound { .. }) => "not_found",
        Err(_) => "error",
    };

    metrics::counter!(
        "operation_transitions_total",
        "kind" => kind.as_str(),
        "transition" => transition,
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!(
        "operation_transition_duration_seconds",
        "kind" => kind.as_str(),
        "transition" => transition
    )
    .record(started.elapsed().as_secs_f64());
}
