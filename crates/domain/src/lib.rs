//! Domain layer for the inventory system.
//!
//! This crate provides:
//! - `EntityLocks`, the per-operation lock registry
//! - `StockLedger`, reads and new rows of per-location stock
//! - `Catalog`, products, locations and coordinate lookup
//! - `OperationService`, the order and shipment lifecycle engine

pub mod catalog;
pub mod error;
pub mod ledger;
pub mod lock;
pub mod operation;

pub use catalog::{Catalog, distance_meters};
pub use error::{DomainError, Result, TransitionError};
pub use ledger::StockLedger;
pub use lock::{EntityGuard, EntityLocks, LockKey};
pub use operation::{NewOrder, NewShipment, OperationService, OperationView};
