pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod store;

pub use common::{LocationId, OperationId, OperationKind, ProductId, Status};
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use model::{
    CommittedTransition, LineItems, Location, NewLocation, NewOperation, NewProduct, Operation,
    OperationDetails, Product, StockChange, StockEntry, Transition,
};
pub use postgres::PostgresStore;
pub use store::{InventoryStore, InventoryStoreExt};
