//! Shared types for the inventory backend.

mod status;
mod types;

pub use status::{OperationKind, Status};
pub use types::{LocationId, OperationId, ProductId};
