//! Domain error types.

use common::OperationKind;
use store::StoreError;
use thiserror::Error;

/// Reason a requested transition was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("not pending")]
    NotPending,

    #[error("not in progress")]
    NotInProgress,

    /// Shipment start found less stock than requested. The operation has
    /// already been moved to `Blocked` when this is returned.
    #[error("not enough stock")]
    NotEnoughStock,
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A referenced operation, product or location does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// The current status does not permit the requested transition.
    #[error("Invalid transition for {kind} {id}: {reason}")]
    InvalidTransition {
        kind: OperationKind,
        id: i64,
        reason: TransitionError,
    },

    /// Input rejected before touching the store.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An error occurred in the store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl DomainError {
    pub(crate) fn not_found(entity: &'static str, id: impl Into<i64>) -> Self {
        DomainError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub(crate) fn transition(
        kind: OperationKind,
        id: impl Into<i64>,
        reason: TransitionError,
    ) -> Self {
        DomainError::InvalidTransition {
            kind,
            id: id.into(),
            reason,
        }
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_error_reads_as_reason() {
        let err = DomainError::transition(
            OperationKind::Shipment,
            3,
            TransitionError::NotEnoughStock,
        );
        assert_eq!(
            err.to_string(),
            "Invalid transition for Shipment 3: not enough stock"
        );
    }

    #[test]
    fn not_found_names_entity() {
        let err = DomainError::not_found("product", 9);
        assert_eq!(err.to_string(), "product not found: 9");
    }
}
