//! Operation kinds and the status lifecycle shared by orders and shipments.

use serde::{Deserialize, Serialize};

/// The two kinds of stock-moving operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    /// Inbound stock, received at a location.
    Order,
    /// Outbound stock, dispatched from a location.
    Shipment,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Order => "ORDER",
            OperationKind::Shipment => "SHIPMENT",
        }
    }

    /// Human-readable name used in log lines and error messages.
    pub fn label(&self) -> &'static str {
        match self {
            OperationKind::Order => "Order",
            OperationKind::Shipment => "Shipment",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The status of an operation in its lifecycle.
///
/// State transitions:
/// ```text
/// Pending ──start──► InProgress ──finish──► Completed
///    │                   │
///    └──start (no stock)─┴──block──► Blocked        (shipments only)
/// ```
///
/// `Cancelled` is reserved; no transition currently leads to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    Pending,
    InProgress,
    Completed,
    Blocked,
    Cancelled,
}

impl Status {
    /// Returns true if the operation can be started in this status.
    pub fn can_start(&self) -> bool {
        matches!(self, Status::Pending)
    }

    /// Returns true if the operation can be finished in this status.
    pub fn can_finish(&self) -> bool {
        matches!(self, Status::InProgress)
    }

    /// Returns true if a shipment can be blocked in this status.
    pub fn can_block(&self) -> bool {
        matches!(self, Status::InProgress)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "PENDING",
            Status::InProgress => "IN_PROGRESS",
            Status::Completed => "COMPLETED",
            Status::Blocked => "BLOCKED",
            Status::Cancelled => "CANCELLED",
        }
    }

    /// Parses the persisted representation produced by [`as_str`](Self::as_str).
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(Status::Pending),
            "IN_PROGRESS" => Some(Status::InProgress),
            "COMPLETED" => Some(Status::Completed),
            "BLOCKED" => Some(Status::Blocked),
            "CANCELLED" => Some(Status::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
