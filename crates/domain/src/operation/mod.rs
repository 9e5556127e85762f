//! Order and shipment lifecycle.

mod service;
mod view;

pub use service::OperationService;
pub use view::OperationView;

use chrono::{DateTime, Utc};
use common::LocationId;
use store::LineItems;

/// Request to create an inbound order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub location_id: LocationId,
    pub line_items: LineItems,
    pub sender: String,
    pub scheduled_date: Option<DateTime<Utc>>,
}

/// Request to create an outbound shipment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewShipment {
    pub location_id: LocationId,
    pub line_items: LineItems,
    pub customer_name: String,
}
