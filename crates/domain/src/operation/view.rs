use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use common::{LocationId, OperationId, OperationKind, ProductId, Status};
use serde::Serialize;
use store::{LineItems, Operation, OperationDetails};

/// Read model returned by every lifecycle operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationView {
    pub id: OperationId,
    pub kind: OperationKind,
    pub status: Status,
    pub creation_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<DateTime<Utc>>,
    pub last_modified_date: DateTime<Utc>,
    pub location_id: LocationId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    pub product_amount: LineItems,
    pub product_names: BTreeMap<ProductId, String>,
}

impl OperationView {
    /// Joins an operation row with its line items and the names of their
    /// products. Names missing from `names` are left out.
    pub fn assemble(
        operation: Operation,
        line_items: LineItems,
        names: &HashMap<ProductId, String>,
    ) -> Self {
        let kind = operation.kind();
        let (sender, scheduled_date, customer_name) = match operation.details {
            OperationDetails::Order {
                sender,
                scheduled_date,
            } => (Some(sender), scheduled_date, None),
            OperationDetails::Shipment { customer_name } => (None, None, Some(customer_name)),
        };
        let product_names = line_items
            .keys()
            .filter_map(|id| names.get(id).map(|name| (*id, name.clone())))
            .collect();

        Self {
            id: operation.id,
            kind,
            status: operation.status,
            creation_date: operation.created_at,
            scheduled_date,
            last_modified_date: operation.updated_at,
            location_id: operation.location_id,
            sender,
            customer_name,
            product_amount: line_items,
            product_names,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_in_camel_case() {
        let now = Utc::now();
        let operation = Operation {
            id: OperationId::new(4),
            status: Status::InProgress,
            created_at: now,
            updated_at: now,
            location_id: LocationId::new(2),
            details: OperationDetails::Shipment {
                customer_name: "ACME".to_string(),
            },
        };
        let names = HashMap::from([
            (ProductId::new(1), "Widget".to_string()),
            (ProductId::new(9), "Unrelated".to_string()),
        ]);

        let view = OperationView::assemble(
            operation,
            LineItems::from([(ProductId::new(1), 3), (ProductId::new(2), 1)]),
            &names,
        );
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["kind"], "SHIPMENT");
        assert_eq!(json["status"], "IN_PROGRESS");
        assert_eq!(json["customerName"], "ACME");
        assert_eq!(json["locationId"], 2);
        assert_eq!(json["productAmount"]["1"], 3);
        assert_eq!(json["productAmount"]["2"], 1);
        assert_eq!(json["productNames"]["1"], "Widget");
        assert!(json["productNames"].get("9").is_none());
        assert!(json.get("sender").is_none());
        assert!(json.get("scheduledDate").is_none());
        assert!(json.get("lastModifiedDate").is_some());
    }
}
