//! HTTP route handlers.

pub mod health;
pub mod locations;
pub mod metrics;
pub mod orders;
pub mod products;
pub mod shipments;

use std::str::FromStr;

use domain::{Catalog, OperationService, StockLedger};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub operations: OperationService<S>,
    pub catalog: Catalog<S>,
    pub ledger: StockLedger<S>,
}

/// Parses a comma-separated query value such as `1,2,3`.
///
/// A missing or empty value yields an empty list.
pub(crate) fn parse_list<T: FromStr>(name: &str, value: Option<&str>) -> Result<Vec<T>, ApiError> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse()
                .map_err(|_| ApiError::BadRequest(format!("Invalid {name}: {part}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_values() {
        let ids: Vec<i64> = parse_list("ids", Some("1, 2,,3")).unwrap();
        assert_eq!(ids, vec![1, 2, 3]);

        let none: Vec<i64> = parse_list("ids", None).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn rejects_malformed_values() {
        let result: Result<Vec<i64>, _> = parse_list("ids", Some("1,x"));
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }
}
