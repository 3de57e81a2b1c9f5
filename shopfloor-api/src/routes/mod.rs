/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `customers`: Customer CRUD, login and ticket history
/// - `mechanics`: Mechanic CRUD and workload ranking
/// - `inventory`: Inventory item CRUD (cached listing)
/// - `members`: Membership CRUD (cached listing, owner-only writes)
/// - `service_tickets`: Ticket CRUD and mechanic / inventory assignment
/// - `calculations`: Arithmetic utility endpoints

pub mod calculations;
pub mod customers;
pub mod health;
pub mod inventory;
pub mod mechanics;
pub mod members;
pub mod service_tickets;

use crate::error::{ApiError, ApiResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shopfloor_shared::models::Page;
use validator::Validate;

/// `page` / `per_page` query parameters
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl PageQuery {
    pub fn page(&self) -> ApiResult<Page> {
        Page::new(self.page, self.per_page).map_err(ApiError::BadRequest)
    }

    /// Stable cache key for this window
    pub fn cache_key(&self, page: Page) -> String {
        format!("page={}&per_page={}", page.page, page.per_page)
    }
}

/// Listing envelope: `{<collection>: [...], count, page, per_page}`
pub fn listing<T: Serialize>(collection: &str, items: &[T], count: i64, page: Page) -> Value {
    let mut body = json!({
        "count": count,
        "page": page.page,
        "per_page": page.per_page,
    });
    body[collection] = json!(items);
    body
}

/// `{"message": ...}` body
pub fn message(text: impl Into<String>) -> Value {
    json!({ "message": text.into() })
}

/// Runs `validator` rules on a request body
pub fn validate<T: Validate>(request: &T) -> ApiResult<()> {
    request.validate().map_err(ApiError::from)
}

/// Rejects negative money amounts
pub fn non_negative(field: &str, value: Option<Decimal>) -> ApiResult<()> {
    match value {
        Some(v) if v.is_sign_negative() && !v.is_zero() => Err(ApiError::invalid_field(
            field,
            format!("{} must be non-negative", field),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_listing_envelope() {
        let body = listing("mechanics", &[1, 2], 12, Page::new(Some(2), Some(2)).unwrap());
        assert_eq!(
            body,
            json!({ "mechanics": [1, 2], "count": 12, "page": 2, "per_page": 2 })
        );
    }

    #[test]
    fn test_page_query_rejects_zero_page() {
        let query = PageQuery {
            page: Some(0),
            per_page: None,
        };
        assert!(matches!(query.page(), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_page_query_rejects_offset_overflow() {
        let query = PageQuery {
            page: Some(i64::MAX),
            per_page: Some(50),
        };
        match query.page() {
            Err(ApiError::BadRequest(msg)) => assert_eq!(msg, "page is too large"),
            other => panic!("expected 400, got {:?}", other),
        }
    }

    #[test]
    fn test_non_negative() {
        assert!(non_negative("price", Some(dec("0"))).is_ok());
        assert!(non_negative("price", Some(dec("12.50"))).is_ok());
        assert!(non_negative("price", None).is_ok());
        assert!(non_negative("price", Some(dec("-0.01"))).is_err());
    }
}
