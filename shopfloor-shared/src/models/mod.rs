/// Database models for Shopfloor
///
/// This module contains all database models and their CRUD operations.
///
/// # Models
///
/// - `customer`: Shop customers and their login credentials
/// - `mechanic`: Employees who work on service tickets
/// - `inventory`: Parts and supplies that can be attached to tickets
/// - `service_ticket`: Work orders with their mechanic and parts assignments
/// - `member`: One-to-one membership program records for customers
///
/// # Example
///
/// ```no_run
/// use shopfloor_shared::models::customer::{CreateCustomer, Customer};
/// use shopfloor_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::new("postgresql://localhost/shopfloor")).await?;
///
/// let customer = Customer::create(&pool, CreateCustomer {
///     first_name: "Ada".to_string(),
///     last_name: "Lovelace".to_string(),
///     email: "ada@example.com".to_string(),
///     phone_number: None,
///     address: None,
///     password_hash: None,
/// }).await?;
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};

pub mod customer;
pub mod inventory;
pub mod mechanic;
pub mod member;
pub mod service_ticket;

/// Default page size for listing endpoints
pub const DEFAULT_PER_PAGE: i64 = 50;

/// Largest page size a client may request
pub const MAX_PER_PAGE: i64 = 100;

/// Validated page window for listing queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based page number
    pub page: i64,

    /// Rows per page
    pub per_page: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl Page {
    /// Builds a page from optional query parameters
    ///
    /// Returns the offending message when `page < 1` or `per_page` is outside
    /// `1..=MAX_PER_PAGE`.
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Result<Self, String> {
        let page = page.unwrap_or(1);
        let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE);

        if page < 1 {
            return Err("page must be at least 1".to_string());
        }
        if !(1..=MAX_PER_PAGE).contains(&per_page) {
            return Err(format!("per_page must be between 1 and {}", MAX_PER_PAGE));
        }
        if (page - 1).checked_mul(per_page).is_none() {
            return Err("page is too large".to_string());
        }

        Ok(Self { page, per_page })
    }

    /// SQL `LIMIT`
    pub fn limit(&self) -> i64 {
        self.per_page
    }

    /// SQL `OFFSET`
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults() {
        let page = Page::new(None, None).unwrap();
        assert_eq!(page, Page::default());
        assert_eq!(page.limit(), 50);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_page_offset() {
        let page = Page::new(Some(3), Some(20)).unwrap();
        assert_eq!(page.offset(), 40);
        assert_eq!(page.limit(), 20);
    }

    #[test]
    fn test_page_bounds() {
        assert!(Page::new(Some(0), None).is_err());
        assert!(Page::new(None, Some(0)).is_err());
        assert!(Page::new(None, Some(101)).is_err());
        assert!(Page::new(None, Some(100)).is_ok());
    }

    #[test]
    fn test_page_offset_overflow_is_rejected() {
        assert_eq!(
            Page::new(Some(i64::MAX), Some(50)),
            Err("page is too large".to_string())
        );

        // per_page = 1 never overflows
        let page = Page::new(Some(i64::MAX), Some(1)).unwrap();
        assert_eq!(page.offset(), i64::MAX - 1);
    }
}
