/// Ownership checks for customer-scoped resources
///
/// Customers may only modify their own record and their own membership.

use super::middleware::AuthContext;

/// Authorization failure (HTTP 403)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// The authenticated customer does not own the resource
    #[error("Unauthorized access")]
    NotOwner {
        /// Customer making the request
        customer_id: i32,
        /// Customer owning the resource
        owner_id: i32,
    },
}

/// Ensures the authenticated customer is `owner_id`
///
/// # Example
///
/// ```
/// use shopfloor_shared::auth::{authorization::require_owner, middleware::AuthContext};
///
/// let auth = AuthContext { customer_id: 4, email: "a@example.com".into() };
/// assert!(require_owner(&auth, 4).is_ok());
/// assert!(require_owner(&auth, 5).is_err());
/// ```
pub fn require_owner(auth: &AuthContext, owner_id: i32) -> Result<(), AuthzError> {
    if auth.customer_id == owner_id {
        Ok(())
    } else {
        tracing::warn!(
            customer_id = auth.customer_id,
            owner_id,
            "Rejected access to another customer's resource"
        );
        Err(AuthzError::NotOwner {
            customer_id: auth.customer_id,
            owner_id,
        })
    }
}
