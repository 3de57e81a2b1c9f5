/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing
/// - [`jwt`]: Customer access tokens (HS256)
/// - [`middleware`]: Bearer-token middleware and the [`middleware::AuthContext`] extractor
/// - [`authorization`]: Ownership checks for customer-scoped resources
///
/// # Example
///
/// ```no_run
/// use shopfloor_shared::auth::{jwt, password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = password::hash_password("hunter22")?;
/// assert!(password::verify_password("hunter22", &hash)?);
///
/// let claims = jwt::Claims::new(42, "ada@example.com");
/// let token = jwt::create_token(&claims, "a-secret-key-of-at-least-32-bytes!!")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
