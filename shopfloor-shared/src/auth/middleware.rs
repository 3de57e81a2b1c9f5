/// Bearer-token authentication for Axum
///
/// [`authenticate`] turns an `Authorization: Bearer <jwt>` header into an
/// [`AuthContext`]. The API's auth layer stores the context in the request
/// extensions, and handlers receive it through the [`AuthContext`] extractor.
///
/// # Example
///
/// ```
/// use shopfloor_shared::auth::middleware::AuthContext;
///
/// async fn protected_handler(auth: AuthContext) -> String {
///     format!("Hello, customer {}!", auth.customer_id)
/// }
/// ```

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::jwt::{validate_token, Claims, JwtError};

/// Identity of the authenticated customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated customer id
    pub customer_id: i32,

    /// Email carried in the token
    pub email: String,
}

impl From<Claims> for AuthContext {
    fn from(claims: Claims) -> Self {
        Self {
            customer_id: claims.customer_id,
            email: claims.email,
        }
    }
}

/// Authentication failure; every variant answers 401
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No Authorization header
    #[error("Token is missing")]
    MissingCredentials,

    /// Header present but not `Bearer <token>`
    #[error("Invalid token format")]
    InvalidFormat,

    /// Token failed validation
    #[error("{0}")]
    InvalidToken(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

/// Extracts and validates the bearer token from `headers`
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<AuthContext, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::InvalidFormat)?;

    let token = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::InvalidFormat)?;

    let claims = validate_token(token, secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token has expired".to_string()),
        _ => AuthError::InvalidToken("Token is invalid or expired".to_string()),
    })?;

    Ok(claims.into())
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AuthError::MissingCredentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::create_token;
    use axum::http::HeaderValue;
    use chrono::Duration;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_authenticate_valid_token() {
        let token = create_token(&Claims::new(5, "ada@example.com"), SECRET).unwrap();

        let auth = authenticate(&headers_with(&format!("Bearer {}", token)), SECRET).unwrap();
        assert_eq!(auth.customer_id, 5);
        assert_eq!(auth.email, "ada@example.com");
    }

    #[test]
    fn test_authenticate_missing_header() {
        assert_eq!(
            authenticate(&HeaderMap::new(), SECRET),
            Err(AuthError::MissingCredentials)
        );
    }

    #[test]
    fn test_authenticate_wrong_scheme() {
        assert_eq!(
            authenticate(&headers_with("Basic dXNlcjpwYXNz"), SECRET),
            Err(AuthError::InvalidFormat)
        );
        assert_eq!(
            authenticate(&headers_with("Bearer "), SECRET),
            Err(AuthError::InvalidFormat)
        );
    }

    #[test]
    fn test_authenticate_expired_token() {
        let claims = Claims::with_expiration(5, "ada@example.com", Duration::seconds(-60));
        let token = create_token(&claims, SECRET).unwrap();

        assert_eq!(
            authenticate(&headers_with(&format!("Bearer {}", token)), SECRET),
            Err(AuthError::InvalidToken("Token has expired".to_string()))
        );
    }

    #[test]
    fn test_auth_error_is_unauthorized() {
        let response = AuthError::InvalidFormat.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
