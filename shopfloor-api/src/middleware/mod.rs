/// Middleware for the API server
///
/// - [`security`]: OWASP response headers
/// - [`rate_limit`]: Per-client token buckets

pub mod rate_limit;
pub mod security;
