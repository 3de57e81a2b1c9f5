/// Request extractors with API-shaped rejections
///
/// Axum's `Json` and `Query` reject with plain-text 400/415/422 responses.
/// These wrappers reject with [`ApiError::BadRequest`] instead, so every
/// malformed request gets the usual `{"error": ...}` body and a 400.

use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, Query, Request,
    },
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// JSON body extractor
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::BadRequest(json_rejection_message(&rejection))),
        }
    }
}

/// Query string extractor
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(ApiQuery(value)),
            Err(rejection) => Err(ApiError::BadRequest(query_rejection_message(&rejection))),
        }
    }
}

fn json_rejection_message(rejection: &JsonRejection) -> String {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            "Request body must be JSON (Content-Type: application/json)".to_string()
        }
        JsonRejection::JsonSyntaxError(_) => "Request body is not valid JSON".to_string(),
        JsonRejection::JsonDataError(_) => describe_serde_error(&rejection.body_text()),
        _ => rejection.body_text(),
    }
}

fn query_rejection_message(rejection: &QueryRejection) -> String {
    describe_serde_error(&rejection.body_text())
}

/// Rewrites serde's "missing field `x`" / "invalid type ... `x`" into a
/// message naming the field
fn describe_serde_error(text: &str) -> String {
    let detail = text.split_once(": ").map(|(_, d)| d).unwrap_or(text);

    if let Some(field) = backticked(detail, "missing field ") {
        return format!("{} is required", field);
    }

    let detail = detail.split(" at line ").next().unwrap_or(detail);
    detail.to_string()
}

fn backticked<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = text.split(prefix).nth(1)?;
    let rest = rest.strip_prefix('`')?;
    rest.split('`').next()
}
