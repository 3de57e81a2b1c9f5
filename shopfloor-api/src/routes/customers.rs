/// Customer endpoints
///
/// # Endpoints
///
/// - `POST /customers/` - Create customer
/// - `GET /customers/` - List customers
/// - `POST /customers/login` - Exchange email and password for a token
/// - `GET /customers/:id` - Get customer
/// - `PUT /customers/:id` - Update customer (owner only)
/// - `DELETE /customers/:id` - Delete customer (owner only)
/// - `GET /customers/:id/service-tickets` - Tickets owned by the customer
///
/// Passwords are stored as Argon2id hashes and never serialized.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiQuery},
    routes::{listing, message, validate, PageQuery},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shopfloor_shared::{
    auth::{authorization::require_owner, jwt, middleware::AuthContext, password},
    models::{
        customer::{CreateCustomer, Customer, CustomerDeletion, UpdateCustomer},
        service_ticket::ServiceTicket,
    },
};
use validator::Validate;

/// Create customer request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCustomerRequest {
    #[validate(length(min = 1, max = 50, message = "first_name must be 1-50 characters"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 50, message = "last_name must be 1-50 characters"))]
    pub last_name: String,

    #[validate(
        email(message = "Invalid email format"),
        length(max = 120, message = "email must be at most 120 characters")
    )]
    pub email: String,

    #[validate(length(max = 20, message = "phone_number must be at most 20 characters"))]
    pub phone_number: Option<String>,

    pub address: Option<String>,

    /// Enables login when present
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
}

/// Update customer request; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateCustomerRequest {
    #[validate(length(min = 1, max = 50, message = "first_name must be 1-50 characters"))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 50, message = "last_name must be 1-50 characters"))]
    pub last_name: Option<String>,

    #[validate(
        email(message = "Invalid email format"),
        length(max = 120, message = "email must be at most 120 characters")
    )]
    pub email: Option<String>,

    #[validate(length(max = 20, message = "phone_number must be at most 20 characters"))]
    pub phone_number: Option<String>,

    pub address: Option<String>,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
}

/// Login request
///
/// Both fields are optional at the type level so a missing one produces
/// the same 400 as an empty one.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub customer: Customer,

    /// Access token (24h)
    pub token: String,
}

fn not_found() -> ApiError {
    ApiError::NotFound("Customer not found".to_string())
}

/// Create a customer
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed or email already exists
pub async fn create_customer(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateCustomerRequest>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    validate(&req)?;

    if Customer::email_taken(&state.db, &req.email, None).await? {
        return Err(ApiError::BadRequest("Email already exists".to_string()));
    }

    let password_hash = match req.password.as_deref() {
        Some(p) => Some(password::hash_password(p)?),
        None => None,
    };

    let customer = Customer::create(
        &state.db,
        CreateCustomer {
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            phone_number: req.phone_number,
            address: req.address,
            password_hash,
        },
    )
    .await?;

    tracing::info!(customer_id = customer.id, "Customer created");

    Ok((StatusCode::CREATED, Json(customer)))
}

/// List customers
pub async fn list_customers(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<Value>> {
    let page = query.page()?;

    let customers = Customer::list(&state.db, page).await?;
    let count = Customer::count(&state.db).await?;

    Ok(Json(listing("customers", &customers, count, page)))
}

/// Log in with email and password
///
/// # Errors
///
/// - `400 Bad Request`: email or password missing
/// - `401 Unauthorized`: unknown email, wrong password, or no password set
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let (email, password) = match (req.email, req.password) {
        (Some(e), Some(p)) if !e.trim().is_empty() && !p.is_empty() => (e, p),
        _ => {
            return Err(ApiError::BadRequest(
                "Email and password are required".to_string(),
            ))
        }
    };

    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());

    let customer = Customer::find_by_email(&state.db, email.trim())
        .await?
        .ok_or_else(invalid)?;

    let hash = customer.password_hash.as_deref().ok_or_else(invalid)?;
    if !password::verify_password(&password, hash)? {
        tracing::warn!(customer_id = customer.id, "Failed login attempt");
        return Err(invalid());
    }

    let token = jwt::create_token(&jwt::Claims::new(customer.id, &customer.email), state.jwt_secret())?;

    tracing::info!(customer_id = customer.id, "Customer logged in");

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        customer,
        token,
    }))
}

/// Get a customer
pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Customer>> {
    let customer = Customer::find_by_id(&state.db, id)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(customer))
}

/// Update a customer (owner only)
///
/// # Errors
///
/// - `403 Forbidden`: token belongs to another customer
/// - `404 Not Found`: customer doesn't exist
/// - `400 Bad Request`: validation failed or email already exists
pub async fn update_customer(
    auth: AuthContext,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ApiJson(req): ApiJson<UpdateCustomerRequest>,
) -> ApiResult<Json<Customer>> {
    require_owner(&auth, id)?;
    validate(&req)?;

    if let Some(email) = req.email.as_deref() {
        if Customer::email_taken(&state.db, email, Some(id)).await? {
            return Err(ApiError::BadRequest("Email already exists".to_string()));
        }
    }

    let password_hash = match req.password.as_deref() {
        Some(p) => Some(password::hash_password(p)?),
        None => None,
    };

    let customer = Customer::update(
        &state.db,
        id,
        UpdateCustomer {
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            phone_number: req.phone_number,
            address: req.address,
            password_hash,
        },
    )
    .await?
    .ok_or_else(not_found)?;

    tracing::info!(customer_id = id, "Customer updated");

    Ok(Json(customer))
}

/// Delete a customer and its membership (owner only)
///
/// # Errors
///
/// - `400 Bad Request`: customer still owns service tickets
pub async fn delete_customer(
    auth: AuthContext,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Value>> {
    require_owner(&auth, id)?;

    match Customer::delete(&state.db, id).await? {
        CustomerDeletion::Deleted => {
            state.invalidate_cache("members").await;
            tracing::info!(customer_id = id, "Customer deleted");
            Ok(Json(message("Customer deleted successfully")))
        }
        CustomerDeletion::NotFound => Err(not_found()),
        CustomerDeletion::HasTickets(count) => Err(ApiError::BadRequest(format!(
            "Cannot delete customer with {} existing service ticket(s)",
            count
        ))),
    }
}

/// Tickets owned by a customer, newest first
pub async fn customer_tickets(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Value>> {
    if !Customer::exists(&state.db, id).await? {
        return Err(not_found());
    }

    let tickets = ServiceTicket::list_for_customer(&state.db, id).await?;

    Ok(Json(json!({
        "customer_id": id,
        "count": tickets.len(),
        "service_tickets": tickets,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_validation() {
        let req: CreateCustomerRequest = serde_json::from_value(json!({
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": "ada@example.com",
            "password": "analytical"
        }))
        .unwrap();
        assert!(req.validate().is_ok());

        let req: CreateCustomerRequest = serde_json::from_value(json!({
            "first_name": "",
            "last_name": "Lovelace",
            "email": "ada-at-example",
            "password": "short"
        }))
        .unwrap();
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("first_name"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn test_password_is_optional() {
        let req: CreateCustomerRequest = serde_json::from_value(json!({
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": "ada@example.com"
        }))
        .unwrap();
        assert!(req.validate().is_ok());
        assert!(req.password.is_none());
    }

    #[test]
    fn test_empty_update_is_valid() {
        assert!(UpdateCustomerRequest::default().validate().is_ok());
    }
}
