/// Mechanic endpoints
///
/// # Endpoints
///
/// - `POST /mechanics/` - Create mechanic (10/minute)
/// - `GET /mechanics/` - List mechanics (cached)
/// - `GET /mechanics/by-workload` - Rank mechanics by assigned tickets
/// - `GET /mechanics/:id` - Get mechanic
/// - `PUT /mechanics/:id` - Update mechanic
/// - `DELETE /mechanics/:id` - Delete mechanic and its ticket assignments

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiQuery},
    routes::{listing, message, non_negative, validate, PageQuery},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use shopfloor_shared::models::mechanic::{
    CreateMechanic, Mechanic, UpdateMechanic, WorkloadOrder,
};
use validator::Validate;

const CACHE_NAMESPACE: &str = "mechanics";

/// Create mechanic request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateMechanicRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,

    #[validate(
        email(message = "Invalid email format"),
        length(max = 120, message = "email must be at most 120 characters")
    )]
    pub email: String,

    #[validate(length(max = 20, message = "phone must be at most 20 characters"))]
    pub phone: Option<String>,

    pub salary: Decimal,

    pub is_active: Option<bool>,

    pub specialization: Option<String>,
}

/// Update mechanic request; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateMechanicRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(
        email(message = "Invalid email format"),
        length(max = 120, message = "email must be at most 120 characters")
    )]
    pub email: Option<String>,

    #[validate(length(max = 20, message = "phone must be at most 20 characters"))]
    pub phone: Option<String>,

    pub salary: Option<Decimal>,

    pub is_active: Option<bool>,

    pub specialization: Option<String>,
}

/// `GET /mechanics/by-workload` query
#[derive(Debug, Default, Deserialize)]
pub struct WorkloadQuery {
    /// `asc` or `desc` (default)
    pub order: Option<String>,

    /// Maximum number of mechanics; absent or non-positive means all
    pub limit: Option<i64>,
}

fn not_found() -> ApiError {
    ApiError::NotFound("Mechanic not found".to_string())
}

/// Create a mechanic
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed, negative salary, or email already exists
pub async fn create_mechanic(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateMechanicRequest>,
) -> ApiResult<(StatusCode, Json<Mechanic>)> {
    validate(&req)?;
    non_negative("salary", Some(req.salary))?;

    if Mechanic::email_taken(&state.db, &req.email, None).await? {
        return Err(ApiError::BadRequest("Email already exists".to_string()));
    }

    let mechanic = Mechanic::create(
        &state.db,
        CreateMechanic {
            name: req.name,
            email: req.email,
            phone: req.phone,
            salary: req.salary,
            is_active: req.is_active,
            specialization: req.specialization,
        },
    )
    .await?;

    state.invalidate_cache(CACHE_NAMESPACE).await;
    tracing::info!(mechanic_id = mechanic.id, "Mechanic created");

    Ok((StatusCode::CREATED, Json(mechanic)))
}

/// List mechanics
pub async fn list_mechanics(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<Value>> {
    let page = query.page()?;
    let key = query.cache_key(page);

    if let Some(body) = state.cached_listing(CACHE_NAMESPACE, &key).await {
        return Ok(Json(body));
    }

    let mechanics = Mechanic::list(&state.db, page).await?;
    let count = Mechanic::count(&state.db).await?;

    let body = listing("mechanics", &mechanics, count, page);
    state.store_listing(CACHE_NAMESPACE, &key, &body).await;

    Ok(Json(body))
}

/// Rank mechanics by the number of tickets they are assigned to
///
/// Ties are broken by name.
///
/// # Errors
///
/// - `400 Bad Request`: `order` is not `asc` or `desc`
pub async fn mechanics_by_workload(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<WorkloadQuery>,
) -> ApiResult<Json<Value>> {
    let order = match query.order.as_deref() {
        None => WorkloadOrder::Desc,
        Some(raw) => WorkloadOrder::parse(raw).ok_or_else(|| {
            ApiError::BadRequest("order must be \"asc\" or \"desc\"".to_string())
        })?,
    };
    let limit = query.limit.filter(|l| *l > 0);

    let mechanics = Mechanic::by_workload(&state.db, order, limit).await?;

    let label = match order {
        WorkloadOrder::Asc => "asc",
        WorkloadOrder::Desc => "desc",
    };

    let mut body = json!({
        "mechanics": mechanics,
        "total_mechanics": mechanics.len(),
        "sort_order": label,
        "message": format!("Mechanics sorted by workload ({}ending order)", label),
    });
    if let Some(limit) = limit {
        body["limit_applied"] = json!(limit);
    }

    Ok(Json(body))
}

/// Get a mechanic
pub async fn get_mechanic(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Mechanic>> {
    let mechanic = Mechanic::find_by_id(&state.db, id)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(mechanic))
}

/// Update a mechanic
pub async fn update_mechanic(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ApiJson(req): ApiJson<UpdateMechanicRequest>,
) -> ApiResult<Json<Mechanic>> {
    validate(&req)?;
    non_negative("salary", req.salary)?;

    if let Some(email) = req.email.as_deref() {
        if Mechanic::email_taken(&state.db, email, Some(id)).await? {
            return Err(ApiError::BadRequest("Email already exists".to_string()));
        }
    }

    let mechanic = Mechanic::update(
        &state.db,
        id,
        UpdateMechanic {
            name: req.name,
            email: req.email,
            phone: req.phone,
            salary: req.salary,
            is_active: req.is_active,
            specialization: req.specialization,
        },
    )
    .await?
    .ok_or_else(not_found)?;

    state.invalidate_cache(CACHE_NAMESPACE).await;
    tracing::info!(mechanic_id = id, "Mechanic updated");

    Ok(Json(mechanic))
}

/// Delete a mechanic
///
/// The mechanic's ticket assignments are removed in the same transaction.
pub async fn delete_mechanic(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Value>> {
    if !Mechanic::delete(&state.db, id).await? {
        return Err(not_found());
    }

    state.invalidate_cache(CACHE_NAMESPACE).await;
    tracing::info!(mechanic_id = id, "Mechanic deleted");

    Ok(Json(message("Mechanic deleted successfully")))
}
