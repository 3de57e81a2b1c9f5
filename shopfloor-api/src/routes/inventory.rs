/// Inventory endpoints
///
/// # Endpoints
///
/// - `POST /inventory/` - Create item
/// - `GET /inventory/` - List items (cached)
/// - `GET /inventory/:id` - Get item
/// - `PUT /inventory/:id` - Update item
/// - `DELETE /inventory/:id` - Delete item and detach it from every ticket
///
/// Listings are cached under the `inventory` namespace; every write drops
/// the namespace after it commits.

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
use serde_json::Value;
use shopfloor_shared::models::inventory::{
    CreateInventoryItem, InventoryItem, UpdateInventoryItem,
};
use validator::Validate;

const CACHE_NAMESPACE: &str = "inventory";

/// Create item request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateItemRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,

    pub description: Option<String>,

    #[validate(range(min = 0, message = "Quantity must be non-negative"))]
    pub quantity: i32,

    pub price: Decimal,

    #[validate(length(max = 100, message = "supplier must be at most 100 characters"))]
    pub supplier: Option<String>,

    #[validate(length(max = 50, message = "category must be at most 50 characters"))]
    pub category: Option<String>,

    #[validate(range(min = 0, message = "reorder_level must be non-negative"))]
    pub reorder_level: Option<i32>,
}

/// Update item request; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateItemRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: Option<String>,

    pub description: Option<String>,

    #[validate(range(min = 0, message = "Quantity must be non-negative"))]
    pub quantity: Option<i32>,

    pub price: Option<Decimal>,

    #[validate(length(max = 100, message = "supplier must be at most 100 characters"))]
    pub supplier: Option<String>,

    #[validate(length(max = 50, message = "category must be at most 50 characters"))]
    pub category: Option<String>,

    #[validate(range(min = 0, message = "reorder_level must be non-negative"))]
    pub reorder_level: Option<i32>,
}

fn not_found() -> ApiError {
    ApiError::NotFound("Inventory item not found".to_string())
}

/// Create an inventory item
///
/// # Errors
///
/// - `400 Bad Request`: missing field, negative quantity or price
pub async fn create_item(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateItemRequest>,
) -> ApiResult<(StatusCode, Json<InventoryItem>)> {
    validate(&req)?;
    non_negative("price", Some(req.price))?;

    let item = InventoryItem::create(
        &state.db,
        CreateInventoryItem {
            name: req.name,
            description: req.description,
            quantity: req.quantity,
            price: req.price,
            supplier: req.supplier,
            category: req.category,
            reorder_level: req.reorder_level,
        },
    )
    .await?;

    state.invalidate_cache(CACHE_NAMESPACE).await;
    tracing::info!(item_id = item.id, "Inventory item created");

    Ok((StatusCode::CREATED, Json(item)))
}

/// List inventory items
pub async fn list_items(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<Value>> {
    let page = query.page()?;
    let key = query.cache_key(page);

    if let Some(body) = state.cached_listing(CACHE_NAMESPACE, &key).await {
        return Ok(Json(body));
    }

    let items = InventoryItem::list(&state.db, page).await?;
    let count = InventoryItem::count(&state.db).await?;

    let body = listing("inventory", &items, count, page);
    state.store_listing(CACHE_NAMESPACE, &key, &body).await;

    Ok(Json(body))
}

/// Get an inventory item
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<InventoryItem>> {
    let item = InventoryItem::find_by_id(&state.db, id)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(item))
}

/// Update an inventory item
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ApiJson(req): ApiJson<UpdateItemRequest>,
) -> ApiResult<Json<InventoryItem>> {
    validate(&req)?;
    non_negative("price", req.price)?;

    let item = InventoryItem::update(
        &state.db,
        id,
        UpdateInventoryItem {
            name: req.name,
            description: req.description,
            quantity: req.quantity,
            price: req.price,
            supplier: req.supplier,
            category: req.category,
            reorder_level: req.reorder_level,
        },
    )
    .await?
    .ok_or_else(not_found)?;

    state.invalidate_cache(CACHE_NAMESPACE).await;

    if item.needs_reorder() {
        tracing::info!(
            item_id = id,
            quantity = item.quantity,
            reorder_level = item.reorder_level,
            "Inventory item at or below reorder level"
        );
    }

    Ok(Json(item))
}

/// Delete an inventory item
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Value>> {
    if !InventoryItem::delete(&state.db, id).await? {
        return Err(not_found());
    }

    state.invalidate_cache(CACHE_NAMESPACE).await;
    tracing::info!(item_id = id, "Inventory item deleted");

    Ok(Json(message("Inventory item deleted successfully")))
}
