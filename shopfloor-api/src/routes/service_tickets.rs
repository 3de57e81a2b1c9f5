/// Service ticket endpoints
///
/// # Endpoints
///
/// - `POST /service-tickets/` - Create ticket, optionally with mechanics
/// - `GET /service-tickets/` - List tickets, filterable by `status`, `priority`, `customer_id`
/// - `GET /service-tickets/:id` - Get ticket with mechanics and parts
/// - `PUT /service-tickets/:id` - Update ticket
/// - `DELETE /service-tickets/:id` - Delete ticket and its assignments
/// - `PUT /service-tickets/:id/edit` - Bulk add/remove mechanics
/// - `PUT /service-tickets/:id/assign-mechanic/:mechanic_id` - Assign one mechanic
/// - `PUT /service-tickets/:id/remove-mechanic/:mechanic_id` - Remove one mechanic
/// - `POST|DELETE /service-tickets/:id/inventory` - Bulk add/remove parts
/// - `POST|DELETE /service-tickets/:id/inventory/:inventory_id` - Add/remove one part
///
/// Bulk endpoints answer 404 for a missing ticket before looking at the
/// body, then 200 when every id was applied, 207 when some were rejected and
/// 400 when all were.

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
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use shopfloor_shared::{
    assignment::{
        self, AssociationKind, BatchOutcome, BatchRequest, BatchVerdict, SingleOutcome, Summary,
    },
    models::{
        customer::Customer,
        service_ticket::{
            CreateServiceTicket, Priority, ServiceTicket, ServiceTicketDetail, TicketFilter,
            TicketStatus, UpdateServiceTicket,
        },
    },
};
use validator::Validate;

/// Create ticket request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTicketRequest {
    pub customer_id: i32,

    #[validate(length(min = 1, message = "description must not be empty"))]
    pub description: String,

    #[validate(length(max = 200, message = "vehicle_info must be at most 200 characters"))]
    pub vehicle_info: Option<String>,

    /// Defaults to today
    pub service_date: Option<NaiveDate>,

    pub status: Option<String>,
    pub priority: Option<String>,
    pub estimated_cost: Option<Decimal>,
    pub actual_cost: Option<Decimal>,

    /// Unknown ids are skipped
    pub mechanic_ids: Option<Vec<i32>>,
}

/// Update ticket request; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTicketRequest {
    pub customer_id: Option<i32>,

    #[validate(length(min = 1, message = "description must not be empty"))]
    pub description: Option<String>,

    #[validate(length(max = 200, message = "vehicle_info must be at most 200 characters"))]
    pub vehicle_info: Option<String>,

    pub service_date: Option<NaiveDate>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub estimated_cost: Option<Decimal>,
    pub actual_cost: Option<Decimal>,
}

/// `GET /service-tickets/` query
#[derive(Debug, Default, Deserialize)]
pub struct TicketQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub customer_id: Option<i32>,
}

impl TicketQuery {
    fn filter(&self) -> ApiResult<TicketFilter> {
        Ok(TicketFilter {
            status: self.status.as_deref().map(parse_status).transpose()?,
            priority: self.priority.as_deref().map(parse_priority).transpose()?,
            customer_id: self.customer_id,
        })
    }
}

fn parse_status(value: &str) -> ApiResult<TicketStatus> {
    TicketStatus::parse(value).ok_or_else(|| {
        ApiError::invalid_field(
            "status",
            "status must be one of: pending, in_progress, completed, cancelled",
        )
    })
}

fn parse_priority(value: &str) -> ApiResult<Priority> {
    Priority::parse(value).ok_or_else(|| {
        ApiError::invalid_field("priority", "priority must be one of: low, medium, high, urgent")
    })
}

fn not_found() -> ApiError {
    ApiError::NotFound("Service ticket not found".to_string())
}

async fn require_ticket(state: &AppState, id: i32) -> ApiResult<()> {
    ServiceTicket::find_by_id(&state.db, id)
        .await?
        .ok_or_else(not_found)?;
    Ok(())
}

async fn require_customer(state: &AppState, customer_id: i32) -> ApiResult<()> {
    if Customer::exists(&state.db, customer_id).await? {
        Ok(())
    } else {
        Err(ApiError::BadRequest("Customer not found".to_string()))
    }
}

/// Shapes a bulk outcome into its status and body
///
/// `changes_made` is present whenever something was requested; `errors`
/// only when an id was rejected.
fn batch_response(outcome: BatchOutcome) -> (StatusCode, Json<Value>) {
    let status = outcome.verdict.status_code();

    let mut body = json!({
        "message": outcome.message,
        "service_ticket": outcome.ticket,
    });

    if outcome.verdict != BatchVerdict::NoChanges {
        body["changes_made"] = json!(outcome.plan.changes_made);
    }
    if !outcome.plan.errors.is_empty() {
        body["errors"] = json!(outcome.plan.errors);
    }

    (status, Json(body))
}

fn single_response(outcome: SingleOutcome) -> Json<Value> {
    Json(json!({
        "message": outcome.message,
        "service_ticket": outcome.ticket,
    }))
}

/// Create a service ticket
///
/// # Errors
///
/// - `400 Bad Request`: validation failed or the customer doesn't exist
pub async fn create_ticket(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateTicketRequest>,
) -> ApiResult<(StatusCode, Json<ServiceTicketDetail>)> {
    validate(&req)?;
    non_negative("estimated_cost", req.estimated_cost)?;
    non_negative("actual_cost", req.actual_cost)?;

    let status = req.status.as_deref().map(parse_status).transpose()?;
    let priority = req.priority.as_deref().map(parse_priority).transpose()?;

    require_customer(&state, req.customer_id).await?;

    let ticket = ServiceTicket::create(
        &state.db,
        CreateServiceTicket {
            customer_id: req.customer_id,
            vehicle_info: req.vehicle_info,
            description: req.description,
            service_date: req.service_date,
            status: status.unwrap_or_default(),
            priority: priority.unwrap_or_default(),
            estimated_cost: req.estimated_cost,
            actual_cost: req.actual_cost,
            mechanic_ids: req.mechanic_ids.unwrap_or_default(),
        },
    )
    .await?;

    tracing::info!(
        ticket_id = ticket.ticket.id,
        customer_id = ticket.ticket.customer_id,
        mechanics = ticket.mechanics.len(),
        "Service ticket created"
    );

    Ok((StatusCode::CREATED, Json(ticket)))
}

/// List service tickets, newest first
pub async fn list_tickets(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TicketQuery>,
) -> ApiResult<Json<Value>> {
    let page = PageQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .page()?;
    let filter = query.filter()?;

    let tickets = ServiceTicket::list(&state.db, filter, page).await?;
    let count = ServiceTicket::count(&state.db, filter).await?;

    Ok(Json(listing("service_tickets", &tickets, count, page)))
}

/// Get a service ticket
pub async fn get_ticket(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<ServiceTicketDetail>> {
    let ticket = ServiceTicket::find_detail(&state.db, id)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(ticket))
}

/// Update a service ticket
///
/// Moving the ticket to `completed` stamps `completed_at`.
///
/// # Errors
///
/// - `404 Not Found`: ticket doesn't exist
/// - `400 Bad Request`: validation failed or the new customer doesn't exist
pub async fn update_ticket(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ApiJson(req): ApiJson<UpdateTicketRequest>,
) -> ApiResult<Json<ServiceTicketDetail>> {
    validate(&req)?;
    non_negative("estimated_cost", req.estimated_cost)?;
    non_negative("actual_cost", req.actual_cost)?;

    let status = req.status.as_deref().map(parse_status).transpose()?;
    let priority = req.priority.as_deref().map(parse_priority).transpose()?;

    require_ticket(&state, id).await?;

    if let Some(customer_id) = req.customer_id {
        require_customer(&state, customer_id).await?;
    }

    let ticket = ServiceTicket::update(
        &state.db,
        id,
        UpdateServiceTicket {
            customer_id: req.customer_id,
            vehicle_info: req.vehicle_info,
            description: req.description,
            service_date: req.service_date,
            status,
            priority,
            estimated_cost: req.estimated_cost,
            actual_cost: req.actual_cost,
        },
    )
    .await?
    .ok_or_else(not_found)?;

    tracing::info!(ticket_id = id, status = %ticket.ticket.status, "Service ticket updated");

    Ok(Json(ticket))
}

/// Delete a service ticket
pub async fn delete_ticket(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Value>> {
    if !ServiceTicket::delete(&state.db, id).await? {
        return Err(not_found());
    }

    tracing::info!(ticket_id = id, "Service ticket deleted");

    Ok(Json(message("Service ticket deleted successfully")))
}

/// Bulk add/remove mechanics
///
/// Body: `{"add_ids": [..], "remove_ids": [..]}`. Removals run before
/// additions and every id gets its own outcome.
///
/// # Errors
///
/// - `404 Not Found`: ticket doesn't exist
/// - `400 Bad Request`: empty body, a malformed id list, or every id was rejected
pub async fn edit_mechanics(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    require_ticket(&state, id).await?;

    let request =
        BatchRequest::from_json(AssociationKind::Mechanic, &body).map_err(ApiError::BadRequest)?;

    let outcome = assignment::edit_batch(
        &state.db,
        AssociationKind::Mechanic,
        id,
        &request,
        Summary::Changes,
    )
    .await?;

    Ok(batch_response(outcome))
}

/// Assign one mechanic
pub async fn assign_mechanic(
    State(state): State<AppState>,
    Path((id, mechanic_id)): Path<(i32, i32)>,
) -> ApiResult<Json<Value>> {
    let outcome =
        assignment::assign_one(&state.db, AssociationKind::Mechanic, id, mechanic_id).await?;

    Ok(single_response(outcome))
}

/// Remove one mechanic
pub async fn remove_mechanic(
    State(state): State<AppState>,
    Path((id, mechanic_id)): Path<(i32, i32)>,
) -> ApiResult<Json<Value>> {
    let outcome =
        assignment::remove_one(&state.db, AssociationKind::Mechanic, id, mechanic_id).await?;

    Ok(single_response(outcome))
}

async fn inventory_batch(
    state: &AppState,
    id: i32,
    body: &Value,
    summary: Summary,
) -> ApiResult<(StatusCode, Json<Value>)> {
    require_ticket(state, id).await?;
    assignment::require_input(body).map_err(ApiError::BadRequest)?;

    let ids = assignment::parse_id_list(AssociationKind::Inventory, body, "inventory_ids")
        .map_err(ApiError::BadRequest)?;

    let request = match summary {
        Summary::Removals => BatchRequest {
            add_ids: Vec::new(),
            remove_ids: ids,
        },
        _ => BatchRequest {
            add_ids: ids,
            remove_ids: Vec::new(),
        },
    };

    let outcome =
        assignment::edit_batch(&state.db, AssociationKind::Inventory, id, &request, summary)
            .await?;

    Ok(batch_response(outcome))
}

/// Bulk add parts: `{"inventory_ids": [..]}`
pub async fn add_inventory(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    inventory_batch(&state, id, &body, Summary::Additions).await
}

/// Bulk remove parts: `{"inventory_ids": [..]}`
pub async fn remove_inventory(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    inventory_batch(&state, id, &body, Summary::Removals).await
}

/// Add one part
pub async fn add_inventory_item(
    State(state): State<AppState>,
    Path((id, inventory_id)): Path<(i32, i32)>,
) -> ApiResult<Json<Value>> {
    let outcome =
        assignment::assign_one(&state.db, AssociationKind::Inventory, id, inventory_id).await?;

    Ok(single_response(outcome))
}

/// Remove one part
pub async fn remove_inventory_item(
    State(state): State<AppState>,
    Path((id, inventory_id)): Path<(i32, i32)>,
) -> ApiResult<Json<Value>> {
    let outcome =
        assignment::remove_one(&state.db, AssociationKind::Inventory, id, inventory_id).await?;

    Ok(single_response(outcome))
}
