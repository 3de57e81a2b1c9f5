/// Membership endpoints
///
/// # Endpoints
///
/// - `POST /members/` - Enroll the authenticated customer (5/minute)
/// - `GET /members/` - List memberships, filterable by `membership_type` and `is_active` (cached)
/// - `GET /members/:id` - Get membership
/// - `PUT /members/:id` - Update own membership
/// - `DELETE /members/:id` - Cancel own membership
///
/// Writes require a bearer token belonging to the membership's customer.

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
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use shopfloor_shared::{
    auth::{authorization::require_owner, middleware::AuthContext},
    models::{
        customer::Customer,
        member::{
            validate_date_range, CreateMember, Member, MemberFilter, MembershipType, UpdateMember,
        },
        Page,
    },
};
use validator::Validate;

const CACHE_NAMESPACE: &str = "members";

/// Enrollment request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateMemberRequest {
    pub customer_id: i32,

    /// `basic` (default), `premium` or `vip`
    pub membership_type: Option<String>,

    pub is_active: Option<bool>,

    #[validate(range(min = 0, message = "points must be non-negative"))]
    pub points: Option<i32>,

    /// Defaults to now
    pub start_date: Option<DateTime<Utc>>,

    pub end_date: Option<DateTime<Utc>>,
}

/// Update request; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateMemberRequest {
    pub membership_type: Option<String>,

    pub is_active: Option<bool>,

    #[validate(range(min = 0, message = "points must be non-negative"))]
    pub points: Option<i32>,

    pub start_date: Option<DateTime<Utc>>,

    pub end_date: Option<DateTime<Utc>>,
}

/// `GET /members/` query
#[derive(Debug, Default, Deserialize)]
pub struct MemberQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub membership_type: Option<String>,

    /// `true` or `false`, case-insensitive
    pub is_active: Option<String>,
}

impl MemberQuery {
    fn filter(&self) -> ApiResult<MemberFilter> {
        let membership_type = self
            .membership_type
            .as_deref()
            .map(parse_membership_type)
            .transpose()?;

        let is_active = match self.is_active.as_deref().map(str::to_ascii_lowercase) {
            None => None,
            Some(v) if v == "true" => Some(true),
            Some(v) if v == "false" => Some(false),
            Some(_) => {
                return Err(ApiError::BadRequest(
                    "is_active must be \"true\" or \"false\"".to_string(),
                ))
            }
        };

        Ok(MemberFilter {
            membership_type,
            is_active,
        })
    }

    fn cache_key(&self, page: Page, filter: &MemberFilter) -> String {
        format!(
            "{}&type={}&active={}",
            PageQuery::default().cache_key(page),
            filter.membership_type.map(|t| t.as_str()).unwrap_or("*"),
            filter
                .is_active
                .map(|a| a.to_string())
                .unwrap_or_else(|| "*".to_string()),
        )
    }
}

fn parse_membership_type(value: &str) -> ApiResult<MembershipType> {
    MembershipType::parse(value).ok_or_else(|| {
        ApiError::invalid_field(
            "membership_type",
            "membership_type must be one of: basic, premium, vip",
        )
    })
}

fn not_found() -> ApiError {
    ApiError::NotFound("Member not found".to_string())
}

/// Enroll a customer
///
/// # Errors
///
/// - `403 Forbidden`: `customer_id` is not the authenticated customer
/// - `400 Bad Request`: validation failed, unknown customer, or already a member
pub async fn create_member(
    auth: AuthContext,
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateMemberRequest>,
) -> ApiResult<(StatusCode, Json<Member>)> {
    require_owner(&auth, req.customer_id)?;
    validate(&req)?;

    let membership_type = req
        .membership_type
        .as_deref()
        .map(parse_membership_type)
        .transpose()?
        .unwrap_or_default();

    validate_date_range(req.start_date.unwrap_or_else(Utc::now), req.end_date)
        .map_err(|e| ApiError::invalid_field("end_date", e))?;

    if !Customer::exists(&state.db, req.customer_id).await? {
        return Err(ApiError::BadRequest("Customer not found".to_string()));
    }

    if Member::find_by_customer(&state.db, req.customer_id).await?.is_some() {
        return Err(ApiError::BadRequest("Customer is already a member".to_string()));
    }

    let member = Member::create(
        &state.db,
        CreateMember {
            customer_id: req.customer_id,
            membership_type,
            is_active: req.is_active,
            points: req.points,
            start_date: req.start_date,
            end_date: req.end_date,
        },
    )
    .await?;

    state.invalidate_cache(CACHE_NAMESPACE).await;
    tracing::info!(member_id = member.id, customer_id = member.customer_id, "Member enrolled");

    Ok((StatusCode::CREATED, Json(member)))
}

/// List memberships
pub async fn list_members(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<MemberQuery>,
) -> ApiResult<Json<Value>> {
    let page = PageQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .page()?;
    let filter = query.filter()?;
    let key = query.cache_key(page, &filter);

    if let Some(body) = state.cached_listing(CACHE_NAMESPACE, &key).await {
        return Ok(Json(body));
    }

    let members = Member::list(&state.db, filter, page).await?;
    let count = Member::count(&state.db, filter).await?;

    let body = listing("members", &members, count, page);
    state.store_listing(CACHE_NAMESPACE, &key, &body).await;

    Ok(Json(body))
}

/// Get a membership
pub async fn get_member(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Member>> {
    let member = Member::find_by_id(&state.db, id)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(member))
}

/// Update own membership
pub async fn update_member(
    auth: AuthContext,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ApiJson(req): ApiJson<UpdateMemberRequest>,
) -> ApiResult<Json<Member>> {
    let existing = Member::find_by_id(&state.db, id)
        .await?
        .ok_or_else(not_found)?;

    require_owner(&auth, existing.customer_id)?;
    validate(&req)?;

    let membership_type = req
        .membership_type
        .as_deref()
        .map(parse_membership_type)
        .transpose()?;

    validate_date_range(
        req.start_date.unwrap_or(existing.start_date),
        req.end_date.or(existing.end_date),
    )
    .map_err(|e| ApiError::invalid_field("end_date", e))?;

    let member = Member::update(
        &state.db,
        id,
        UpdateMember {
            membership_type,
            is_active: req.is_active,
            points: req.points,
            start_date: req.start_date,
            end_date: req.end_date,
        },
    )
    .await?
    .ok_or_else(not_found)?;

    state.invalidate_cache(CACHE_NAMESPACE).await;
    tracing::info!(member_id = id, "Member updated");

    Ok(Json(member))
}

/// Cancel own membership
pub async fn delete_member(
    auth: AuthContext,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Value>> {
    let existing = Member::find_by_id(&state.db, id)
        .await?
        .ok_or_else(not_found)?;

    require_owner(&auth, existing.customer_id)?;

    if !Member::delete(&state.db, id).await? {
        return Err(not_found());
    }

    state.invalidate_cache(CACHE_NAMESPACE).await;
    tracing::info!(member_id = id, "Member deleted");

    Ok(Json(message("Member deleted successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(membership_type: Option<&str>, is_active: Option<&str>) -> MemberQuery {
        MemberQuery {
            membership_type: membership_type.map(String::from),
            is_active: is_active.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_filter_parsing() {
        let filter = query(Some("vip"), Some("TRUE")).filter().unwrap();
        assert_eq!(filter.membership_type, Some(MembershipType::Vip));
        assert_eq!(filter.is_active, Some(true));

        let filter = query(None, Some("false")).filter().unwrap();
        assert_eq!(filter.is_active, Some(false));

        assert!(query(None, None).filter().unwrap().is_active.is_none());
    }

    #[test]
    fn test_invalid_filters_are_rejected() {
        assert!(matches!(
            query(None, Some("yes")).filter(),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            query(Some("gold"), None).filter(),
            Err(ApiError::ValidationError(_))
        ));
    }

    #[test]
    fn test_cache_key_distinguishes_filters() {
        let page = Page::default();
        let a = query(Some("vip"), None);
        let b = query(Some("basic"), None);

        assert_ne!(
            a.cache_key(page, &a.filter().unwrap()),
            b.cache_key(page, &b.filter().unwrap())
        );
    }
}
