/// Membership model and database operations
///
/// Each customer can hold at most one membership (unique `customer_id`).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE members (
///     id SERIAL PRIMARY KEY,
///     customer_id INTEGER NOT NULL UNIQUE REFERENCES customers (id),
///     membership_type VARCHAR(20) NOT NULL DEFAULT 'basic',
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     points INTEGER NOT NULL DEFAULT 0 CHECK (points >= 0),
///     start_date TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     end_date TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::Page;

/// Membership tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipType {
    #[default]
    Basic,
    Premium,
    Vip,
}

impl MembershipType {
    /// Converts the tier to its database representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipType::Basic => "basic",
            MembershipType::Premium => "premium",
            MembershipType::Vip => "vip",
        }
    }

    /// Parses a database or query-string value
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "basic" => Some(MembershipType::Basic),
            "premium" => Some(MembershipType::Premium),
            "vip" => Some(MembershipType::Vip),
            _ => None,
        }
    }
}

/// Member model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Member {
    pub id: i32,

    /// Customer holding this membership
    pub customer_id: i32,

    /// `basic`, `premium` or `vip`
    pub membership_type: String,

    pub is_active: bool,

    /// Loyalty points balance
    pub points: i32,

    pub start_date: DateTime<Utc>,

    /// Expiry, None for open-ended memberships
    pub end_date: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a membership
#[derive(Debug, Clone)]
pub struct CreateMember {
    pub customer_id: i32,
    pub membership_type: MembershipType,
    pub is_active: Option<bool>,
    pub points: Option<i32>,

    /// Defaults to now
    pub start_date: Option<DateTime<Utc>>,

    pub end_date: Option<DateTime<Utc>>,
}

/// Input for updating a membership; only non-None fields are written
#[derive(Debug, Clone, Default)]
pub struct UpdateMember {
    pub membership_type: Option<MembershipType>,
    pub is_active: Option<bool>,
    pub points: Option<i32>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Filters for [`Member::list`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemberFilter {
    pub membership_type: Option<MembershipType>,
    pub is_active: Option<bool>,
}

const COLUMNS: &str =
    "id, customer_id, membership_type, is_active, points, start_date, end_date, created_at, updated_at";

impl Member {
    /// Creates a membership
    ///
    /// # Errors
    ///
    /// Fails with a unique violation (`members_customer_id_key`) when the
    /// customer already holds a membership.
    pub async fn create(pool: &PgPool, data: CreateMember) -> Result<Self, sqlx::Error> {
        let member = sqlx::query_as::<_, Member>(&format!(
            r#"
            INSERT INTO members (customer_id, membership_type, is_active, points, start_date, end_date)
            VALUES ($1, $2, COALESCE($3, TRUE), COALESCE($4, 0), COALESCE($5, NOW()), $6)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(data.customer_id)
        .bind(data.membership_type.as_str())
        .bind(data.is_active)
        .bind(data.points)
        .bind(data.start_date)
        .bind(data.end_date)
        .fetch_one(pool)
        .await?;

        Ok(member)
    }

    /// Finds a membership by ID
    pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        let member = sqlx::query_as::<_, Member>(&format!(
            "SELECT {COLUMNS} FROM members WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(member)
    }

    /// Finds the membership held by a customer
    pub async fn find_by_customer(
        pool: &PgPool,
        customer_id: i32,
    ) -> Result<Option<Self>, sqlx::Error> {
        let member = sqlx::query_as::<_, Member>(&format!(
            "SELECT {COLUMNS} FROM members WHERE customer_id = $1"
        ))
        .bind(customer_id)
        .fetch_optional(pool)
        .await?;

        Ok(member)
    }

    /// Lists memberships matching `filter`, ordered by ID
    pub async fn list(
        pool: &PgPool,
        filter: MemberFilter,
        page: Page,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let members = sqlx::query_as::<_, Member>(&format!(
            r#"
            SELECT {COLUMNS} FROM members
            WHERE ($1::VARCHAR IS NULL OR membership_type = $1)
              AND ($2::BOOLEAN IS NULL OR is_active = $2)
            ORDER BY id
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(filter.membership_type.map(|t| t.as_str()))
        .bind(filter.is_active)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

        Ok(members)
    }

    /// Counts memberships matching `filter`
    pub async fn count(pool: &PgPool, filter: MemberFilter) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM members
            WHERE ($1::VARCHAR IS NULL OR membership_type = $1)
              AND ($2::BOOLEAN IS NULL OR is_active = $2)
            "#,
        )
        .bind(filter.membership_type.map(|t| t.as_str()))
        .bind(filter.is_active)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Updates a membership
    ///
    /// Returns None if the membership doesn't exist.
    pub async fn update(
        pool: &PgPool,
        id: i32,
        data: UpdateMember,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE members SET updated_at = NOW()");
        let mut bind_count = 1;

        for (column, present) in [
            ("membership_type", data.membership_type.is_some()),
            ("is_active", data.is_active.is_some()),
            ("points", data.points.is_some()),
            ("start_date", data.start_date.is_some()),
            ("end_date", data.end_date.is_some()),
        ] {
            if present {
                bind_count += 1;
                query.push_str(&format!(", {} = ${}", column, bind_count));
            }
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {COLUMNS}"));

        let mut q = sqlx::query_as::<_, Member>(&query).bind(id);

        if let Some(membership_type) = data.membership_type {
            q = q.bind(membership_type.as_str());
        }
        if let Some(is_active) = data.is_active {
            q = q.bind(is_active);
        }
        if let Some(points) = data.points {
            q = q.bind(points);
        }
        if let Some(start_date) = data.start_date {
            q = q.bind(start_date);
        }
        if let Some(end_date) = data.end_date {
            q = q.bind(end_date);
        }

        let member = q.fetch_optional(pool).await?;

        Ok(member)
    }

    /// Deletes a membership
    pub async fn delete(pool: &PgPool, id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Checks that `end` does not precede `start`
pub fn validate_date_range(
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
) -> Result<(), String> {
    match end {
        Some(end) if end < start => Err("end_date must not be before start_date".to_string()),
        _ => Ok(()),
    }
}
