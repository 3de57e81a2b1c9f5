/// Mechanic model and database operations
///
/// Mechanics are assigned to service tickets through the
/// `service_ticket_mechanics` association table (see
/// [`crate::assignment`]).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE mechanics (
///     id SERIAL PRIMARY KEY,
///     name VARCHAR(100) NOT NULL,
///     email VARCHAR(120) NOT NULL UNIQUE,
///     phone VARCHAR(20),
///     salary NUMERIC(10, 2) NOT NULL CHECK (salary >= 0),
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     specialization TEXT,
///     hire_date TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::Page;

/// Mechanic model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Mechanic {
    /// Mechanic ID
    pub id: i32,

    /// Full name
    pub name: String,

    /// Email address (unique among mechanics)
    pub email: String,

    /// Contact phone number
    pub phone: Option<String>,

    /// Annual salary
    #[serde(with = "rust_decimal::serde::float")]
    pub salary: Decimal,

    /// Whether the mechanic currently takes work
    pub is_active: bool,

    /// Free-form specialization, e.g. "transmissions"
    pub specialization: Option<String>,

    /// When the mechanic was hired
    pub hire_date: DateTime<Utc>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new mechanic
#[derive(Debug, Clone)]
pub struct CreateMechanic {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,

    /// Rounded to 2 places before insert
    pub salary: Decimal,

    /// Defaults to true
    pub is_active: Option<bool>,

    pub specialization: Option<String>,
}

/// Input for updating a mechanic; only non-None fields are written
#[derive(Debug, Clone, Default)]
pub struct UpdateMechanic {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub salary: Option<Decimal>,
    pub is_active: Option<bool>,
    pub specialization: Option<String>,
}

/// A mechanic ranked by the number of tickets assigned to them
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MechanicWorkload {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub mechanic: Mechanic,

    /// Number of service tickets the mechanic is assigned to
    pub ticket_count: i64,
}

/// Sort direction for [`Mechanic::by_workload`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkloadOrder {
    /// Busiest first
    Desc,

    /// Least busy first
    Asc,
}

impl WorkloadOrder {
    /// Parses `"asc"` or `"desc"` (case-insensitive)
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Some(WorkloadOrder::Asc),
            "desc" => Some(WorkloadOrder::Desc),
            _ => None,
        }
    }

    fn as_sql(&self) -> &'static str {
        match self {
            WorkloadOrder::Asc => "ASC",
            WorkloadOrder::Desc => "DESC",
        }
    }
}

const COLUMNS: &str =
    "id, name, email, phone, salary, is_active, specialization, hire_date, created_at, updated_at";

impl Mechanic {
    /// Creates a new mechanic
    pub async fn create(pool: &PgPool, data: CreateMechanic) -> Result<Self, sqlx::Error> {
        let mechanic = sqlx::query_as::<_, Mechanic>(&format!(
            r#"
            INSERT INTO mechanics (name, email, phone, salary, is_active, specialization)
            VALUES ($1, $2, $3, $4, COALESCE($5, TRUE), $6)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(data.name)
        .bind(data.email)
        .bind(data.phone)
        .bind(data.salary.round_dp(2))
        .bind(data.is_active)
        .bind(data.specialization)
        .fetch_one(pool)
        .await?;

        Ok(mechanic)
    }

    /// Finds a mechanic by ID
    pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        let mechanic = sqlx::query_as::<_, Mechanic>(&format!(
            "SELECT {COLUMNS} FROM mechanics WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(mechanic)
    }

    /// Whether `email` belongs to a mechanic other than `exclude_id`
    pub async fn email_taken(
        pool: &PgPool,
        email: &str,
        exclude_id: Option<i32>,
    ) -> Result<bool, sqlx::Error> {
        let (taken,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM mechanics WHERE email = $1 AND ($2::INT IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(exclude_id)
        .fetch_one(pool)
        .await?;

        Ok(taken)
    }

    /// Lists mechanics ordered by ID
    pub async fn list(pool: &PgPool, page: Page) -> Result<Vec<Self>, sqlx::Error> {
        let mechanics = sqlx::query_as::<_, Mechanic>(&format!(
            "SELECT {COLUMNS} FROM mechanics ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

        Ok(mechanics)
    }

    /// Counts all mechanics
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM mechanics")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    /// Ranks mechanics by assigned ticket count, ties broken by name
    pub async fn by_workload(
        pool: &PgPool,
        order: WorkloadOrder,
        limit: Option<i64>,
    ) -> Result<Vec<MechanicWorkload>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT m.id, m.name, m.email, m.phone, m.salary, m.is_active, m.specialization,
                   m.hire_date, m.created_at, m.updated_at,
                   COUNT(stm.service_ticket_id) AS ticket_count
            FROM mechanics m
            LEFT JOIN service_ticket_mechanics stm ON stm.mechanic_id = m.id
            GROUP BY m.id
            ORDER BY ticket_count {}, m.name ASC
            LIMIT $1
            "#,
            order.as_sql()
        );

        let ranked = sqlx::query_as::<_, MechanicWorkload>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await?;

        Ok(ranked)
    }

    /// Updates a mechanic
    ///
    /// Returns None if the mechanic doesn't exist.
    pub async fn update(
        pool: &PgPool,
        id: i32,
        data: UpdateMechanic,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE mechanics SET updated_at = NOW()");
        let mut bind_count = 1;

        let mut push = |column: &str, present: bool| {
            if present {
                bind_count += 1;
                query.push_str(&format!(", {} = ${}", column, bind_count));
            }
        };
        push("name", data.name.is_some());
        push("email", data.email.is_some());
        push("phone", data.phone.is_some());
        push("salary", data.salary.is_some());
        push("is_active", data.is_active.is_some());
        push("specialization", data.specialization.is_some());

        query.push_str(&format!(" WHERE id = $1 RETURNING {COLUMNS}"));

        let mut q = sqlx::query_as::<_, Mechanic>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(email) = data.email {
            q = q.bind(email);
        }
        if let Some(phone) = data.phone {
            q = q.bind(phone);
        }
        if let Some(salary) = data.salary {
            q = q.bind(salary.round_dp(2));
        }
        if let Some(is_active) = data.is_active {
            q = q.bind(is_active);
        }
        if let Some(specialization) = data.specialization {
            q = q.bind(specialization);
        }

        let mechanic = q.fetch_optional(pool).await?;

        Ok(mechanic)
    }

    /// Deletes a mechanic and its ticket assignments
    ///
    /// Returns false if the mechanic doesn't exist.
    pub async fn delete(pool: &PgPool, id: i32) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM service_ticket_mechanics WHERE mechanic_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM mechanics WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        tx.commit().await?;

        Ok(true)
    }
}
