/// Service ticket model and database operations
///
/// A ticket belongs to one customer and is linked many-to-many to mechanics
/// (`service_ticket_mechanics`) and inventory parts
/// (`service_ticket_inventory`). Ticket responses embed both sets as
/// summaries; see [`ServiceTicketDetail`].
///
/// # Status lifecycle
///
/// ```text
/// pending → in_progress → completed
///        ↘ cancelled  ↙
/// ```
///
/// Moving a ticket to `completed` stamps `completed_at`; moving it out of
/// `completed` clears it.
///
/// # Example
///
/// ```no_run
/// use shopfloor_shared::models::service_ticket::{CreateServiceTicket, ServiceTicket};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let ticket = ServiceTicket::create(&pool, CreateServiceTicket {
///     customer_id: 1,
///     description: "Brake inspection".to_string(),
///     mechanic_ids: vec![2, 3],
///     ..Default::default()
/// }).await?;
///
/// assert_eq!(ticket.ticket.status, "pending");
/// # Ok(())
/// # }
/// ```

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

use super::Page;

/// Ticket workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TicketStatus {
    /// Converts status to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Pending => "pending",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Completed => "completed",
            TicketStatus::Cancelled => "cancelled",
        }
    }

    /// Parses a stored or query-string value
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(TicketStatus::Pending),
            "in_progress" => Some(TicketStatus::InProgress),
            "completed" => Some(TicketStatus::Completed),
            "cancelled" => Some(TicketStatus::Cancelled),
            _ => None,
        }
    }
}

/// Ticket priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            "urgent" => Some(Priority::Urgent),
            _ => None,
        }
    }
}

/// Service ticket row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ServiceTicket {
    pub id: i32,

    /// Owning customer
    pub customer_id: i32,

    /// Make, model, plate and similar
    pub vehicle_info: Option<String>,

    /// What the customer asked for
    pub description: String,

    /// Scheduled service day
    pub service_date: NaiveDate,

    /// See [`TicketStatus`]
    pub status: String,

    /// See [`Priority`]
    pub priority: String,

    #[serde(with = "rust_decimal::serde::float_option")]
    pub estimated_cost: Option<Decimal>,

    #[serde(with = "rust_decimal::serde::float_option")]
    pub actual_cost: Option<Decimal>,

    /// Set when the ticket reaches `completed`
    pub completed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Mechanic as embedded in a ticket response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MechanicSummary {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub specialization: Option<String>,
}

/// Inventory part as embedded in a ticket response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct InventoryPart {
    pub id: i32,
    pub name: String,

    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,

    pub quantity: i32,
}

/// A ticket with its assigned mechanics and parts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceTicketDetail {
    #[serde(flatten)]
    pub ticket: ServiceTicket,

    pub mechanics: Vec<MechanicSummary>,

    pub inventory_parts: Vec<InventoryPart>,
}

/// Input for creating a ticket
#[derive(Debug, Clone, Default)]
pub struct CreateServiceTicket {
    pub customer_id: i32,
    pub vehicle_info: Option<String>,
    pub description: String,

    /// Defaults to today (UTC)
    pub service_date: Option<NaiveDate>,

    pub status: TicketStatus,
    pub priority: Priority,
    pub estimated_cost: Option<Decimal>,
    pub actual_cost: Option<Decimal>,

    /// Mechanics to attach; ids that don't resolve are skipped
    pub mechanic_ids: Vec<i32>,
}

/// Input for updating a ticket; only non-None fields are written
#[derive(Debug, Clone, Default)]
pub struct UpdateServiceTicket {
    pub customer_id: Option<i32>,
    pub vehicle_info: Option<String>,
    pub description: Option<String>,
    pub service_date: Option<NaiveDate>,
    pub status: Option<TicketStatus>,
    pub priority: Option<Priority>,
    pub estimated_cost: Option<Decimal>,
    pub actual_cost: Option<Decimal>,
}

/// Filters for [`ServiceTicket::list`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    pub priority: Option<Priority>,
    pub customer_id: Option<i32>,
}

const COLUMNS: &str = "id, customer_id, vehicle_info, description, service_date, status, priority, \
                       estimated_cost, actual_cost, completed_at, created_at, updated_at";

const FILTER_CLAUSE: &str = r#"
    WHERE ($1::VARCHAR IS NULL OR status = $1)
      AND ($2::VARCHAR IS NULL OR priority = $2)
      AND ($3::INT IS NULL OR customer_id = $3)
"#;

#[derive(sqlx::FromRow)]
struct TicketMechanicRow {
    service_ticket_id: i32,
    #[sqlx(flatten)]
    mechanic: MechanicSummary,
}

#[derive(sqlx::FromRow)]
struct TicketPartRow {
    service_ticket_id: i32,
    #[sqlx(flatten)]
    part: InventoryPart,
}

impl ServiceTicket {
    /// Creates a ticket and attaches the resolvable mechanics in one transaction
    ///
    /// The caller is expected to have checked that the customer exists.
    pub async fn create(
        pool: &PgPool,
        data: CreateServiceTicket,
    ) -> Result<ServiceTicketDetail, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let ticket = sqlx::query_as::<_, ServiceTicket>(&format!(
            r#"
            INSERT INTO service_tickets
                (customer_id, vehicle_info, description, service_date, status, priority,
                 estimated_cost, actual_cost, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8,
                    CASE WHEN $5 = 'completed' THEN NOW() END)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(data.customer_id)
        .bind(data.vehicle_info)
        .bind(data.description)
        .bind(data.service_date.unwrap_or_else(|| Utc::now().date_naive()))
        .bind(data.status.as_str())
        .bind(data.priority.as_str())
        .bind(data.estimated_cost.map(|c| c.round_dp(2)))
        .bind(data.actual_cost.map(|c| c.round_dp(2)))
        .fetch_one(&mut *tx)
        .await?;

        if !data.mechanic_ids.is_empty() {
            let attached: Vec<(i32,)> = sqlx::query_as(
                r#"
                INSERT INTO service_ticket_mechanics (service_ticket_id, mechanic_id)
                SELECT $1, m.id FROM mechanics m WHERE m.id = ANY($2)
                RETURNING mechanic_id
                "#,
            )
            .bind(ticket.id)
            .bind(&data.mechanic_ids)
            .fetch_all(&mut *tx)
            .await?;

            let skipped: Vec<i32> = data
                .mechanic_ids
                .iter()
                .copied()
                .filter(|id| !attached.iter().any(|(a,)| a == id))
                .collect();

            if !skipped.is_empty() {
                tracing::warn!(
                    ticket_id = ticket.id,
                    ?skipped,
                    "Skipped unknown mechanic ids while creating ticket"
                );
            }
        }

        let detail = Self::attach_summaries(&mut tx, vec![ticket]).await?;

        tx.commit().await?;

        detail.into_iter().next().ok_or(sqlx::Error::RowNotFound)
    }

    /// Finds a ticket row by ID
    pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        let ticket = sqlx::query_as::<_, ServiceTicket>(&format!(
            "SELECT {COLUMNS} FROM service_tickets WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(ticket)
    }

    /// Finds a ticket with its mechanics and parts
    pub async fn find_detail(
        pool: &PgPool,
        id: i32,
    ) -> Result<Option<ServiceTicketDetail>, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        Self::find_detail_with(&mut conn, id).await
    }

    /// Same as [`find_detail`](Self::find_detail) on an existing connection or transaction
    pub async fn find_detail_with(
        conn: &mut PgConnection,
        id: i32,
    ) -> Result<Option<ServiceTicketDetail>, sqlx::Error> {
        let ticket = sqlx::query_as::<_, ServiceTicket>(&format!(
            "SELECT {COLUMNS} FROM service_tickets WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        match ticket {
            Some(ticket) => Ok(Self::attach_summaries(conn, vec![ticket]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Lists tickets matching `filter`, newest first
    pub async fn list(
        pool: &PgPool,
        filter: TicketFilter,
        page: Page,
    ) -> Result<Vec<ServiceTicketDetail>, sqlx::Error> {
        let mut conn = pool.acquire().await?;

        let tickets = sqlx::query_as::<_, ServiceTicket>(&format!(
            "SELECT {COLUMNS} FROM service_tickets {FILTER_CLAUSE} ORDER BY id DESC LIMIT $4 OFFSET $5"
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.priority.map(|p| p.as_str()))
        .bind(filter.customer_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&mut *conn)
        .await?;

        Self::attach_summaries(&mut conn, tickets).await
    }

    /// Counts tickets matching `filter`
    pub async fn count(pool: &PgPool, filter: TicketFilter) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as(&format!("SELECT COUNT(*) FROM service_tickets {FILTER_CLAUSE}"))
                .bind(filter.status.map(|s| s.as_str()))
                .bind(filter.priority.map(|p| p.as_str()))
                .bind(filter.customer_id)
                .fetch_one(pool)
                .await?;

        Ok(count)
    }

    /// Lists every ticket owned by a customer, newest first
    pub async fn list_for_customer(
        pool: &PgPool,
        customer_id: i32,
    ) -> Result<Vec<ServiceTicketDetail>, sqlx::Error> {
        let mut conn = pool.acquire().await?;

        let tickets = sqlx::query_as::<_, ServiceTicket>(&format!(
            "SELECT {COLUMNS} FROM service_tickets WHERE customer_id = $1 ORDER BY id DESC"
        ))
        .bind(customer_id)
        .fetch_all(&mut *conn)
        .await?;

        Self::attach_summaries(&mut conn, tickets).await
    }

    /// Updates a ticket
    ///
    /// Returns None if the ticket doesn't exist. The caller is expected to
    /// have checked a new `customer_id`.
    pub async fn update(
        pool: &PgPool,
        id: i32,
        data: UpdateServiceTicket,
    ) -> Result<Option<ServiceTicketDetail>, sqlx::Error> {
        let mut query = String::from("UPDATE service_tickets SET updated_at = NOW()");
        let mut bind_count = 1;

        let mut push = |column: &str, present: bool| -> usize {
            if present {
                bind_count += 1;
                query.push_str(&format!(", {} = ${}", column, bind_count));
            }
            bind_count
        };
        push("customer_id", data.customer_id.is_some());
        push("vehicle_info", data.vehicle_info.is_some());
        push("description", data.description.is_some());
        push("service_date", data.service_date.is_some());
        let status_param = push("status", data.status.is_some());
        push("priority", data.priority.is_some());
        push("estimated_cost", data.estimated_cost.is_some());
        push("actual_cost", data.actual_cost.is_some());

        if data.status.is_some() {
            // `status` on the right-hand side is the pre-update value
            query.push_str(&format!(
                ", completed_at = CASE \
                     WHEN ${p} = 'completed' AND status <> 'completed' THEN NOW() \
                     WHEN ${p} <> 'completed' THEN NULL \
                     ELSE completed_at END",
                p = status_param
            ));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {COLUMNS}"));

        let mut q = sqlx::query_as::<_, ServiceTicket>(&query).bind(id);

        if let Some(customer_id) = data.customer_id {
            q = q.bind(customer_id);
        }
        if let Some(vehicle_info) = data.vehicle_info {
            q = q.bind(vehicle_info);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(service_date) = data.service_date {
            q = q.bind(service_date);
        }
        if let Some(status) = data.status {
            q = q.bind(status.as_str());
        }
        if let Some(priority) = data.priority {
            q = q.bind(priority.as_str());
        }
        if let Some(cost) = data.estimated_cost {
            q = q.bind(cost.round_dp(2));
        }
        if let Some(cost) = data.actual_cost {
            q = q.bind(cost.round_dp(2));
        }

        let mut conn = pool.acquire().await?;

        match q.fetch_optional(&mut *conn).await? {
            Some(ticket) => Ok(Self::attach_summaries(&mut conn, vec![ticket]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Deletes a ticket and its association rows
    ///
    /// Returns false if the ticket doesn't exist.
    pub async fn delete(pool: &PgPool, id: i32) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM service_ticket_mechanics WHERE service_ticket_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM service_ticket_inventory WHERE service_ticket_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM service_tickets WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        tx.commit().await?;

        Ok(true)
    }

    /// Loads mechanics and parts for `tickets` with one query each
    async fn attach_summaries(
        conn: &mut PgConnection,
        tickets: Vec<ServiceTicket>,
    ) -> Result<Vec<ServiceTicketDetail>, sqlx::Error> {
        if tickets.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = tickets.iter().map(|t| t.id).collect();

        let mechanic_rows = sqlx::query_as::<_, TicketMechanicRow>(
            r#"
            SELECT stm.service_ticket_id, m.id, m.name, m.email, m.specialization
            FROM service_ticket_mechanics stm
            JOIN mechanics m ON m.id = stm.mechanic_id
            WHERE stm.service_ticket_id = ANY($1)
            ORDER BY m.id
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await?;

        let part_rows = sqlx::query_as::<_, TicketPartRow>(
            r#"
            SELECT sti.service_ticket_id, i.id, i.name, i.price, i.quantity
            FROM service_ticket_inventory sti
            JOIN inventory_items i ON i.id = sti.inventory_item_id
            WHERE sti.service_ticket_id = ANY($1)
            ORDER BY i.id
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await?;

        let mut mechanics: HashMap<i32, Vec<MechanicSummary>> = HashMap::new();
        for row in mechanic_rows {
            mechanics.entry(row.service_ticket_id).or_default().push(row.mechanic);
        }

        let mut parts: HashMap<i32, Vec<InventoryPart>> = HashMap::new();
        for row in part_rows {
            parts.entry(row.service_ticket_id).or_default().push(row.part);
        }

        Ok(tickets
            .into_iter()
            .map(|ticket| ServiceTicketDetail {
                mechanics: mechanics.remove(&ticket.id).unwrap_or_default(),
                inventory_parts: parts.remove(&ticket.id).unwrap_or_default(),
                ticket,
            })
            .collect())
    }
}
