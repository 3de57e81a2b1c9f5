/// Customer model and database operations
///
/// Customers own service tickets and may hold one membership. A customer
/// created with a password can log in and receive an access token.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE customers (
///     id SERIAL PRIMARY KEY,
///     first_name VARCHAR(50) NOT NULL,
///     last_name VARCHAR(50) NOT NULL,
///     email VARCHAR(120) NOT NULL UNIQUE,
///     phone_number VARCHAR(20),
///     address TEXT,
///     password_hash VARCHAR(255),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::Page;

/// Customer model
///
/// `password_hash` is loaded from the database but never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Customer {
    /// Customer ID
    pub id: i32,

    /// Given name
    pub first_name: String,

    /// Family name
    pub last_name: String,

    /// Email address (unique among customers)
    pub email: String,

    /// Contact phone number
    pub phone_number: Option<String>,

    /// Postal address
    pub address: Option<String>,

    /// Argon2id PHC hash, None for customers without a login
    #[serde(skip)]
    pub password_hash: Option<String>,

    /// When the customer was created
    pub created_at: DateTime<Utc>,

    /// When the customer was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new customer
#[derive(Debug, Clone)]
pub struct CreateCustomer {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,

    /// Already-hashed password
    pub password_hash: Option<String>,
}

/// Input for updating a customer
///
/// Only non-None fields are written.
#[derive(Debug, Clone, Default)]
pub struct UpdateCustomer {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub password_hash: Option<String>,
}

/// Outcome of [`Customer::delete`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerDeletion {
    /// Customer and membership row removed
    Deleted,

    /// No customer with that ID
    NotFound,

    /// Customer still owns this many service tickets
    HasTickets(i64),
}

const COLUMNS: &str =
    "id, first_name, last_name, email, phone_number, address, password_hash, created_at, updated_at";

impl Customer {
    /// Creates a new customer
    ///
    /// # Errors
    ///
    /// Returns a database error if the email is already taken (unique
    /// constraint `customers_email_key`) or the query fails.
    pub async fn create(pool: &PgPool, data: CreateCustomer) -> Result<Self, sqlx::Error> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            r#"
            INSERT INTO customers (first_name, last_name, email, phone_number, address, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(data.email)
        .bind(data.phone_number)
        .bind(data.address)
        .bind(data.password_hash)
        .fetch_one(pool)
        .await?;

        Ok(customer)
    }

    /// Finds a customer by ID
    pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {COLUMNS} FROM customers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(customer)
    }

    /// Finds a customer by email (exact match)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {COLUMNS} FROM customers WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(customer)
    }

    /// Whether a customer with this ID exists
    pub async fn exists(pool: &PgPool, id: i32) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM customers WHERE id = $1)")
                .bind(id)
                .fetch_one(pool)
                .await?;

        Ok(exists)
    }

    /// Whether `email` belongs to a customer other than `exclude_id`
    pub async fn email_taken(
        pool: &PgPool,
        email: &str,
        exclude_id: Option<i32>,
    ) -> Result<bool, sqlx::Error> {
        let (taken,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM customers WHERE email = $1 AND ($2::INT IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(exclude_id)
        .fetch_one(pool)
        .await?;

        Ok(taken)
    }

    /// Lists customers ordered by ID
    pub async fn list(pool: &PgPool, page: Page) -> Result<Vec<Self>, sqlx::Error> {
        let customers = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {COLUMNS} FROM customers ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

        Ok(customers)
    }

    /// Counts all customers
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM customers")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    /// Updates a customer
    ///
    /// Returns None if the customer doesn't exist.
    pub async fn update(
        pool: &PgPool,
        id: i32,
        data: UpdateCustomer,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE customers SET updated_at = NOW()");
        let mut bind_count = 1;

        for (column, present) in [
            ("first_name", data.first_name.is_some()),
            ("last_name", data.last_name.is_some()),
            ("email", data.email.is_some()),
            ("phone_number", data.phone_number.is_some()),
            ("address", data.address.is_some()),
            ("password_hash", data.password_hash.is_some()),
        ] {
            if present {
                bind_count += 1;
                query.push_str(&format!(", {} = ${}", column, bind_count));
            }
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {COLUMNS}"));

        let mut q = sqlx::query_as::<_, Customer>(&query).bind(id);

        for value in [
            data.first_name,
            data.last_name,
            data.email,
            data.phone_number,
            data.address,
            data.password_hash,
        ]
        .into_iter()
        .flatten()
        {
            q = q.bind(value);
        }

        let customer = q.fetch_optional(pool).await?;

        Ok(customer)
    }

    /// Deletes a customer together with its membership
    ///
    /// A customer that still owns service tickets is left untouched.
    pub async fn delete(pool: &PgPool, id: i32) -> Result<CustomerDeletion, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let found: Option<(i32,)> = sqlx::query_as("SELECT id FROM customers WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        if found.is_none() {
            return Ok(CustomerDeletion::NotFound);
        }

        let (tickets,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM service_tickets WHERE customer_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

        if tickets > 0 {
            return Ok(CustomerDeletion::HasTickets(tickets));
        }

        sqlx::query("DELETE FROM members WHERE customer_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(CustomerDeletion::Deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Customer {
        Customer {
            id: 1,
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone_number: Some("555-0100".to_string()),
            address: None,
            password_hash: Some("$argon2id$v=19$secret".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let json = serde_json::to_value(sample()).unwrap();

        assert!(json.get("password_hash").is_none());
        assert!(json.get("password").is_none());
        assert_eq!(json["email"], "ada@example.com");
        assert_eq!(json["phone_number"], "555-0100");
        assert!(json["address"].is_null());
    }

    #[test]
    fn test_update_customer_default() {
        let update = UpdateCustomer::default();
        assert!(update.first_name.is_none());
        assert!(update.email.is_none());
        assert!(update.password_hash.is_none());
    }
}
