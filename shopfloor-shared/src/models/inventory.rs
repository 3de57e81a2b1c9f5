/// Inventory item model and database operations
///
/// Items are attached to service tickets as parts through the
/// `service_ticket_inventory` association table.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE inventory_items (
///     id SERIAL PRIMARY KEY,
///     name VARCHAR(100) NOT NULL,
///     description TEXT,
///     quantity INTEGER NOT NULL DEFAULT 0 CHECK (quantity >= 0),
///     price NUMERIC(10, 2) NOT NULL CHECK (price >= 0),
///     supplier VARCHAR(100),
///     category VARCHAR(50),
///     reorder_level INTEGER NOT NULL DEFAULT 5 CHECK (reorder_level >= 0),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::Page;

/// Default reorder threshold for new items
pub const DEFAULT_REORDER_LEVEL: i32 = 5;

/// Inventory item model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct InventoryItem {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,

    /// Units in stock
    pub quantity: i32,

    /// Unit price, serialized as a JSON number
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,

    pub supplier: Option<String>,
    pub category: Option<String>,

    /// Stock level at which the item should be reordered
    pub reorder_level: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Whether stock has fallen to the reorder threshold
    pub fn needs_reorder(&self) -> bool {
        self.quantity <= self.reorder_level
    }
}

/// Input for creating a new inventory item
#[derive(Debug, Clone)]
pub struct CreateInventoryItem {
    pub name: String,
    pub description: Option<String>,
    pub quantity: i32,

    /// Rounded to 2 places before insert
    pub price: Decimal,

    pub supplier: Option<String>,
    pub category: Option<String>,

    /// Defaults to [`DEFAULT_REORDER_LEVEL`]
    pub reorder_level: Option<i32>,
}

/// Input for updating an inventory item; only non-None fields are written
#[derive(Debug, Clone, Default)]
pub struct UpdateInventoryItem {
    pub name: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<i32>,
    pub price: Option<Decimal>,
    pub supplier: Option<String>,
    pub category: Option<String>,
    pub reorder_level: Option<i32>,
}

const COLUMNS: &str =
    "id, name, description, quantity, price, supplier, category, reorder_level, created_at, updated_at";

impl InventoryItem {
    /// Creates a new inventory item
    pub async fn create(pool: &PgPool, data: CreateInventoryItem) -> Result<Self, sqlx::Error> {
        let item = sqlx::query_as::<_, InventoryItem>(&format!(
            r#"
            INSERT INTO inventory_items (name, description, quantity, price, supplier, category, reorder_level)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(data.name)
        .bind(data.description)
        .bind(data.quantity)
        .bind(data.price.round_dp(2))
        .bind(data.supplier)
        .bind(data.category)
        .bind(data.reorder_level.unwrap_or(DEFAULT_REORDER_LEVEL))
        .fetch_one(pool)
        .await?;

        Ok(item)
    }

    /// Finds an item by ID
    pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        let item = sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {COLUMNS} FROM inventory_items WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(item)
    }

    /// Lists items ordered by ID
    pub async fn list(pool: &PgPool, page: Page) -> Result<Vec<Self>, sqlx::Error> {
        let items = sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {COLUMNS} FROM inventory_items ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

        Ok(items)
    }

    /// Counts all items
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM inventory_items")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    /// Updates an item
    ///
    /// Returns None if the item doesn't exist.
    pub async fn update(
        pool: &PgPool,
        id: i32,
        data: UpdateInventoryItem,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE inventory_items SET updated_at = NOW()");
        let mut bind_count = 1;

        for (column, present) in [
            ("name", data.name.is_some()),
            ("description", data.description.is_some()),
            ("quantity", data.quantity.is_some()),
            ("price", data.price.is_some()),
            ("supplier", data.supplier.is_some()),
            ("category", data.category.is_some()),
            ("reorder_level", data.reorder_level.is_some()),
        ] {
            if present {
                bind_count += 1;
                query.push_str(&format!(", {} = ${}", column, bind_count));
            }
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {COLUMNS}"));

        let mut q = sqlx::query_as::<_, InventoryItem>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(quantity) = data.quantity {
            q = q.bind(quantity);
        }
        if let Some(price) = data.price {
            q = q.bind(price.round_dp(2));
        }
        if let Some(supplier) = data.supplier {
            q = q.bind(supplier);
        }
        if let Some(category) = data.category {
            q = q.bind(category);
        }
        if let Some(reorder_level) = data.reorder_level {
            q = q.bind(reorder_level);
        }

        let item = q.fetch_optional(pool).await?;

        Ok(item)
    }

    /// Deletes an item and detaches it from every ticket
    ///
    /// Returns false if the item doesn't exist.
    pub async fn delete(pool: &PgPool, id: i32) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM service_ticket_inventory WHERE inventory_item_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM inventory_items WHERE id = $1")
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn item(quantity: i32, reorder_level: i32) -> InventoryItem {
        InventoryItem {
            id: 7,
            name: "Brake pad".to_string(),
            description: None,
            quantity,
            price: Decimal::from_str("49.99").unwrap(),
            supplier: Some("Acme".to_string()),
            category: Some("brakes".to_string()),
            reorder_level,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_needs_reorder() {
        assert!(item(5, 5).needs_reorder());
        assert!(item(0, 5).needs_reorder());
        assert!(!item(6, 5).needs_reorder());
    }

    #[test]
    fn test_price_serializes_as_number() {
        let json = serde_json::to_value(item(10, 5)).unwrap();
        assert_eq!(json["price"], serde_json::json!(49.99));
        assert_eq!(json["quantity"], 10);
    }

    #[test]
    fn test_price_rounding() {
        let price = Decimal::from_str("19.999").unwrap().round_dp(2);
        assert_eq!(price.to_string(), "20.00");
    }
}
