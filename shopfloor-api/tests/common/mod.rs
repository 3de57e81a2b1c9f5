/// Common test utilities for integration tests
///
/// These tests need a PostgreSQL database reachable through `DATABASE_URL`.
/// When the variable is unset every test returns early.
///
/// Records are created with unique emails so tests can share one database
/// and run in parallel.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{json, Value};
use shopfloor_api::app::{build_router, AppState};
use shopfloor_api::config::Config;
use shopfloor_shared::cache::ListingCache;
use shopfloor_shared::db::migrations::run_migrations;
use sqlx::PgPool;
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: PgPool,
    pub app: axum::Router,
}

impl TestContext {
    /// Connects, migrates and builds a router; None without `DATABASE_URL`
    pub async fn new() -> anyhow::Result<Option<Self>> {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set, skipping");
            return Ok(None);
        };

        let db = PgPool::connect(&url).await?;
        run_migrations(&db).await?;

        let config = Config::for_testing(url, TEST_SECRET);
        let cache = ListingCache::in_memory(Duration::from_secs(60));
        let app = build_router(AppState::new(db.clone(), config, cache));

        Ok(Some(Self { db, app }))
    }

    /// Sends a request and returns status plus JSON body (`Null` when empty)
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, json)
    }

    /// Creates a customer with a unique email and returns its JSON
    pub async fn create_customer(&self, password: Option<&str>) -> Value {
        let mut body = json!({
            "first_name": "Test",
            "last_name": "Customer",
            "email": unique_email("customer"),
            "phone_number": "555-0100",
            "address": "1 Garage Lane"
        });
        if let Some(password) = password {
            body["password"] = json!(password);
        }

        let (status, customer) = self
            .send(Method::POST, "/customers/", Some(body), None)
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", customer);
        customer
    }

    /// Creates a mechanic and returns its id
    pub async fn create_mechanic(&self, name: &str) -> i64 {
        let (status, mechanic) = self
            .send(
                Method::POST,
                "/mechanics/",
                Some(json!({
                    "name": name,
                    "email": unique_email("mechanic"),
                    "salary": 50000
                })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", mechanic);
        mechanic["id"].as_i64().unwrap()
    }

    /// Creates an inventory item and returns its id
    pub async fn create_item(&self, name: &str) -> i64 {
        let (status, item) = self
            .send(
                Method::POST,
                "/inventory/",
                Some(json!({ "name": name, "quantity": 10, "price": 19.99 })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", item);
        item["id"].as_i64().unwrap()
    }

    /// Creates a ticket for `customer_id` and returns its JSON
    pub async fn create_ticket(&self, customer_id: i64, mechanic_ids: &[i64]) -> Value {
        let (status, ticket) = self
            .send(
                Method::POST,
                "/service-tickets/",
                Some(json!({
                    "customer_id": customer_id,
                    "description": "Brakes squeal",
                    "vehicle_info": "2015 Civic",
                    "mechanic_ids": mechanic_ids
                })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", ticket);
        ticket
    }
}

/// Email that no other test run will produce
pub fn unique_email(prefix: &str) -> String {
    format!("{}-{}@example.com", prefix, Uuid::new_v4())
}

/// Mechanic ids embedded in a ticket body, sorted
pub fn mechanic_ids(ticket: &Value) -> Vec<i64> {
    let mut ids: Vec<i64> = ticket["mechanics"]
        .as_array()
        .map(|m| m.iter().filter_map(|m| m["id"].as_i64()).collect())
        .unwrap_or_default();
    ids.sort_unstable();
    ids
}
