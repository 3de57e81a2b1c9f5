/// Integration tests for the ticket assignment workflow
///
/// These tests require a running PostgreSQL database and are skipped when
/// `DATABASE_URL` is not set.

use rust_decimal::Decimal;
use shopfloor_shared::assignment::{
    assign_one, edit_batch, remove_one, AssignmentError, AssociationKind, BatchRequest,
    BatchVerdict, Summary,
};
use shopfloor_shared::db::migrations::run_migrations;
use shopfloor_shared::db::pool::{create_pool, DatabaseConfig};
use shopfloor_shared::models::customer::{CreateCustomer, Customer};
use shopfloor_shared::models::mechanic::{CreateMechanic, Mechanic};
use shopfloor_shared::models::service_ticket::{CreateServiceTicket, ServiceTicket};
use sqlx::PgPool;
use uuid::Uuid;

const MISSING_ID: i32 = 999_999_999;

async fn setup() -> Option<PgPool> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = create_pool(DatabaseConfig::new(url))
        .await
        .expect("Failed to create pool");
    run_migrations(&pool).await.expect("Migrations failed");
    Some(pool)
}

async fn ticket(pool: &PgPool, mechanic_ids: Vec<i32>) -> i32 {
    let customer = Customer::create(
        pool,
        CreateCustomer {
            first_name: "Test".to_string(),
            last_name: "Owner".to_string(),
            email: format!("owner-{}@example.com", Uuid::new_v4()),
            phone_number: None,
            address: None,
            password_hash: None,
        },
    )
    .await
    .expect("Failed to create customer");

    ServiceTicket::create(
        pool,
        CreateServiceTicket {
            customer_id: customer.id,
            description: "Timing belt".to_string(),
            mechanic_ids,
            ..Default::default()
        },
    )
    .await
    .expect("Failed to create ticket")
    .ticket
    .id
}

async fn mechanic(pool: &PgPool, name: &str) -> i32 {
    Mechanic::create(
        pool,
        CreateMechanic {
            name: name.to_string(),
            email: format!("mech-{}@example.com", Uuid::new_v4()),
            phone: None,
            salary: Decimal::new(4500000, 2),
            is_active: None,
            specialization: None,
        },
    )
    .await
    .expect("Failed to create mechanic")
    .id
}

fn attached(ticket: &shopfloor_shared::models::service_ticket::ServiceTicketDetail) -> Vec<i32> {
    let mut ids: Vec<i32> = ticket.mechanics.iter().map(|m| m.id).collect();
    ids.sort_unstable();
    ids
}

#[tokio::test]
async fn test_batch_applies_removals_before_additions() {
    let Some(pool) = setup().await else { return };

    let a = mechanic(&pool, "Avery").await;
    let b = mechanic(&pool, "Blake").await;
    let ticket_id = ticket(&pool, vec![a]).await;

    let outcome = edit_batch(
        &pool,
        AssociationKind::Mechanic,
        ticket_id,
        &BatchRequest {
            add_ids: vec![a, b],
            remove_ids: vec![a],
        },
        Summary::Changes,
    )
    .await
    .expect("Batch failed");

    assert_eq!(outcome.verdict, BatchVerdict::Applied);
    assert_eq!(outcome.plan.changes_made.len(), 3);
    assert_eq!(attached(&outcome.ticket), {
        let mut ids = vec![a, b];
        ids.sort_unstable();
        ids
    });
}

#[tokio::test]
async fn test_duplicate_id_yields_one_change_and_one_error() {
    let Some(pool) = setup().await else { return };

    let a = mechanic(&pool, "Casey").await;
    let ticket_id = ticket(&pool, vec![]).await;

    let outcome = edit_batch(
        &pool,
        AssociationKind::Mechanic,
        ticket_id,
        &BatchRequest {
            add_ids: vec![a, a],
            remove_ids: vec![],
        },
        Summary::Changes,
    )
    .await
    .expect("Batch failed");

    assert_eq!(outcome.verdict, BatchVerdict::PartialSuccess);
    assert_eq!(outcome.plan.changes_made.len(), 1);
    assert_eq!(
        outcome.plan.errors,
        vec![format!("Mechanic Casey (ID: {}) was already assigned to this ticket", a)]
    );
    assert_eq!(attached(&outcome.ticket), vec![a]);
}

#[tokio::test]
async fn test_rejected_batch_writes_nothing() {
    let Some(pool) = setup().await else { return };

    let a = mechanic(&pool, "Devon").await;
    let ticket_id = ticket(&pool, vec![a]).await;

    let outcome = edit_batch(
        &pool,
        AssociationKind::Mechanic,
        ticket_id,
        &BatchRequest {
            add_ids: vec![MISSING_ID],
            remove_ids: vec![MISSING_ID],
        },
        Summary::Changes,
    )
    .await
    .expect("Batch failed");

    assert_eq!(outcome.verdict, BatchVerdict::Rejected);
    assert_eq!(outcome.plan.errors.len(), 2);
    assert_eq!(attached(&outcome.ticket), vec![a]);
}

#[tokio::test]
async fn test_batch_on_missing_ticket() {
    let Some(pool) = setup().await else { return };

    let result = edit_batch(
        &pool,
        AssociationKind::Inventory,
        MISSING_ID,
        &BatchRequest::default(),
        Summary::Additions,
    )
    .await;

    assert!(matches!(result, Err(AssignmentError::TicketNotFound)));
}

#[tokio::test]
async fn test_single_assignment_round_trip() {
    let Some(pool) = setup().await else { return };

    let a = mechanic(&pool, "Emery").await;
    let ticket_id = ticket(&pool, vec![]).await;

    let added = assign_one(&pool, AssociationKind::Mechanic, ticket_id, a)
        .await
        .expect("Assign failed");
    assert_eq!(attached(&added.ticket), vec![a]);
    assert_eq!(
        added.message,
        format!("Mechanic Emery assigned to service ticket {}", ticket_id)
    );

    assert!(matches!(
        assign_one(&pool, AssociationKind::Mechanic, ticket_id, a).await,
        Err(AssignmentError::AlreadyAssigned(AssociationKind::Mechanic))
    ));

    let removed = remove_one(&pool, AssociationKind::Mechanic, ticket_id, a)
        .await
        .expect("Remove failed");
    assert!(removed.ticket.mechanics.is_empty());

    assert!(matches!(
        remove_one(&pool, AssociationKind::Mechanic, ticket_id, a).await,
        Err(AssignmentError::NotAssigned(AssociationKind::Mechanic))
    ));

    assert!(matches!(
        assign_one(&pool, AssociationKind::Mechanic, ticket_id, MISSING_ID).await,
        Err(AssignmentError::EntityNotFound(AssociationKind::Mechanic))
    ));
}

#[tokio::test]
async fn test_deleting_mechanic_detaches_it() {
    let Some(pool) = setup().await else { return };

    let a = mechanic(&pool, "Finley").await;
    let ticket_id = ticket(&pool, vec![a]).await;

    assert!(Mechanic::delete(&pool, a).await.expect("Delete failed"));

    let detail = ServiceTicket::find_detail(&pool, ticket_id)
        .await
        .expect("Query failed")
        .expect("Ticket should survive");
    assert!(detail.mechanics.is_empty());
}
