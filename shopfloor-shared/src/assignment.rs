/// Ticket ↔ mechanic / inventory assignment workflow
///
/// One engine serves both association types. A batch request is turned into
/// a [`BatchPlan`] by [`plan`], which is pure: it only looks at a
/// [`Snapshot`] of the ticket's current association set and the names of the
/// requested entities. The Postgres side ([`edit_batch`], [`assign_one`],
/// [`remove_one`]) takes the snapshot and applies the plan inside a single
/// transaction, so a batch either lands completely or not at all.
///
/// # Batch semantics
///
/// - Removals are planned strictly before additions, each in list order.
/// - Every requested id produces exactly one entry in either
///   `changes_made` or `errors`; nothing short-circuits.
/// - Planning works on the evolving set, so an id listed twice yields one
///   change and one error.
///
/// | changes | errors | verdict                  | status |
/// |---------|--------|--------------------------|--------|
/// | yes     | no     | [`BatchVerdict::Applied`]        | 200 |
/// | yes     | yes    | [`BatchVerdict::PartialSuccess`] | 207 |
/// | no      | yes    | [`BatchVerdict::Rejected`]       | 400 |
/// | no      | no     | [`BatchVerdict::NoChanges`]      | 200 |
///
/// # Example
///
/// ```
/// use shopfloor_shared::assignment::{plan, AssociationKind, BatchRequest, BatchVerdict, Snapshot};
///
/// let mut snapshot = Snapshot::default();
/// snapshot.names.insert(1, "Grace".to_string());
///
/// let request = BatchRequest { add_ids: vec![1, 999], remove_ids: vec![] };
/// let plan = plan(AssociationKind::Mechanic, &request, &snapshot);
///
/// assert_eq!(plan.attach, vec![1]);
/// assert_eq!(plan.errors, vec!["Mechanic with ID 999 not found".to_string()]);
/// assert_eq!(plan.verdict(), BatchVerdict::PartialSuccess);
/// ```

use std::collections::{HashMap, HashSet};

use axum::http::StatusCode;
use serde::Serialize;
use serde_json::Value;
use sqlx::{PgConnection, PgPool};

use crate::models::service_ticket::{ServiceTicket, ServiceTicketDetail};

/// Entity type linked to a ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssociationKind {
    /// `service_ticket_mechanics`
    Mechanic,

    /// `service_ticket_inventory`
    Inventory,
}

impl AssociationKind {
    /// Capitalized label used at the start of messages
    pub fn label(&self) -> &'static str {
        match self {
            AssociationKind::Mechanic => "Mechanic",
            AssociationKind::Inventory => "Inventory item",
        }
    }

    /// Lowercase label used inside messages
    pub fn noun(&self) -> &'static str {
        match self {
            AssociationKind::Mechanic => "mechanic",
            AssociationKind::Inventory => "inventory item",
        }
    }

    /// Short label for summaries and list-field errors
    pub fn short(&self) -> &'static str {
        match self {
            AssociationKind::Mechanic => "mechanic",
            AssociationKind::Inventory => "inventory",
        }
    }

    /// Past participle for an entity already on the ticket
    pub fn attached_verb(&self) -> &'static str {
        match self {
            AssociationKind::Mechanic => "assigned",
            AssociationKind::Inventory => "added",
        }
    }

    fn association_table(&self) -> &'static str {
        match self {
            AssociationKind::Mechanic => "service_ticket_mechanics",
            AssociationKind::Inventory => "service_ticket_inventory",
        }
    }

    fn entity_table(&self) -> &'static str {
        match self {
            AssociationKind::Mechanic => "mechanics",
            AssociationKind::Inventory => "inventory_items",
        }
    }

    fn foreign_key(&self) -> &'static str {
        match self {
            AssociationKind::Mechanic => "mechanic_id",
            AssociationKind::Inventory => "inventory_item_id",
        }
    }
}

/// Ids to attach and detach in one batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchRequest {
    pub add_ids: Vec<i32>,
    pub remove_ids: Vec<i32>,
}

impl BatchRequest {
    /// Reads `add_ids` / `remove_ids` from a JSON body
    pub fn from_json(kind: AssociationKind, body: &Value) -> Result<Self, String> {
        require_input(body)?;
        Ok(Self {
            add_ids: parse_id_list(kind, body, "add_ids")?,
            remove_ids: parse_id_list(kind, body, "remove_ids")?,
        })
    }

    /// Total number of ids requested
    pub fn len(&self) -> usize {
        self.add_ids.len() + self.remove_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.add_ids.is_empty() && self.remove_ids.is_empty()
    }

    fn requested_ids(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self.remove_ids.iter().chain(&self.add_ids).copied().collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

/// Rejects a body with nothing in it (`null`, `{}`, `[]`, `""`, `0`, `false`)
pub fn require_input(body: &Value) -> Result<(), String> {
    let blank = match body {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    };

    if blank {
        Err("No input data provided".to_string())
    } else {
        Ok(())
    }
}

/// Reads `field` from `body` as a list of entity ids
///
/// An absent or null field is an empty list. Anything that is not an array
/// of integers fits for `i32` is rejected with
/// `"<field> must be a list of <entity> IDs"`.
pub fn parse_id_list(kind: AssociationKind, body: &Value, field: &str) -> Result<Vec<i32>, String> {
    let invalid = || format!("{} must be a list of {} IDs", field, kind.short());

    match body.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_i64()
                    .and_then(|id| i32::try_from(id).ok())
                    .ok_or_else(invalid)
            })
            .collect(),
        Some(_) => Err(invalid()),
    }
}

/// Current association set of a ticket plus names of the requested entities
///
/// `names` only holds entities that exist; a missing id is "not found".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub attached: HashSet<i32>,
    pub names: HashMap<i32, String>,
}

/// Result of planning a batch against a snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchPlan {
    /// Ids to insert into the association table
    pub attach: Vec<i32>,

    /// Ids to delete from the association table
    pub detach: Vec<i32>,

    /// One message per planned change, in processing order
    pub changes_made: Vec<String>,

    /// One message per rejected id, in processing order
    pub errors: Vec<String>,
}

/// Aggregate outcome of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchVerdict {
    /// Every requested change was made
    Applied,

    /// Some changes were made, some ids were rejected
    PartialSuccess,

    /// Every id was rejected; nothing was written
    Rejected,

    /// The request was empty
    NoChanges,
}

impl BatchVerdict {
    /// HTTP status for the verdict
    pub fn status_code(&self) -> StatusCode {
        match self {
            BatchVerdict::Applied | BatchVerdict::NoChanges => StatusCode::OK,
            BatchVerdict::PartialSuccess => StatusCode::MULTI_STATUS,
            BatchVerdict::Rejected => StatusCode::BAD_REQUEST,
        }
    }
}

impl BatchPlan {
    /// Whether anything has to be written
    pub fn has_changes(&self) -> bool {
        !self.changes_made.is_empty()
    }

    pub fn verdict(&self) -> BatchVerdict {
        match (self.changes_made.is_empty(), self.errors.is_empty()) {
            (false, true) => BatchVerdict::Applied,
            (false, false) => BatchVerdict::PartialSuccess,
            (true, false) => BatchVerdict::Rejected,
            (true, true) => BatchVerdict::NoChanges,
        }
    }
}

/// Plans `request` against `snapshot`
pub fn plan(kind: AssociationKind, request: &BatchRequest, snapshot: &Snapshot) -> BatchPlan {
    let mut current = snapshot.attached.clone();
    let mut out = BatchPlan::default();

    for &id in &request.remove_ids {
        let Some(name) = snapshot.names.get(&id) else {
            out.errors.push(format!("{} with ID {} not found", kind.label(), id));
            continue;
        };

        if current.remove(&id) {
            out.detach.push(id);
            out.changes_made
                .push(format!("Removed {} {} (ID: {})", kind.noun(), name, id));
        } else {
            out.errors.push(format!(
                "{} {} (ID: {}) was not assigned to this ticket",
                kind.label(),
                name,
                id
            ));
        }
    }

    for &id in &request.add_ids {
        let Some(name) = snapshot.names.get(&id) else {
            out.errors.push(format!("{} with ID {} not found", kind.label(), id));
            continue;
        };

        if current.insert(id) {
            out.attach.push(id);
            out.changes_made
                .push(format!("Added {} {} (ID: {})", kind.noun(), name, id));
        } else {
            out.errors.push(format!(
                "{} {} (ID: {}) was already {} to this ticket",
                kind.label(),
                name,
                id,
                kind.attached_verb()
            ));
        }
    }

    out
}

/// Wording of the batch summary message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Summary {
    /// "Processed N mechanic changes for ticket T"
    Changes,

    /// "Processed N inventory additions for ticket T"
    Additions,

    /// "Processed N inventory removals for ticket T"
    Removals,
}

impl Summary {
    fn message(&self, kind: AssociationKind, count: usize, ticket_id: i32) -> String {
        let what = match self {
            Summary::Changes => "changes",
            Summary::Additions => "additions",
            Summary::Removals => "removals",
        };
        format!("Processed {} {} {} for ticket {}", count, kind.short(), what, ticket_id)
    }
}

/// Result of [`edit_batch`]
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Summary line, or "No changes requested"
    pub message: String,

    pub plan: BatchPlan,

    pub verdict: BatchVerdict,

    /// Ticket state after the batch
    pub ticket: ServiceTicketDetail,
}

/// Result of [`assign_one`] / [`remove_one`]
#[derive(Debug, Clone)]
pub struct SingleOutcome {
    pub message: String,
    pub ticket: ServiceTicketDetail,
}

/// Failure of a persisted assignment operation
#[derive(Debug, thiserror::Error)]
pub enum AssignmentError {
    #[error("Service ticket not found")]
    TicketNotFound,

    #[error("{} not found", .0.label())]
    EntityNotFound(AssociationKind),

    #[error("{} already {} to this service ticket", .0.label(), .0.attached_verb())]
    AlreadyAssigned(AssociationKind),

    #[error("{} is not assigned to this service ticket", .0.label())]
    NotAssigned(AssociationKind),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// False when the ticket doesn't exist
async fn ticket_exists(conn: &mut PgConnection, ticket_id: i32) -> Result<bool, sqlx::Error> {
    let row: Option<(i32,)> = sqlx::query_as("SELECT id FROM service_tickets WHERE id = $1")
        .bind(ticket_id)
        .fetch_optional(conn)
        .await?;

    Ok(row.is_some())
}

/// Loads the association set of `ticket_id` and the names of `requested` ids
pub async fn load_snapshot(
    conn: &mut PgConnection,
    kind: AssociationKind,
    ticket_id: i32,
    requested: &[i32],
) -> Result<Snapshot, sqlx::Error> {
    let attached: Vec<(i32,)> = sqlx::query_as(&format!(
        "SELECT {} FROM {} WHERE service_ticket_id = $1",
        kind.foreign_key(),
        kind.association_table()
    ))
    .bind(ticket_id)
    .fetch_all(&mut *conn)
    .await?;

    let names: Vec<(i32, String)> = if requested.is_empty() {
        Vec::new()
    } else {
        sqlx::query_as(&format!(
            "SELECT id, name FROM {} WHERE id = ANY($1)",
            kind.entity_table()
        ))
        .bind(requested)
        .fetch_all(&mut *conn)
        .await?
    };

    Ok(Snapshot {
        attached: attached.into_iter().map(|(id,)| id).collect(),
        names: names.into_iter().collect(),
    })
}

/// Writes a plan's detaches and attaches
pub async fn apply(
    conn: &mut PgConnection,
    kind: AssociationKind,
    ticket_id: i32,
    plan: &BatchPlan,
) -> Result<(), sqlx::Error> {
    if !plan.detach.is_empty() {
        sqlx::query(&format!(
            "DELETE FROM {} WHERE service_ticket_id = $1 AND {} = ANY($2)",
            kind.association_table(),
            kind.foreign_key()
        ))
        .bind(ticket_id)
        .bind(&plan.detach)
        .execute(&mut *conn)
        .await?;
    }

    if !plan.attach.is_empty() {
        sqlx::query(&format!(
            "INSERT INTO {} (service_ticket_id, {}) SELECT $1, UNNEST($2::INT[])",
            kind.association_table(),
            kind.foreign_key()
        ))
        .bind(ticket_id)
        .bind(&plan.attach)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Runs a bulk add/remove batch against one ticket
///
/// The snapshot read, the writes and the reload of the ticket share one
/// transaction. A rejected or empty batch writes nothing.
pub async fn edit_batch(
    pool: &PgPool,
    kind: AssociationKind,
    ticket_id: i32,
    request: &BatchRequest,
    summary: Summary,
) -> Result<BatchOutcome, AssignmentError> {
    let mut tx = pool.begin().await?;

    if !ticket_exists(&mut tx, ticket_id).await? {
        return Err(AssignmentError::TicketNotFound);
    }

    let snapshot = load_snapshot(&mut tx, kind, ticket_id, &request.requested_ids()).await?;
    let plan = plan(kind, request, &snapshot);
    let verdict = plan.verdict();

    if plan.has_changes() {
        apply(&mut tx, kind, ticket_id, &plan).await?;
    }

    let ticket = ServiceTicket::find_detail_with(&mut tx, ticket_id)
        .await?
        .ok_or(AssignmentError::TicketNotFound)?;

    tx.commit().await?;

    tracing::info!(
        ticket_id,
        kind = kind.short(),
        attached = plan.attach.len(),
        detached = plan.detach.len(),
        rejected = plan.errors.len(),
        "Processed assignment batch"
    );

    let message = match verdict {
        BatchVerdict::NoChanges => "No changes requested".to_string(),
        _ => summary.message(kind, request.len(), ticket_id),
    };

    Ok(BatchOutcome {
        message,
        plan,
        verdict,
        ticket,
    })
}

async fn single(
    pool: &PgPool,
    kind: AssociationKind,
    ticket_id: i32,
    entity_id: i32,
    attach: bool,
) -> Result<SingleOutcome, AssignmentError> {
    let mut tx = pool.begin().await?;

    if !ticket_exists(&mut tx, ticket_id).await? {
        return Err(AssignmentError::TicketNotFound);
    }

    let snapshot = load_snapshot(&mut tx, kind, ticket_id, &[entity_id]).await?;
    let name = snapshot
        .names
        .get(&entity_id)
        .cloned()
        .ok_or(AssignmentError::EntityNotFound(kind))?;

    let request = if attach {
        BatchRequest { add_ids: vec![entity_id], remove_ids: vec![] }
    } else {
        BatchRequest { add_ids: vec![], remove_ids: vec![entity_id] }
    };

    let plan = plan(kind, &request, &snapshot);
    if !plan.has_changes() {
        return Err(if attach {
            AssignmentError::AlreadyAssigned(kind)
        } else {
            AssignmentError::NotAssigned(kind)
        });
    }

    apply(&mut tx, kind, ticket_id, &plan).await?;

    let ticket = ServiceTicket::find_detail_with(&mut tx, ticket_id)
        .await?
        .ok_or(AssignmentError::TicketNotFound)?;

    tx.commit().await?;

    let message = if attach {
        format!("{} {} assigned to service ticket {}", kind.label(), name, ticket_id)
    } else {
        format!("{} {} removed from service ticket {}", kind.label(), name, ticket_id)
    };

    tracing::info!(ticket_id, entity_id, kind = kind.short(), attach, "Updated ticket assignment");

    Ok(SingleOutcome { message, ticket })
}

/// Attaches one entity to a ticket
pub async fn assign_one(
    pool: &PgPool,
    kind: AssociationKind,
    ticket_id: i32,
    entity_id: i32,
) -> Result<SingleOutcome, AssignmentError> {
    single(pool, kind, ticket_id, entity_id, true).await
}

/// Detaches one entity from a ticket
pub async fn remove_one(
    pool: &PgPool,
    kind: AssociationKind,
    ticket_id: i32,
    entity_id: i32,
) -> Result<SingleOutcome, AssignmentError> {
    single(pool, kind, ticket_id, entity_id, false).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(attached: &[i32], names: &[(i32, &str)]) -> Snapshot {
        Snapshot {
            attached: attached.iter().copied().collect(),
            names: names.iter().map(|(id, n)| (*id, n.to_string())).collect(),
        }
    }

    fn request(add: &[i32], remove: &[i32]) -> BatchRequest {
        BatchRequest {
            add_ids: add.to_vec(),
            remove_ids: remove.to_vec(),
        }
    }

    #[test]
    fn test_partial_success_with_unknown_ids() {
        let snap = snapshot(&[], &[(1, "Grace")]);
        let plan = plan(AssociationKind::Mechanic, &request(&[1, 999], &[888]), &snap);

        assert_eq!(plan.attach, vec![1]);
        assert!(plan.detach.is_empty());
        assert_eq!(plan.changes_made, vec!["Added mechanic Grace (ID: 1)"]);
        assert_eq!(
            plan.errors,
            vec![
                "Mechanic with ID 888 not found",
                "Mechanic with ID 999 not found",
            ]
        );
        assert_eq!(plan.verdict(), BatchVerdict::PartialSuccess);
        assert_eq!(plan.verdict().status_code(), StatusCode::MULTI_STATUS);
    }

    #[test]
    fn test_all_applied() {
        let snap = snapshot(&[2], &[(1, "Grace"), (2, "Linus")]);
        let plan = plan(AssociationKind::Mechanic, &request(&[1], &[2]), &snap);

        assert_eq!(plan.detach, vec![2]);
        assert_eq!(plan.attach, vec![1]);
        assert_eq!(
            plan.changes_made,
            vec!["Removed mechanic Linus (ID: 2)", "Added mechanic Grace (ID: 1)"]
        );
        assert!(plan.errors.is_empty());
        assert_eq!(plan.verdict(), BatchVerdict::Applied);
        assert_eq!(plan.verdict().status_code(), StatusCode::OK);
    }

    #[test]
    fn test_all_rejected() {
        let snap = snapshot(&[1], &[(1, "Grace"), (2, "Linus")]);
        let plan = plan(AssociationKind::Mechanic, &request(&[1], &[2]), &snap);

        assert!(plan.attach.is_empty());
        assert!(plan.detach.is_empty());
        assert_eq!(
            plan.errors,
            vec![
                "Mechanic Linus (ID: 2) was not assigned to this ticket",
                "Mechanic Grace (ID: 1) was already assigned to this ticket",
            ]
        );
        assert_eq!(plan.verdict(), BatchVerdict::Rejected);
        assert_eq!(plan.verdict().status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_empty_request() {
        let plan = plan(AssociationKind::Inventory, &BatchRequest::default(), &Snapshot::default());

        assert_eq!(plan, BatchPlan::default());
        assert_eq!(plan.verdict(), BatchVerdict::NoChanges);
        assert_eq!(plan.verdict().status_code(), StatusCode::OK);
    }

    #[test]
    fn test_duplicate_add_yields_one_change_and_one_error() {
        let snap = snapshot(&[], &[(5, "Ada")]);
        let plan = plan(AssociationKind::Mechanic, &request(&[5, 5], &[]), &snap);

        assert_eq!(plan.attach, vec![5]);
        assert_eq!(plan.changes_made.len(), 1);
        assert_eq!(
            plan.errors,
            vec!["Mechanic Ada (ID: 5) was already assigned to this ticket"]
        );
    }

    #[test]
    fn test_duplicate_remove_yields_one_change_and_one_error() {
        let snap = snapshot(&[5], &[(5, "Ada")]);
        let plan = plan(AssociationKind::Mechanic, &request(&[], &[5, 5]), &snap);

        assert_eq!(plan.detach, vec![5]);
        assert_eq!(plan.changes_made.len(), 1);
        assert_eq!(
            plan.errors,
            vec!["Mechanic Ada (ID: 5) was not assigned to this ticket"]
        );
    }

    #[test]
    fn test_removals_run_before_additions() {
        // removing then re-adding the same mechanic is two changes
        let snap = snapshot(&[3], &[(3, "Ken")]);
        let plan = plan(AssociationKind::Mechanic, &request(&[3], &[3]), &snap);

        assert_eq!(plan.detach, vec![3]);
        assert_eq!(plan.attach, vec![3]);
        assert_eq!(
            plan.changes_made,
            vec!["Removed mechanic Ken (ID: 3)", "Added mechanic Ken (ID: 3)"]
        );
        assert!(plan.errors.is_empty());
    }

    #[test]
    fn test_inventory_messages() {
        let snap = snapshot(&[8], &[(7, "Brake pad"), (8, "Oil filter")]);
        let plan = plan(AssociationKind::Inventory, &request(&[7, 8, 40], &[]), &snap);

        assert_eq!(plan.changes_made, vec!["Added inventory item Brake pad (ID: 7)"]);
        assert_eq!(
            plan.errors,
            vec![
                "Inventory item Oil filter (ID: 8) was already added to this ticket",
                "Inventory item with ID 40 not found",
            ]
        );
    }

    #[test]
    fn test_snapshot_is_not_mutated() {
        let snap = snapshot(&[1], &[(1, "Grace")]);
        let _ = plan(AssociationKind::Mechanic, &request(&[], &[1]), &snap);
        assert!(snap.attached.contains(&1));
    }

    #[test]
    fn test_summary_messages() {
        assert_eq!(
            Summary::Changes.message(AssociationKind::Mechanic, 3, 12),
            "Processed 3 mechanic changes for ticket 12"
        );
        assert_eq!(
            Summary::Additions.message(AssociationKind::Inventory, 2, 4),
            "Processed 2 inventory additions for ticket 4"
        );
        assert_eq!(
            Summary::Removals.message(AssociationKind::Inventory, 1, 4),
            "Processed 1 inventory removals for ticket 4"
        );
    }

    #[test]
    fn test_request_len_and_requested_ids() {
        let req = request(&[3, 1], &[1, 2]);
        assert_eq!(req.len(), 4);
        assert!(!req.is_empty());
        assert_eq!(req.requested_ids(), vec![1, 2, 3]);
    }

    #[test]
    fn test_parse_id_list() {
        let body = json!({ "add_ids": [1, 2], "remove_ids": null });

        let req = BatchRequest::from_json(AssociationKind::Mechanic, &body).unwrap();
        assert_eq!(req.add_ids, vec![1, 2]);
        assert!(req.remove_ids.is_empty());

        let empty = BatchRequest::from_json(
            AssociationKind::Mechanic,
            &json!({ "add_ids": [], "remove_ids": [] }),
        )
        .unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_blank_body_is_rejected() {
        for body in [json!({}), json!(null), json!([]), json!(""), json!(0), json!(false)] {
            assert_eq!(
                BatchRequest::from_json(AssociationKind::Mechanic, &body),
                Err("No input data provided".to_string()),
                "{}",
                body
            );
        }

        assert!(require_input(&json!({ "inventory_ids": [] })).is_ok());
        assert!(require_input(&json!({ "unrelated": 1 })).is_ok());
    }

    #[test]
    fn test_parse_id_list_rejects_bad_shapes() {
        let kind = AssociationKind::Mechanic;

        assert_eq!(
            parse_id_list(kind, &json!({ "add_ids": 5 }), "add_ids"),
            Err("add_ids must be a list of mechanic IDs".to_string())
        );
        assert_eq!(
            parse_id_list(kind, &json!({ "remove_ids": [1, "two"] }), "remove_ids"),
            Err("remove_ids must be a list of mechanic IDs".to_string())
        );
        assert!(parse_id_list(kind, &json!({ "add_ids": [1.5] }), "add_ids").is_err());
        assert!(parse_id_list(kind, &json!({ "add_ids": [4294967296_i64] }), "add_ids").is_err());
        assert_eq!(
            parse_id_list(AssociationKind::Inventory, &json!({ "inventory_ids": "1" }), "inventory_ids"),
            Err("inventory_ids must be a list of inventory IDs".to_string())
        );
    }

    #[test]
    fn test_assignment_error_messages() {
        assert_eq!(
            AssignmentError::EntityNotFound(AssociationKind::Mechanic).to_string(),
            "Mechanic not found"
        );
        assert_eq!(
            AssignmentError::AlreadyAssigned(AssociationKind::Inventory).to_string(),
            "Inventory item already added to this service ticket"
        );
        assert_eq!(
            AssignmentError::NotAssigned(AssociationKind::Mechanic).to_string(),
            "Mechanic is not assigned to this service ticket"
        );
        assert_eq!(AssignmentError::TicketNotFound.to_string(), "Service ticket not found");
    }
}
