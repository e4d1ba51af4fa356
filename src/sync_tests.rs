#![allow(clippy::unwrap_used)]

use super::*;
use crate::models::{Category, Transaction, TransactionType};
use rust_decimal_macros::dec;

// ── Polling contract ──────────────────────────────────────────

#[test]
fn test_poller_spends_exactly_the_attempt_budget() {
    let mut poller = JobPoller::new();
    for _ in 0..MAX_POLL_ATTEMPTS {
        assert_eq!(poller.next_delay(), Some(POLL_INTERVAL));
    }
    assert_eq!(poller.next_delay(), None);
    assert_eq!(poller.next_delay(), None);
    assert_eq!(poller.attempts(), MAX_POLL_ATTEMPTS);
}

#[test]
fn test_job_status_path() {
    assert_eq!(endpoints::job_status("abc-123"), "/api/jobs/abc-123");
    assert!(endpoints::JOB_HISTORY.starts_with("/api/jobs"));
}

// ── Wire shapes ───────────────────────────────────────────────

#[test]
fn test_job_state_snake_case() {
    assert_eq!(
        serde_json::to_string(&JobState::Succeeded).unwrap(),
        "\"succeeded\""
    );
    let state: JobState = serde_json::from_str("\"queued\"").unwrap();
    assert_eq!(state, JobState::Queued);
}

#[test]
fn test_job_state_terminal() {
    assert!(JobState::Succeeded.is_terminal());
    assert!(JobState::Failed.is_terminal());
    assert!(!JobState::Queued.is_terminal());
    assert!(!JobState::Running.is_terminal());
}

#[test]
fn test_job_record_round_trip() {
    let json = r#"{
        "id": "job-7",
        "state": "running",
        "created_at": "2024-06-01T10:00:00Z",
        "finished_at": null
    }"#;
    let record: JobRecord = serde_json::from_str(json).unwrap();
    assert_eq!(record.id, "job-7");
    assert_eq!(record.state, JobState::Running);
    assert!(record.finished_at.is_none());

    let back = serde_json::to_string(&record).unwrap();
    assert!(back.contains("\"running\""));
}

#[test]
fn test_credentials_and_tokens_serialize() {
    let creds = Credentials {
        username: "ada".into(),
        password: "hunter2".into(),
    };
    let json = serde_json::to_string(&creds).unwrap();
    assert!(json.contains("\"username\":\"ada\""));

    let tokens: TokenPair =
        serde_json::from_str(r#"{"access_token":"a","refresh_token":"r"}"#).unwrap();
    assert_eq!(tokens.access_token, "a");

    let status: SyncStatus =
        serde_json::from_str(r#"{"last_synced_at":null,"pending_uploads":3}"#).unwrap();
    assert_eq!(status.pending_uploads, 3);
}

// ── Snapshot ──────────────────────────────────────────────────

#[test]
fn test_snapshot_maps_local_rows() {
    let mut db = Database::open_in_memory().unwrap();
    let types = db.get_transaction_types().unwrap();
    let expense = TransactionType::find_by_name(&types, "expense")
        .unwrap()
        .id
        .unwrap();
    let cats = db.get_categories().unwrap();
    let groceries = Category::find_by_name(&cats, "Groceries")
        .unwrap()
        .id
        .unwrap();
    let travel = Category::find_by_name(&cats, "Travel").unwrap().id.unwrap();

    let txn_id = db
        .insert_transaction(
            &Transaction::new(expense, dec!(12.50), "2024-03-05".into())
                .with_description("milk".into()),
            &[groceries, travel],
        )
        .unwrap();

    let snap = snapshot(&db).unwrap();
    assert!(!snap.exported_at.is_empty());
    assert_eq!(snap.categories.len(), cats.len());
    assert!(snap.transaction_types.iter().any(|t| t.name == "expense"));

    assert_eq!(snap.transactions.len(), 1);
    let record = &snap.transactions[0];
    assert_eq!(record.id, txn_id);
    assert_eq!(record.type_id, expense);
    // Amounts travel as exact decimal text, not floats.
    assert_eq!(record.amount, "12.50");
    assert_eq!(record.description.as_deref(), Some("milk"));
    let mut ids = record.category_ids.clone();
    ids.sort_unstable();
    let mut expected = vec![groceries, travel];
    expected.sort_unstable();
    assert_eq!(ids, expected);
}

#[test]
fn test_snapshot_serializes_to_json() {
    let db = Database::open_in_memory().unwrap();
    let snap = snapshot(&db).unwrap();
    let json = serde_json::to_string_pretty(&snap).unwrap();
    assert!(json.contains("\"transactions\""));
    assert!(json.contains("\"transaction_types\""));

    let back: Snapshot = serde_json::from_str(&json).unwrap();
    assert!(back.transactions.is_empty());
}
