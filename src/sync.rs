//! Consumed interface of the remote sync/job API. Nothing in this crate
//! drives the transport; what lives here is the contract a client needs
//! (endpoint paths, the polling budget, wire shapes) plus the snapshot
//! mapping from local rows to their remote representation.
#![allow(dead_code)]

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::Database;
use crate::error::StoreResult;

pub(crate) mod endpoints {
    pub(crate) const LOGIN: &str = "/api/auth/login";
    pub(crate) const REGISTER: &str = "/api/auth/register";
    pub(crate) const REFRESH: &str = "/api/auth/refresh";

    pub(crate) const SYNC_UPLOAD: &str = "/api/sync/upload";
    pub(crate) const SYNC_DOWNLOAD: &str = "/api/sync/download";
    pub(crate) const SYNC_FULL: &str = "/api/sync/full";
    pub(crate) const SYNC_STATUS: &str = "/api/sync/status";

    pub(crate) const JOB_CREATE: &str = "/api/jobs";
    pub(crate) const JOB_HISTORY: &str = "/api/jobs/history";

    pub(crate) fn job_status(job_id: &str) -> String {
        format!("/api/jobs/{job_id}")
    }
}

/// Fixed delay between job-status polls.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_secs(2);
/// Polling gives up after this many attempts.
pub(crate) const MAX_POLL_ATTEMPTS: u32 = 30;

/// Hands out one delay per poll attempt until the budget is spent.
pub(crate) struct JobPoller {
    attempts: u32,
}

impl JobPoller {
    pub(crate) fn new() -> Self {
        Self { attempts: 0 }
    }

    pub(crate) fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= MAX_POLL_ATTEMPTS {
            return None;
        }
        self.attempts += 1;
        Some(POLL_INTERVAL)
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.attempts
    }
}

// ── Wire shapes ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Credentials {
    pub(crate) username: String,
    pub(crate) password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct TokenPair {
    pub(crate) access_token: String,
    pub(crate) refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SyncStatus {
    pub(crate) last_synced_at: Option<String>,
    pub(crate) pending_uploads: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct JobRecord {
    pub(crate) id: String,
    pub(crate) state: JobState,
    pub(crate) created_at: String,
    pub(crate) finished_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum JobState {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    pub(crate) fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

// ── Snapshot ──────────────────────────────────────────────────

/// Upload payload: every local row with its local id carried along so the
/// server can map it to a remote representation. Amounts travel as strings
/// (exact decimal text, same as on disk); category membership as id lists
/// read through the join table.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Snapshot {
    pub(crate) exported_at: String,
    pub(crate) categories: Vec<CategoryRecord>,
    pub(crate) transaction_types: Vec<TypeRecord>,
    pub(crate) transactions: Vec<TransactionRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CategoryRecord {
    pub(crate) id: i64,
    pub(crate) name: String,
    pub(crate) color: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct TypeRecord {
    pub(crate) id: i64,
    pub(crate) name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct TransactionRecord {
    pub(crate) id: i64,
    pub(crate) type_id: i64,
    pub(crate) amount: String,
    pub(crate) date: String,
    pub(crate) description: Option<String>,
    pub(crate) category_ids: Vec<i64>,
}

pub(crate) fn snapshot(db: &Database) -> StoreResult<Snapshot> {
    let categories = db
        .get_categories()?
        .into_iter()
        .map(|c| CategoryRecord {
            id: c.id.unwrap_or(0),
            name: c.name,
            color: c.color,
        })
        .collect();

    let transaction_types = db
        .get_transaction_types()?
        .into_iter()
        .map(|t| TypeRecord {
            id: t.id.unwrap_or(0),
            name: t.name,
        })
        .collect();

    let mut transactions = Vec::new();
    for txn in db.get_transactions(None, None, None, None, None, None)? {
        let id = txn.id.unwrap_or(0);
        let category_ids = db
            .categories_for_transaction(id)?
            .into_iter()
            .filter_map(|c| c.id)
            .collect();
        transactions.push(TransactionRecord {
            id,
            type_id: txn.type_id,
            amount: txn.amount.to_string(),
            date: txn.date,
            description: txn.description,
            category_ids,
        });
    }

    Ok(Snapshot {
        exported_at: Utc::now().to_rfc3339(),
        categories,
        transaction_types,
        transactions,
    })
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
