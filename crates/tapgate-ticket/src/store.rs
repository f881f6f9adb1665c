//! Durable ticket-session records.
//!
//! One record is written when a ticket-authenticated session completes.
//! Records are never updated; grants only ever ask "what did this attendee
//! do in the last N seconds".
//!
//! Two backends:
//!
//! - [`SledTicketStore`]: on-disk, tree `ticket_sessions`, keyed
//!   `<attendee>:<timestamp be>:<session id>` so one prefix scan returns an
//!   attendee's history in time order.
//! - [`MemoryTicketStore`]: a `Vec` behind a mutex, for tests and
//!   throwaway deployments.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::TicketError;

/// A completed ticket-authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketSessionRecord {
    pub session_id: String,
    pub attendee_id: String,
    pub ticket_id: String,
    pub event_id: String,
    pub product_id: String,
    /// Unix seconds at completion.
    pub timestamp: i64,
    /// Amount paid out, base units, decimal string.
    pub drop_amount: String,
}

impl TicketSessionRecord {
    /// The drop amount as an integer. Unparseable amounts count as zero.
    pub fn drop_amount(&self) -> BigUint {
        self.drop_amount.parse().unwrap_or_default()
    }
}

/// Storage for ticket-session records.
#[async_trait]
pub trait TicketSessionStore: Send + Sync + 'static {
    /// Persists a record.
    async fn insert(&self, record: TicketSessionRecord) -> Result<(), TicketError>;

    /// Returns the attendee's records with `timestamp > now - window_secs`,
    /// oldest first.
    async fn sessions_since(
        &self,
        attendee_id: &str,
        window_secs: u64,
    ) -> Result<Vec<TicketSessionRecord>, TicketError>;
}

fn window_start(window_secs: u64) -> i64 {
    Utc::now()
        .timestamp()
        .saturating_sub(i64::try_from(window_secs).unwrap_or(i64::MAX))
}

// ---------------------------------------------------------------------------
// Sled
// ---------------------------------------------------------------------------

/// sled-backed store.
#[derive(Clone)]
pub struct SledTicketStore {
    tree: sled::Tree,
}

impl SledTicketStore {
    pub const TREE: &'static str = "ticket_sessions";

    /// Opens (or creates) a database at `path`.
    pub fn open(path: &str) -> Result<Self, TicketError> {
        tracing::info!(path, "opening ticket-session store");
        let db = sled::open(path)?;
        Self::from_db(&db)
    }

    /// Uses the ticket-session tree of an already open database.
    pub fn from_db(db: &sled::Db) -> Result<Self, TicketError> {
        Ok(Self {
            tree: db.open_tree(Self::TREE)?,
        })
    }

    fn key(record: &TicketSessionRecord) -> Vec<u8> {
        let mut key = Self::prefix(&record.attendee_id);
        key.extend_from_slice(&record.timestamp.to_be_bytes());
        key.push(b':');
        key.extend_from_slice(record.session_id.as_bytes());
        key
    }

    fn prefix(attendee_id: &str) -> Vec<u8> {
        let mut prefix = attendee_id.as_bytes().to_vec();
        prefix.push(b':');
        prefix
    }
}

#[async_trait]
impl TicketSessionStore for SledTicketStore {
    async fn insert(&self, record: TicketSessionRecord) -> Result<(), TicketError> {
        let value = bincode::serialize(&record)?;
        self.tree.insert(Self::key(&record), value)?;
        self.tree.flush_async().await?;
        tracing::debug!(
            session_id = %record.session_id,
            attendee_id = %record.attendee_id,
            "ticket session recorded"
        );
        Ok(())
    }

    async fn sessions_since(
        &self,
        attendee_id: &str,
        window_secs: u64,
    ) -> Result<Vec<TicketSessionRecord>, TicketError> {
        let since = window_start(window_secs);
        let mut records = Vec::new();
        for item in self.tree.scan_prefix(Self::prefix(attendee_id)) {
            let (_, value) = item?;
            let record: TicketSessionRecord = bincode::deserialize(&value)?;
            // The prefix also matches attendee ids containing ':' that start
            // with this one.
            if record.attendee_id == attendee_id && record.timestamp > since {
                records.push(record);
            }
        }
        records.sort_by_key(|r| r.timestamp);
        Ok(records)
    }
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

/// In-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryTicketStore {
    records: Arc<Mutex<Vec<TicketSessionRecord>>>,
}

impl MemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record, in insertion order.
    pub async fn records(&self) -> Vec<TicketSessionRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl TicketSessionStore for MemoryTicketStore {
    async fn insert(&self, record: TicketSessionRecord) -> Result<(), TicketError> {
        self.records.lock().await.push(record);
        Ok(())
    }

    async fn sessions_since(
        &self,
        attendee_id: &str,
        window_secs: u64,
    ) -> Result<Vec<TicketSessionRecord>, TicketError> {
        let since = window_start(window_secs);
        let mut records: Vec<_> = self
            .records
            .lock()
            .await
            .iter()
            .filter(|r| r.attendee_id == attendee_id && r.timestamp > since)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.timestamp);
        Ok(records)
    }
}
