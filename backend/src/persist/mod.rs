//! Persistence collaborator contracts
//!
//! The core requires two durable primitives, both keyed by chain id and
//! week and both with read-your-writes consistency for the coordinator that
//! just wrote them:
//!
//! - append of event-ledger entries (the idempotency record)
//! - snapshot of chain state after each `Advancing` transition
//!
//! The storage technology behind them is a collaborator concern; the core
//! only talks to these traits. The in-memory implementations here are the
//! defaults for tests, the CLI, and embedded use.

use crate::ledger::LedgerEntry;
use crate::models::chain::ChainSnapshot;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use thiserror::Error;

/// Errors surfaced by persistence collaborators.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PersistError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// Durable append-only log of ledger entries, partitioned by chain.
pub trait LedgerStore: Send {
    /// Durably append one entry. Once this returns `Ok`, the entry must be
    /// readable by the writer.
    fn append(&mut self, chain_id: &str, entry: &LedgerEntry) -> Result<(), PersistError>;

    /// All entries for a chain in append order (recovery path).
    fn entries(&self, chain_id: &str) -> Result<Vec<LedgerEntry>, PersistError>;
}

/// Durable document store of post-advance chain snapshots.
pub trait SnapshotStore: Send {
    /// Durably record the snapshot taken after the advance that closed
    /// `week`.
    fn put(
        &mut self,
        chain_id: &str,
        week: usize,
        snapshot: &ChainSnapshot,
    ) -> Result<(), PersistError>;

    /// Fetch a previously stored snapshot.
    fn get(&self, chain_id: &str, week: usize) -> Result<Option<ChainSnapshot>, PersistError>;
}

/// In-memory ledger store.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    rows: HashMap<String, Vec<LedgerEntry>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn append(&mut self, chain_id: &str, entry: &LedgerEntry) -> Result<(), PersistError> {
        self.rows
            .entry(chain_id.to_string())
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    fn entries(&self, chain_id: &str) -> Result<Vec<LedgerEntry>, PersistError> {
        Ok(self.rows.get(chain_id).cloned().unwrap_or_default())
    }
}

/// In-memory snapshot store. Documents are kept serialized, the same way a
/// real document store would hold them.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    rows: HashMap<(String, usize), String>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored snapshots (all chains).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn put(
        &mut self,
        chain_id: &str,
        week: usize,
        snapshot: &ChainSnapshot,
    ) -> Result<(), PersistError> {
        let doc = serde_json::to_string(snapshot)
            .map_err(|e| PersistError::Serialization(e.to_string()))?;
        self.rows.insert((chain_id.to_string(), week), doc);
        Ok(())
    }

    fn get(&self, chain_id: &str, week: usize) -> Result<Option<ChainSnapshot>, PersistError> {
        match self.rows.get(&(chain_id.to_string(), week)) {
            None => Ok(None),
            Some(doc) => serde_json::from_str(doc)
                .map(Some)
                .map_err(|e| PersistError::Serialization(e.to_string())),
        }
    }
}

// ============================================================================
// Config Hashing
// ============================================================================

/// Compute a deterministic SHA256 hash of a config value.
///
/// Checkpoints carry this hash so a saved game can only be restored against
/// the config it was created with. Uses canonical JSON with sorted keys so
/// the hash is independent of map iteration order.
pub fn compute_config_hash<T: Serialize>(config: &T) -> Result<String, PersistError> {
    use serde_json::Value;
    use std::collections::BTreeMap;

    let value = serde_json::to_value(config)
        .map_err(|e| PersistError::Serialization(format!("config serialization failed: {}", e)))?;

    fn canonicalize(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let sorted: BTreeMap<String, Value> =
                    map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                Value::Object(sorted.into_iter().collect())
            }
            Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
            other => other,
        }
    }

    let canonical = canonicalize(value);
    let json = serde_json::to_string(&canonical)
        .map_err(|e| PersistError::Serialization(format!("canonical encoding failed: {}", e)))?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
