//! Event ledger — the idempotency record
//!
//! Append-only map from caller-supplied idempotency keys to the effect their
//! action had. One partition per chain, so ledgers across chains stay
//! independent and can be archived independently.
//!
//! Guarantee: exactly-once *effect* semantics. A key is recorded at most
//! once; replaying it returns the original effect (or the original
//! rejection) verbatim without re-mutating state, even under at-least-once
//! delivery of the underlying action message.

use crate::models::action::{ActionError, Actor, AppliedEffect};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What a key resolved to when it was first seen.
///
/// Rejections are remembered too — a retried invalid submission gets the
/// same answer back instead of amplifying into repeated validation work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RecordedEffect {
    Applied(AppliedEffect),
    Rejected(ActionError),
}

/// One ledger row correlating an idempotency key to its applied effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub key: String,
    pub chain_id: String,
    pub week: usize,
    pub actor: Actor,
    pub effect: RecordedEffect,
    /// Wall time the entry was recorded (engine clock)
    pub recorded_at_ms: u64,
    /// Position in this partition's append order
    pub seq: u64,
}

/// Per-chain idempotency ledger partition.
///
/// # Example
/// ```
/// use supply_game_core_rs::ledger::{EventLedger, RecordedEffect};
/// use supply_game_core_rs::models::{Actor, AppliedEffect, Role};
///
/// let mut ledger = EventLedger::new("chain_0".to_string());
/// let entry = ledger.build_entry(
///     "key-1".to_string(),
///     0,
///     Actor::Role(Role::Shop),
///     RecordedEffect::Applied(AppliedEffect::OrderPlaced {
///         chain_id: "chain_0".to_string(),
///         week: 0,
///         actor: Actor::Role(Role::Shop),
///         quantity: 10,
///     }),
///     1_000,
/// );
/// ledger.record(entry);
/// assert!(ledger.get("key-1").is_some());
/// assert_eq!(ledger.len(), 1);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLedger {
    chain_id: String,
    entries: HashMap<String, LedgerEntry>,
    /// Keys in append order (entries themselves live in the map)
    order: Vec<String>,
    next_seq: u64,
}

impl EventLedger {
    pub fn new(chain_id: String) -> Self {
        Self {
            chain_id,
            entries: HashMap::new(),
            order: Vec::new(),
            next_seq: 0,
        }
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// Look up a previously recorded key.
    pub fn get(&self, key: &str) -> Option<&LedgerEntry> {
        self.entries.get(key)
    }

    /// Assemble an entry with the partition's next sequence number.
    ///
    /// The entry is not recorded yet — the coordinator first appends it to
    /// the durable store, then commits it here.
    pub fn build_entry(
        &self,
        key: String,
        week: usize,
        actor: Actor,
        effect: RecordedEffect,
        recorded_at_ms: u64,
    ) -> LedgerEntry {
        LedgerEntry {
            key,
            chain_id: self.chain_id.clone(),
            week,
            actor,
            effect,
            recorded_at_ms,
            seq: self.next_seq,
        }
    }

    /// Commit an entry. Append-only: recording a key twice is a coordinator
    /// bug and panics.
    pub fn record(&mut self, entry: LedgerEntry) {
        assert!(
            !self.entries.contains_key(&entry.key),
            "idempotency key {} recorded twice",
            entry.key
        );
        self.next_seq = entry.seq + 1;
        self.order.push(entry.key.clone());
        self.entries.insert(entry.key.clone(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in append order.
    pub fn iter(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.order.iter().filter_map(move |key| self.entries.get(key))
    }

    /// Entries recorded for a given week, in append order.
    pub fn entries_for_week(&self, week: usize) -> Vec<&LedgerEntry> {
        self.iter().filter(|e| e.week == week).collect()
    }

    /// Count of applied (non-rejected) entries, for mutation accounting.
    pub fn applied_count(&self) -> usize {
        self.iter()
            .filter(|e| matches!(e.effect, RecordedEffect::Applied(_)))
            .count()
    }

    /// Rebuild a partition from durably stored entries (recovery path).
    pub fn from_entries(chain_id: String, stored: Vec<LedgerEntry>) -> Self {
        let mut ledger = Self::new(chain_id);
        for entry in stored {
            ledger.record(entry);
        }
        ledger
    }
}
