//! Idempotency protocol: exactly-once effects under at-least-once delivery.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use supply_game_core_rs::core::clock::SystemClock;
use supply_game_core_rs::persist::{InMemorySnapshotStore, LedgerStore, PersistError};
use supply_game_core_rs::{
    Action, ActionError, DemandConfig, DemandPattern, GameConfig, GameEngine, LedgerEntry,
    RecordedEffect, Role,
};

fn test_config() -> GameConfig {
    GameConfig {
        demand: DemandConfig {
            pattern: DemandPattern::Constant { level: 4 },
            rng_seed: 7,
        },
        ..GameConfig::default()
    }
}

fn started_engine() -> (GameEngine, String) {
    let engine = GameEngine::new(test_config()).unwrap();
    engine.start();
    let chain_id = engine.chain_ids()[0].clone();
    (engine, chain_id)
}

#[test]
fn test_resubmission_returns_identical_effect_with_one_mutation() {
    let (engine, chain_id) = started_engine();

    let action = Action::place_order(&chain_id, 0, Role::Shop, 10, "retry-me");
    let first = engine.submit_action(action.clone()).unwrap();
    let second = engine.submit_action(action.clone()).unwrap();
    let third = engine.submit_action(action).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, third);

    // Exactly one ledger entry for the key.
    let entries = engine.ledger_entries(&chain_id);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].key, "retry-me");

    // Exactly one state mutation: finish the week and check the recorded
    // order is 10, not 30.
    for (i, &role) in [Role::Retailer, Role::Wholesaler, Role::Factory].iter().enumerate() {
        engine
            .submit_action(Action::place_order(&chain_id, 0, role, 4, format!("k{}", i)))
            .unwrap();
    }
    let snapshot = engine.get_chain_state(&chain_id).unwrap();
    assert_eq!(snapshot.role(Role::Shop).orders_placed, vec![10]);
}

#[test]
fn test_conflicting_key_reuse_is_rejected() {
    let (engine, chain_id) = started_engine();

    engine
        .submit_action(Action::place_order(&chain_id, 0, Role::Shop, 5, "shared"))
        .unwrap();
    let err = engine
        .submit_action(Action::place_order(&chain_id, 0, Role::Retailer, 5, "shared"))
        .unwrap_err();
    assert_eq!(
        err,
        ActionError::ConflictingIdempotencyKey {
            key: "shared".to_string()
        }
    );
}

#[test]
fn test_rejected_key_replays_rejection() {
    let (engine, chain_id) = started_engine();

    let bad = Action::place_order(&chain_id, 0, Role::Shop, -2, "bad");
    let first = engine.submit_action(bad.clone()).unwrap_err();
    assert_eq!(first, ActionError::InvalidQuantity { quantity: -2 });

    // The rejection is remembered; the retry gets the same answer and the
    // chain is untouched.
    let second = engine.submit_action(bad).unwrap_err();
    assert_eq!(first, second);

    let entries = engine.ledger_entries(&chain_id);
    assert_eq!(entries.len(), 1);
    assert!(matches!(entries[0].effect, RecordedEffect::Rejected(_)));

    // The seat is still free for a valid order under a fresh key.
    engine
        .submit_action(Action::place_order(&chain_id, 0, Role::Shop, 2, "good"))
        .unwrap();
}

/// Ledger store that fails on demand.
struct FlakyLedgerStore {
    failing: Arc<AtomicBool>,
    rows: Vec<LedgerEntry>,
}

impl LedgerStore for FlakyLedgerStore {
    fn append(&mut self, _chain_id: &str, entry: &LedgerEntry) -> Result<(), PersistError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PersistError::Unavailable("disk on fire".to_string()));
        }
        self.rows.push(entry.clone());
        Ok(())
    }

    fn entries(&self, _chain_id: &str) -> Result<Vec<LedgerEntry>, PersistError> {
        Ok(self.rows.clone())
    }
}

#[test]
fn test_persistence_failure_leaves_key_retryable() {
    let failing = Arc::new(AtomicBool::new(true));
    let engine = GameEngine::with_collaborators(
        test_config(),
        Box::new(FlakyLedgerStore {
            failing: failing.clone(),
            rows: Vec::new(),
        }),
        Box::new(InMemorySnapshotStore::new()),
        Arc::new(SystemClock),
    )
    .unwrap();
    engine.start();
    let chain_id = engine.chain_ids()[0].clone();

    let action = Action::place_order(&chain_id, 0, Role::Shop, 10, "durable-me");
    let err = engine.submit_action(action.clone()).unwrap_err();
    assert!(matches!(err, ActionError::PersistenceUnavailable { .. }));

    // NOT applied: no ledger entry, no mutation.
    assert!(engine.ledger_entries(&chain_id).is_empty());

    // The store recovers; the same key now applies exactly once.
    failing.store(false, Ordering::SeqCst);
    engine.submit_action(action).unwrap();
    let entries = engine.ledger_entries(&chain_id);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].key, "durable-me");
}
