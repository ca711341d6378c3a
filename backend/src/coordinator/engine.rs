//! Game engine — the multi-chain owner
//!
//! Owns one [`RoundCoordinator`] per chain and exposes the boundary
//! operations: action submission, read-only snapshots, the host view,
//! scores, notifications, the timeout sweep, and the factory-mode bridge.
//!
//! # Concurrency model
//!
//! Chains are independent units of work. Each coordinator sits behind its
//! own mutex and owns exclusive write access to its ChainState, pipelines,
//! and ledger partition; the critical section per submission is short
//! (validate + mutate + durable ledger append) and never does other I/O.
//! HostAggregator and ScoringEngine read from a separate table of immutable
//! post-advance snapshots, so reads never contend with an in-flight
//! mutation — snapshot-then-read, not lock-then-read.

use crate::bridge::{demand_satisfied_ratio, BridgeReading, BridgeUpdate};
use crate::coordinator::round::{AdvanceOutcome, RoundCoordinator};
use crate::coordinator::{
    validate_config, GameConfig, GameError, TimeoutSubstitution, WeekAdvanced,
};
use crate::core::clock::{Clock, SystemClock};
use crate::demand::DemandGenerator;
use crate::events::{EventLog, GameEvent};
use crate::host::{HostAggregator, HostView};
use crate::ledger::EventLedger;
use crate::models::action::{Action, ActionError, AppliedEffect};
use crate::models::chain::{ChainSnapshot, ChainState, ChainStatus};
use crate::models::role::Role;
use crate::persist::{
    compute_config_hash, InMemoryLedgerStore, InMemorySnapshotStore, LedgerStore, SnapshotStore,
};
use crate::scoring::{ScoreRecord, ScoringEngine};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

/// Saved game: per-chain snapshot, ledger, and demand-stream state, bound to
/// the config it was created under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameCheckpoint {
    pub game_id: String,
    pub config_hash: String,
    pub chains: Vec<ChainCheckpoint>,
}

/// One chain's slice of a checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainCheckpoint {
    pub snapshot: ChainSnapshot,
    pub ledger: EventLedger,
    pub demand: DemandGenerator,
}

/// Multi-chain game engine. See module docs for the concurrency model.
pub struct GameEngine {
    game_id: String,
    config: GameConfig,
    config_hash: String,

    chain_ids: Vec<String>,
    chain_index: HashMap<String, usize>,
    chains: Vec<Mutex<RoundCoordinator>>,

    /// Immutable post-advance snapshots, the only thing readers touch
    snapshots: RwLock<HashMap<String, ChainSnapshot>>,

    scoring: ScoringEngine,
    ledger_store: Mutex<Box<dyn LedgerStore>>,
    snapshot_store: Mutex<Box<dyn SnapshotStore>>,
    events: Mutex<EventLog>,
    notifications: Mutex<Vec<WeekAdvanced>>,
    clock: Arc<dyn Clock>,
}

impl GameEngine {
    /// Create a game with in-memory persistence and the system clock.
    pub fn new(config: GameConfig) -> Result<Self, GameError> {
        Self::with_collaborators(
            config,
            Box::new(InMemoryLedgerStore::new()),
            Box::new(InMemorySnapshotStore::new()),
            Arc::new(SystemClock),
        )
    }

    /// Create a game with explicit persistence collaborators and clock.
    pub fn with_collaborators(
        config: GameConfig,
        ledger_store: Box<dyn LedgerStore>,
        snapshot_store: Box<dyn SnapshotStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, GameError> {
        validate_config(&config)?;
        let config_hash = compute_config_hash(&config)?;
        let game_id = generate_id("game");

        let mut chain_ids = Vec::with_capacity(config.num_chains);
        let mut chain_index = HashMap::new();
        let mut chains = Vec::with_capacity(config.num_chains);
        let mut snapshots = HashMap::new();

        for i in 0..config.num_chains {
            let chain_id = format!("{}_chain_{}", game_id, i);
            let chain = ChainState::new(
                chain_id.clone(),
                game_id.clone(),
                config.initial_inventory,
                config.shipment_lag,
                config.order_lag,
                config.weeks_total,
            );
            let demand = DemandGenerator::new(&config.demand, i);
            let coordinator = RoundCoordinator::new(
                chain,
                demand,
                config.required_roles.clone(),
                config.timeout.clone(),
            );
            snapshots.insert(chain_id.clone(), coordinator.snapshot());
            chain_index.insert(chain_id.clone(), i);
            chain_ids.push(chain_id);
            chains.push(Mutex::new(coordinator));
        }

        let scoring = ScoringEngine::new(config.cost_rates.clone(), config.bullwhip_window);
        log::info!(
            "created game {} with {} supply chains",
            game_id,
            config.num_chains
        );

        Ok(Self {
            game_id,
            config,
            config_hash,
            chain_ids,
            chain_index,
            chains,
            snapshots: RwLock::new(snapshots),
            scoring,
            ledger_store: Mutex::new(ledger_store),
            snapshot_store: Mutex::new(snapshot_store),
            events: Mutex::new(EventLog::new()),
            notifications: Mutex::new(Vec::new()),
            clock,
        })
    }

    /// Restore a game from a checkpoint taken under the same config.
    pub fn from_checkpoint(
        config: GameConfig,
        checkpoint: GameCheckpoint,
        ledger_store: Box<dyn LedgerStore>,
        snapshot_store: Box<dyn SnapshotStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, GameError> {
        validate_config(&config)?;
        let config_hash = compute_config_hash(&config)?;
        if config_hash != checkpoint.config_hash {
            return Err(GameError::CheckpointMismatch {
                expected: checkpoint.config_hash,
                actual: config_hash,
            });
        }

        let now_ms = clock.now_ms();
        let mut chain_ids = Vec::new();
        let mut chain_index = HashMap::new();
        let mut chains = Vec::new();
        let mut snapshots = HashMap::new();

        for (i, saved) in checkpoint.chains.into_iter().enumerate() {
            let chain_id = saved.snapshot.chain_id.clone();
            let mut coordinator = RoundCoordinator::restore(
                &saved.snapshot,
                saved.ledger,
                saved.demand,
                config.required_roles.clone(),
                config.timeout.clone(),
            );
            if saved.snapshot.status == ChainStatus::Active {
                coordinator.arm_deadline(now_ms);
            }
            snapshots.insert(chain_id.clone(), coordinator.snapshot());
            chain_index.insert(chain_id.clone(), i);
            chain_ids.push(chain_id);
            chains.push(Mutex::new(coordinator));
        }

        let scoring = ScoringEngine::new(config.cost_rates.clone(), config.bullwhip_window);
        log::info!("restored game {} from checkpoint", checkpoint.game_id);

        Ok(Self {
            game_id: checkpoint.game_id,
            config,
            config_hash,
            chain_ids,
            chain_index,
            chains,
            snapshots: RwLock::new(snapshots),
            scoring,
            ledger_store: Mutex::new(ledger_store),
            snapshot_store: Mutex::new(snapshot_store),
            events: Mutex::new(EventLog::new()),
            notifications: Mutex::new(Vec::new()),
            clock,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn config_hash(&self) -> &str {
        &self.config_hash
    }

    pub fn chain_ids(&self) -> &[String] {
        &self.chain_ids
    }

    /// Copy of the event log (audit view).
    pub fn events(&self) -> Vec<GameEvent> {
        self.events.lock().unwrap().events().to_vec()
    }

    /// Copy of one chain's ledger entries in append order (audit view).
    pub fn ledger_entries(&self, chain_id: &str) -> Vec<crate::ledger::LedgerEntry> {
        match self.chain_index.get(chain_id) {
            Some(&idx) => {
                let coordinator = self.chains[idx].lock().unwrap();
                coordinator.ledger().iter().cloned().collect()
            }
            None => Vec::new(),
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Seat a player on a chain. When the fourth seat fills, the chain
    /// activates automatically.
    pub fn join_chain(
        &self,
        chain_id: &str,
        role: Role,
        player_name: &str,
    ) -> Result<String, GameError> {
        let idx = self.lookup(chain_id)?;
        let player_id = generate_id("player");
        let now_ms = self.clock.now_ms();

        let mut coordinator = self.chains[idx].lock().unwrap();
        if !coordinator.seat_player(role, player_id.clone(), player_name.to_string()) {
            return Err(GameError::SeatTaken {
                chain_id: chain_id.to_string(),
                role,
            });
        }
        log::info!("player {} ({}) joined {} as {}", player_name, player_id, chain_id, role);

        let activated = if coordinator.chain().all_seated() {
            coordinator.activate(now_ms);
            true
        } else {
            false
        };
        let snapshot = coordinator.snapshot();
        drop(coordinator);

        self.publish_snapshot(snapshot);
        if activated {
            self.events.lock().unwrap().log(GameEvent::ChainActivated {
                chain_id: chain_id.to_string(),
            });
        }
        Ok(player_id)
    }

    /// Force-activate every chain (partially-automated play: empty seats
    /// are auto-played from then on).
    pub fn start(&self) {
        let now_ms = self.clock.now_ms();
        for (i, chain_id) in self.chain_ids.iter().enumerate() {
            let mut coordinator = self.chains[i].lock().unwrap();
            if coordinator.chain().status() != ChainStatus::Waiting {
                continue;
            }
            coordinator.activate(now_ms);
            let snapshot = coordinator.snapshot();
            drop(coordinator);
            self.publish_snapshot(snapshot);
            self.events.lock().unwrap().log(GameEvent::ChainActivated {
                chain_id: chain_id.clone(),
            });
        }
    }

    /// Terminally abort a chain (host escalation of an unrecoverable
    /// failure). Never automatic.
    pub fn abort_chain(&self, chain_id: &str) -> Result<(), GameError> {
        let idx = self.lookup(chain_id)?;
        let mut coordinator = self.chains[idx].lock().unwrap();
        coordinator.abort();
        let week = coordinator.chain().week();
        let snapshot = coordinator.snapshot();
        drop(coordinator);

        self.publish_snapshot(snapshot);
        self.events.lock().unwrap().log(GameEvent::ChainAborted {
            chain_id: chain_id.to_string(),
            week,
        });
        Ok(())
    }

    // ========================================================================
    // Boundary operations
    // ========================================================================

    /// Submit one idempotency-keyed action.
    ///
    /// Returns the applied effect synchronously. When this submission is the
    /// one that completes the week, the advance runs before returning but
    /// its results surface through snapshots, notifications, and events —
    /// not through this caller's result.
    pub fn submit_action(&self, action: Action) -> Result<AppliedEffect, ActionError> {
        let idx = self
            .chain_index
            .get(&action.chain_id)
            .copied()
            .ok_or_else(|| ActionError::ChainNotFound {
                chain_id: action.chain_id.clone(),
            })?;

        if self.config.lockstep {
            self.check_lockstep(&action.chain_id)?;
        }

        let now_ms = self.clock.now_ms();
        let mut coordinator = self.chains[idx].lock().unwrap();
        let result = {
            let mut store = self.ledger_store.lock().unwrap();
            coordinator.submit(&action, now_ms, store.as_mut())
        };

        match result {
            Ok(submit) => {
                let advance = submit.advance;
                drop(coordinator);
                {
                    let mut events = self.events.lock().unwrap();
                    if submit.replayed {
                        events.log(GameEvent::ActionReplayed {
                            chain_id: action.chain_id.clone(),
                            week: action.week,
                            key: action.idempotency_key.clone(),
                        });
                    } else {
                        let quantity = match &submit.effect {
                            AppliedEffect::OrderPlaced { quantity, .. } => *quantity,
                            AppliedEffect::ReadyRecorded { .. } => 0,
                        };
                        events.log(GameEvent::ActionApplied {
                            chain_id: action.chain_id.clone(),
                            week: action.week,
                            actor: action.actor,
                            quantity,
                            key: action.idempotency_key.clone(),
                        });
                    }
                }
                if let Some(outcome) = advance {
                    self.finish_advance(&action.chain_id, outcome);
                }
                Ok(submit.effect)
            }
            Err(err) => {
                drop(coordinator);
                self.events.lock().unwrap().log(GameEvent::ActionRejected {
                    chain_id: action.chain_id.clone(),
                    week: action.week,
                    key: action.idempotency_key.clone(),
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Host-placed customer order feeding a chain's Shop.
    pub fn place_customer_order(
        &self,
        chain_id: &str,
        week: usize,
        quantity: i64,
        idempotency_key: &str,
    ) -> Result<AppliedEffect, ActionError> {
        self.submit_action(Action::customer_order(
            chain_id,
            week,
            quantity,
            idempotency_key,
        ))
    }

    /// Read-only snapshot of one chain.
    pub fn get_chain_state(&self, chain_id: &str) -> Option<ChainSnapshot> {
        self.snapshots.read().unwrap().get(chain_id).cloned()
    }

    /// The synchronized aggregate view for the host.
    pub fn get_host_view(&self) -> HostView {
        let snapshots: Vec<ChainSnapshot> =
            self.snapshots.read().unwrap().values().cloned().collect();
        HostAggregator::compose(&self.game_id, snapshots, &self.scoring)
    }

    /// Per-role per-week scores for one chain through `upto_week`.
    pub fn get_score(&self, chain_id: &str, upto_week: usize) -> Vec<ScoreRecord> {
        match self.get_chain_state(chain_id) {
            Some(snapshot) => self.scoring.score_upto(&snapshot, upto_week),
            None => Vec::new(),
        }
    }

    /// Take all pending `WeekAdvanced` notifications. Delivery is
    /// at-least-once end to end; consumers dedup by `(chain_id, week)`.
    pub fn drain_notifications(&self) -> Vec<WeekAdvanced> {
        std::mem::take(&mut *self.notifications.lock().unwrap())
    }

    /// Run the round-timeout sweep across all chains. The embedding runtime
    /// owns the cadence; deadlines are never checked on the submission path.
    pub fn sweep_timeouts(&self) -> Vec<TimeoutSubstitution> {
        let now_ms = self.clock.now_ms();
        let mut all = Vec::new();
        for (i, chain_id) in self.chain_ids.iter().enumerate() {
            let mut coordinator = self.chains[i].lock().unwrap();
            let swept = {
                let mut store = self.ledger_store.lock().unwrap();
                coordinator.sweep_timeout(now_ms, store.as_mut())
            };
            drop(coordinator);
            if let Some((substitutions, outcome)) = swept {
                {
                    let mut events = self.events.lock().unwrap();
                    for sub in &substitutions {
                        events.log(GameEvent::TimeoutSubstituted {
                            chain_id: sub.chain_id.clone(),
                            week: sub.week,
                            role: sub.role,
                            quantity: sub.quantity,
                            key: sub.key.clone(),
                        });
                    }
                }
                self.finish_advance(chain_id, outcome);
                all.extend(substitutions);
            }
        }
        all
    }

    // ========================================================================
    // Factory-mode bridge
    // ========================================================================

    /// Accept throughput parameters from the factory subsystem.
    pub fn apply_bridge_update(&self, update: &BridgeUpdate) -> Result<(), GameError> {
        let idx = self.lookup(&update.target_chain_id)?;
        let mut coordinator = self.chains[idx].lock().unwrap();
        coordinator.set_production_cap(Some(update.production_rate.max(0)));
        Ok(())
    }

    /// Production metrics read back by the factory subsystem.
    pub fn bridge_reading(&self, chain_id: &str) -> Option<BridgeReading> {
        let snapshot = self.get_chain_state(chain_id)?;
        Some(BridgeReading {
            chain_id: chain_id.to_string(),
            demand_satisfied_ratio: demand_satisfied_ratio(&snapshot),
        })
    }

    // ========================================================================
    // Checkpointing
    // ========================================================================

    /// Capture the full game for later restore.
    pub fn checkpoint(&self) -> GameCheckpoint {
        let chains = self
            .chains
            .iter()
            .map(|mutex| {
                let coordinator = mutex.lock().unwrap();
                ChainCheckpoint {
                    snapshot: coordinator.snapshot(),
                    ledger: coordinator.ledger().clone(),
                    demand: coordinator.demand_generator().clone(),
                }
            })
            .collect();
        GameCheckpoint {
            game_id: self.game_id.clone(),
            config_hash: self.config_hash.clone(),
            chains,
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn lookup(&self, chain_id: &str) -> Result<usize, GameError> {
        self.chain_index
            .get(chain_id)
            .copied()
            .ok_or_else(|| GameError::ChainNotFound(chain_id.to_string()))
    }

    /// Lockstep gate: a chain ahead of the laggards may not begin its next
    /// week until every chain has caught up.
    fn check_lockstep(&self, chain_id: &str) -> Result<(), ActionError> {
        let snapshots = self.snapshots.read().unwrap();
        let chain_week = match snapshots.get(chain_id) {
            Some(s) => s.week,
            None => return Ok(()),
        };
        let all: Vec<ChainSnapshot> = snapshots.values().cloned().collect();
        drop(snapshots);
        let global_week = HostAggregator::global_week(&all);
        if !HostAggregator::lockstep_permits(chain_week, global_week) {
            return Err(ActionError::LockstepHold {
                chain_week,
                global_week,
            });
        }
        Ok(())
    }

    /// Post-advance bookkeeping: durable snapshot, snapshot table, events,
    /// notification outbox.
    fn finish_advance(&self, chain_id: &str, outcome: AdvanceOutcome) {
        let closed_week = outcome.record.week;

        // Durable snapshot of the post-advance state. A failed write is
        // logged and retried implicitly at the next advance; the in-memory
        // commit already happened and the ledger alone can rebuild the week.
        {
            let mut store = self.snapshot_store.lock().unwrap();
            if let Err(err) = store.put(chain_id, closed_week, &outcome.snapshot) {
                log::warn!(
                    "snapshot for {} week {} not persisted: {}",
                    chain_id,
                    closed_week,
                    err
                );
            }
        }

        let week_cost = self.scoring.week_cost(&outcome.snapshot, closed_week);
        {
            let mut events = self.events.lock().unwrap();
            events.log(GameEvent::WeekAdvanced {
                chain_id: chain_id.to_string(),
                week: closed_week,
                customer_demand: outcome.record.customer_demand,
                week_cost,
            });
            if outcome.completed {
                events.log(GameEvent::ChainCompleted {
                    chain_id: chain_id.to_string(),
                    week: closed_week,
                });
            }
        }

        self.notifications.lock().unwrap().push(WeekAdvanced {
            chain_id: chain_id.to_string(),
            week: closed_week,
            snapshot: outcome.snapshot.clone(),
        });

        self.publish_snapshot(outcome.snapshot);
        log::debug!("chain {} advanced past week {}", chain_id, closed_week);
    }

    fn publish_snapshot(&self, snapshot: ChainSnapshot) {
        let mut snapshots = self.snapshots.write().unwrap();
        match snapshots.get(&snapshot.chain_id) {
            // Publishes happen outside the chain lock; never let a slow
            // publisher overwrite a newer week.
            Some(existing) if existing.week > snapshot.week => {}
            _ => {
                snapshots.insert(snapshot.chain_id.clone(), snapshot);
            }
        }
    }
}

impl std::fmt::Debug for GameEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameEngine")
            .field("game_id", &self.game_id)
            .field("num_chains", &self.chain_ids.len())
            .finish()
    }
}

/// Short unique id with a type prefix, e.g. `game_1f3a9c2e`.
fn generate_id(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}", prefix, &id[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demand::{DemandConfig, DemandPattern};

    fn constant_demand_config(num_chains: usize) -> GameConfig {
        GameConfig {
            num_chains,
            demand: DemandConfig {
                pattern: DemandPattern::Constant { level: 4 },
                rng_seed: 1,
            },
            ..GameConfig::default()
        }
    }

    #[test]
    fn test_engine_creation() {
        let engine = GameEngine::new(constant_demand_config(3)).unwrap();
        assert_eq!(engine.chain_ids().len(), 3);
        for chain_id in engine.chain_ids() {
            let snapshot = engine.get_chain_state(chain_id).unwrap();
            assert_eq!(snapshot.week, 0);
            assert_eq!(snapshot.status, ChainStatus::Waiting);
        }
    }

    #[test]
    fn test_join_all_seats_activates() {
        let engine = GameEngine::new(constant_demand_config(1)).unwrap();
        let chain_id = engine.chain_ids()[0].clone();
        for (i, &role) in Role::CHAIN_ORDER.iter().enumerate() {
            let player_id = engine
                .join_chain(&chain_id, role, &format!("player-{}", i))
                .unwrap();
            assert!(player_id.starts_with("player_"));
        }
        assert_eq!(
            engine.get_chain_state(&chain_id).unwrap().status,
            ChainStatus::Active
        );
        assert_eq!(engine.events().iter().filter(|e| e.event_type() == "ChainActivated").count(), 1);
    }

    #[test]
    fn test_seat_taken() {
        let engine = GameEngine::new(constant_demand_config(1)).unwrap();
        let chain_id = engine.chain_ids()[0].clone();
        engine.join_chain(&chain_id, Role::Shop, "Alice").unwrap();
        let err = engine.join_chain(&chain_id, Role::Shop, "Bob").unwrap_err();
        assert!(matches!(err, GameError::SeatTaken { .. }));
    }

    #[test]
    fn test_submit_to_unknown_chain() {
        let engine = GameEngine::new(constant_demand_config(1)).unwrap();
        let action = Action::place_order("nope", 0, Role::Shop, 1, "k");
        let err = engine.submit_action(action).unwrap_err();
        assert!(matches!(err, ActionError::ChainNotFound { .. }));
    }

    #[test]
    fn test_full_week_emits_notification() {
        let engine = GameEngine::new(constant_demand_config(1)).unwrap();
        engine.start();
        let chain_id = engine.chain_ids()[0].clone();
        for (i, &role) in Role::CHAIN_ORDER.iter().enumerate() {
            engine
                .submit_action(Action::place_order(&chain_id, 0, role, 4, format!("k{}", i)))
                .unwrap();
        }
        let notifications = engine.drain_notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].week, 0);
        assert_eq!(notifications[0].snapshot.week, 1);
        // Drained: gone until the next advance.
        assert!(engine.drain_notifications().is_empty());
    }

    #[test]
    fn test_bridge_caps_factory_orders() {
        let engine = GameEngine::new(constant_demand_config(1)).unwrap();
        engine.start();
        let chain_id = engine.chain_ids()[0].clone();
        engine
            .apply_bridge_update(&BridgeUpdate {
                target_chain_id: chain_id.clone(),
                production_rate: 3,
            })
            .unwrap();
        let effect = engine
            .submit_action(Action::place_order(&chain_id, 0, Role::Factory, 99, "k"))
            .unwrap();
        assert_eq!(
            effect,
            AppliedEffect::OrderPlaced {
                chain_id: chain_id.clone(),
                week: 0,
                actor: crate::models::action::Actor::Role(Role::Factory),
                quantity: 3,
            }
        );
        let reading = engine.bridge_reading(&chain_id).unwrap();
        assert_eq!(reading.demand_satisfied_ratio, 1.0);
    }
}
