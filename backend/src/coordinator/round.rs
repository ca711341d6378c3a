//! Round coordinator — the per-chain state machine
//!
//! Enforces phase ordering within a week and idempotent application of
//! player actions. Each coordinator owns exclusive write access to its
//! ChainState, its pipelines, and its EventLedger partition; everything the
//! rest of the system reads comes from immutable snapshots taken here.
//!
//! # Phases
//!
//! ```text
//! AwaitingActions ──(last required action lands)──► WeekReady ──► Advancing
//!        ▲                                                            │
//!        └──────────────── week + 1 ─────────────────────────────────┘
//! ```
//!
//! Terminal: the chain completes at the configured week count, or aborts by
//! host escalation. Roles submit concurrently *within* a week — a role's
//! decision depends only on arrivals posted by the previous advance, never
//! on sibling submissions — but the advance itself waits for every required
//! role.
//!
//! # Idempotency protocol
//!
//! 1. unseen key → validate → durably append the ledger entry → mutate →
//!    commit the entry in memory → return the effect.
//! 2. seen key, same (chain, week, actor) → return the recorded effect (or
//!    recorded rejection) verbatim, no mutation.
//! 3. seen key, different scope → `ConflictingIdempotencyKey` (caller bug).
//!
//! Deterministic validation failures (bad payload, duplicate seat, stale
//! week) are remembered as rejections so a retry storm cannot amplify into
//! repeated validation work. Transient conditions (chain not yet active,
//! lockstep hold, persistence failure) are NOT remembered: retrying the same
//! key once the condition clears must be able to succeed.

use crate::coordinator::{FallbackOrder, TimeoutPolicy, TimeoutSubstitution};
use crate::demand::DemandGenerator;
use crate::ledger::{EventLedger, RecordedEffect};
use crate::models::action::{Action, ActionError, ActionKind, Actor, AppliedEffect};
use crate::models::chain::{ChainSnapshot, ChainState, ChainStatus, WeekRecord};
use crate::models::role::Role;
use crate::persist::LedgerStore;
use std::collections::HashMap;

/// Observable phase of the per-week state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// One or more required roles have not yet submitted
    AwaitingActions,
    /// All required actions recorded; the advance is imminent
    WeekReady,
    /// Pipelines shifting, arrivals/demand applying
    Advancing,
}

/// Everything that happened when a week closed.
#[derive(Debug, Clone)]
pub struct AdvanceOutcome {
    /// Per-role record of the closed week
    pub record: WeekRecord,

    /// Post-advance snapshot for stores, notifications, and readers
    pub snapshot: ChainSnapshot,

    /// Auto-played orders for roles outside the required set
    pub auto_filled: Vec<(Role, i64)>,

    /// The advance reached the configured week count
    pub completed: bool,
}

/// Result of a single submission.
#[derive(Debug, Clone)]
pub struct SubmitResult {
    pub effect: AppliedEffect,

    /// The effect came from the ledger (seen key), not a fresh mutation
    pub replayed: bool,

    /// Present when this submission was the one that closed the week
    pub advance: Option<AdvanceOutcome>,
}

/// Per-chain round state machine. See module docs.
#[derive(Debug)]
pub struct RoundCoordinator {
    chain: ChainState,
    ledger: EventLedger,
    demand: DemandGenerator,
    required_roles: Vec<Role>,
    timeout: TimeoutPolicy,
    phase: RoundPhase,

    /// Validated order quantity per role for the current week
    week_actions: HashMap<Role, i64>,

    /// Host-placed customer order awaiting the advance
    pending_customer_order: Option<i64>,

    /// Armed deadline for the current week (timeout policy)
    deadline_ms: Option<u64>,

    /// Factory production capacity pushed from the factory-mode bridge
    production_cap: Option<i64>,
}

impl RoundCoordinator {
    pub fn new(
        chain: ChainState,
        demand: DemandGenerator,
        required_roles: Vec<Role>,
        timeout: TimeoutPolicy,
    ) -> Self {
        let ledger = EventLedger::new(chain.chain_id().to_string());
        Self {
            chain,
            ledger,
            demand,
            required_roles,
            timeout,
            phase: RoundPhase::AwaitingActions,
            week_actions: HashMap::new(),
            pending_customer_order: None,
            deadline_ms: None,
            production_cap: None,
        }
    }

    /// Rebuild a coordinator from persisted state: the latest chain
    /// snapshot plus the chain's durable ledger entries. In-flight actions
    /// for the current week are recovered from the ledger.
    pub fn restore(
        snapshot: &ChainSnapshot,
        ledger: EventLedger,
        demand: DemandGenerator,
        required_roles: Vec<Role>,
        timeout: TimeoutPolicy,
    ) -> Self {
        let chain = ChainState::from(snapshot);
        let mut week_actions = HashMap::new();
        let mut pending_customer_order = None;
        for entry in ledger.iter() {
            if entry.week != chain.week() {
                continue;
            }
            match &entry.effect {
                RecordedEffect::Applied(AppliedEffect::OrderPlaced {
                    actor: Actor::Role(role),
                    quantity,
                    ..
                }) => {
                    week_actions.insert(*role, *quantity);
                }
                RecordedEffect::Applied(AppliedEffect::ReadyRecorded { role, .. }) => {
                    week_actions.insert(*role, 0);
                }
                RecordedEffect::Applied(AppliedEffect::OrderPlaced {
                    actor: Actor::Customer,
                    quantity,
                    ..
                }) => {
                    pending_customer_order = Some(*quantity);
                }
                RecordedEffect::Rejected(_) => {}
            }
        }
        Self {
            chain,
            ledger,
            demand,
            required_roles,
            timeout,
            phase: RoundPhase::AwaitingActions,
            week_actions,
            pending_customer_order,
            deadline_ms: None,
            production_cap: None,
        }
    }

    pub fn chain(&self) -> &ChainState {
        &self.chain
    }

    pub fn ledger(&self) -> &EventLedger {
        &self.ledger
    }

    pub fn demand_generator(&self) -> &DemandGenerator {
        &self.demand
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn snapshot(&self) -> ChainSnapshot {
        ChainSnapshot::from(&self.chain)
    }

    /// Seat a player; false when the seat is taken.
    pub fn seat_player(&mut self, role: Role, player_id: String, player_name: String) -> bool {
        self.chain.role_mut(role).seat_player(player_id, player_name)
    }

    /// Activate the chain and arm this week's deadline.
    pub fn activate(&mut self, now_ms: u64) {
        self.chain.activate();
        self.arm_deadline(now_ms);
    }

    /// Terminally abort the chain (host escalation).
    pub fn abort(&mut self) {
        self.chain.abort();
        self.deadline_ms = None;
    }

    /// Set or clear the Factory's production capacity (factory-mode bridge).
    pub fn set_production_cap(&mut self, cap: Option<i64>) {
        self.production_cap = cap;
    }

    /// Arm the round-timeout deadline for the current week.
    pub fn arm_deadline(&mut self, now_ms: u64) {
        if let TimeoutPolicy::AutoSubstitute { deadline_ms, .. } = &self.timeout {
            if self.chain.status() == ChainStatus::Active {
                self.deadline_ms = Some(now_ms + deadline_ms);
            }
        }
    }

    /// Submit one action. See module docs for the idempotency protocol.
    ///
    /// The durable ledger append happens before any mutation: a
    /// `PersistenceUnavailable` return means the action was NOT applied and
    /// retrying the same key is safe.
    pub fn submit(
        &mut self,
        action: &Action,
        now_ms: u64,
        store: &mut dyn LedgerStore,
    ) -> Result<SubmitResult, ActionError> {
        // Seen key: replay or conflict.
        if let Some(entry) = self.ledger.get(&action.idempotency_key) {
            if entry.chain_id == action.chain_id
                && entry.week == action.week
                && entry.actor == action.actor
            {
                return match &entry.effect {
                    RecordedEffect::Applied(effect) => Ok(SubmitResult {
                        effect: effect.clone(),
                        replayed: true,
                        advance: None,
                    }),
                    RecordedEffect::Rejected(err) => Err(err.clone()),
                };
            }
            return Err(ActionError::ConflictingIdempotencyKey {
                key: action.idempotency_key.clone(),
            });
        }

        // Validate. Deterministic failures are remembered as rejections.
        if let Err(err) = self.validate(action) {
            if is_remembered_rejection(&err) {
                self.record_rejection(action, err.clone(), now_ms, store);
            }
            return Err(err);
        }

        // Build the effect, durably append it, then mutate.
        let effect = self.build_effect(action);
        let entry = self.ledger.build_entry(
            action.idempotency_key.clone(),
            action.week,
            action.actor,
            RecordedEffect::Applied(effect.clone()),
            now_ms,
        );
        if let Err(persist_err) = store.append(self.chain.chain_id(), &entry) {
            return Err(ActionError::PersistenceUnavailable {
                reason: persist_err.to_string(),
            });
        }

        self.apply(action, &effect);
        self.ledger.record(entry);

        // The advance is a consequence of the last required action landing,
        // decoupled from any single caller's validation result.
        let advance = if self.ready() {
            self.phase = RoundPhase::WeekReady;
            Some(self.advance_now(now_ms, store))
        } else {
            None
        };

        Ok(SubmitResult {
            effect,
            replayed: false,
            advance,
        })
    }

    /// Check the armed deadline and, if it has lapsed, substitute default
    /// actions for every silent required role and advance the week.
    ///
    /// Fires at most once per armed week: the deadline is cleared before
    /// substitution and re-armed by the advance.
    pub fn sweep_timeout(
        &mut self,
        now_ms: u64,
        store: &mut dyn LedgerStore,
    ) -> Option<(Vec<TimeoutSubstitution>, AdvanceOutcome)> {
        let fallback = match &self.timeout {
            TimeoutPolicy::AutoSubstitute { fallback, .. } => *fallback,
            TimeoutPolicy::Disabled => return None,
        };
        if self.chain.status() != ChainStatus::Active {
            return None;
        }
        let deadline = self.deadline_ms?;
        if now_ms < deadline || self.ready() {
            return None;
        }
        self.deadline_ms = None;

        let week = self.chain.week();
        let missing: Vec<Role> = Role::CHAIN_ORDER
            .iter()
            .copied()
            .filter(|role| {
                self.required_roles.contains(role) && !self.week_actions.contains_key(role)
            })
            .collect();

        let mut substitutions = Vec::with_capacity(missing.len());
        for role in missing {
            let quantity = match fallback {
                FallbackOrder::RepeatLastOrder => self.last_order(role),
                FallbackOrder::Constant(q) => q.max(0),
            };
            let key = format!("timeout:{}:{}:{}", self.chain.chain_id(), week, role);
            let effect = AppliedEffect::OrderPlaced {
                chain_id: self.chain.chain_id().to_string(),
                week,
                actor: Actor::Role(role),
                quantity,
            };
            let entry = self.ledger.build_entry(
                key.clone(),
                week,
                Actor::Role(role),
                RecordedEffect::Applied(effect),
                now_ms,
            );
            if let Err(err) = store.append(self.chain.chain_id(), &entry) {
                // Substitution must stay durable; re-arm and retry on the
                // next sweep.
                log::warn!(
                    "timeout substitution for {} week {} not persisted: {}",
                    self.chain.chain_id(),
                    week,
                    err
                );
                self.deadline_ms = Some(deadline);
                return None;
            }
            self.chain
                .role_mut(role)
                .place_order(quantity)
                .expect("fallback quantity is non-negative");
            self.week_actions.insert(role, quantity);
            self.ledger.record(entry);
            substitutions.push(TimeoutSubstitution {
                chain_id: self.chain.chain_id().to_string(),
                week,
                role,
                quantity,
                key,
            });
        }

        self.phase = RoundPhase::WeekReady;
        let outcome = self.advance_now(now_ms, store);
        Some((substitutions, outcome))
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn validate(&self, action: &Action) -> Result<(), ActionError> {
        if self.chain.status() != ChainStatus::Active {
            return Err(ActionError::ChainNotActive {
                chain_id: self.chain.chain_id().to_string(),
                status: self.chain.status(),
            });
        }
        if action.week != self.chain.week() {
            return Err(ActionError::WeekMismatch {
                submitted: action.week,
                current: self.chain.week(),
            });
        }
        match action.actor {
            Actor::Role(role) => {
                if self.week_actions.contains_key(&role) {
                    return Err(ActionError::RoleAlreadyActed {
                        role,
                        week: action.week,
                    });
                }
            }
            Actor::Customer => {
                if self.pending_customer_order.is_some() {
                    return Err(ActionError::CustomerAlreadyOrdered { week: action.week });
                }
            }
        }
        if let ActionKind::PlaceOrder { quantity } = action.kind {
            if quantity < 0 {
                return Err(ActionError::InvalidQuantity { quantity });
            }
        }
        Ok(())
    }

    /// The effect this validated action will have once applied.
    fn build_effect(&self, action: &Action) -> AppliedEffect {
        match (&action.actor, &action.kind) {
            (Actor::Role(role), ActionKind::PlaceOrder { quantity }) => {
                AppliedEffect::OrderPlaced {
                    chain_id: action.chain_id.clone(),
                    week: action.week,
                    actor: action.actor,
                    quantity: self.capped_quantity(*role, *quantity),
                }
            }
            (Actor::Role(role), ActionKind::Advance) => AppliedEffect::ReadyRecorded {
                chain_id: action.chain_id.clone(),
                week: action.week,
                role: *role,
            },
            (Actor::Customer, ActionKind::PlaceOrder { quantity }) => {
                AppliedEffect::OrderPlaced {
                    chain_id: action.chain_id.clone(),
                    week: action.week,
                    actor: Actor::Customer,
                    quantity: *quantity,
                }
            }
            // A customer "pass" is an order of zero.
            (Actor::Customer, ActionKind::Advance) => AppliedEffect::OrderPlaced {
                chain_id: action.chain_id.clone(),
                week: action.week,
                actor: Actor::Customer,
                quantity: 0,
            },
        }
    }

    /// The Factory cannot order beyond its production capacity.
    fn capped_quantity(&self, role: Role, quantity: i64) -> i64 {
        match (role, self.production_cap) {
            (Role::Factory, Some(cap)) => quantity.min(cap.max(0)),
            _ => quantity,
        }
    }

    fn apply(&mut self, action: &Action, effect: &AppliedEffect) {
        match (action.actor, effect) {
            (Actor::Customer, AppliedEffect::OrderPlaced { quantity, .. }) => {
                self.pending_customer_order = Some(*quantity);
            }
            (Actor::Role(role), AppliedEffect::OrderPlaced { quantity, .. }) => {
                self.chain
                    .role_mut(role)
                    .place_order(*quantity)
                    .expect("quantity validated non-negative");
                self.week_actions.insert(role, *quantity);
            }
            (Actor::Role(role), AppliedEffect::ReadyRecorded { .. }) => {
                self.chain
                    .role_mut(role)
                    .place_order(0)
                    .expect("zero order is valid");
                self.week_actions.insert(role, 0);
            }
            (Actor::Customer, AppliedEffect::ReadyRecorded { .. }) => unreachable!(),
        }
    }

    fn record_rejection(
        &mut self,
        action: &Action,
        err: ActionError,
        now_ms: u64,
        store: &mut dyn LedgerStore,
    ) {
        let entry = self.ledger.build_entry(
            action.idempotency_key.clone(),
            action.week,
            action.actor,
            RecordedEffect::Rejected(err),
            now_ms,
        );
        if let Err(persist_err) = store.append(self.chain.chain_id(), &entry) {
            // The rejection itself is re-derivable; remember it in memory
            // even when the durable append fails.
            log::warn!(
                "rejection for key {} not persisted: {}",
                entry.key,
                persist_err
            );
        }
        self.ledger.record(entry);
    }

    fn ready(&self) -> bool {
        self.required_roles
            .iter()
            .all(|role| self.week_actions.contains_key(role))
    }

    fn last_order(&self, role: Role) -> i64 {
        self.chain
            .role(role)
            .orders_placed()
            .last()
            .copied()
            .unwrap_or(0)
    }

    /// Execute the `Advancing` transition. Caller guarantees readiness.
    fn advance_now(&mut self, now_ms: u64, store: &mut dyn LedgerStore) -> AdvanceOutcome {
        self.phase = RoundPhase::Advancing;
        let week = self.chain.week();

        // Roles outside the required set are auto-played: repeat last order.
        let mut auto_filled = Vec::new();
        for &role in &Role::CHAIN_ORDER {
            if self.week_actions.contains_key(&role) {
                continue;
            }
            let quantity = self.last_order(role);
            let key = format!("auto:{}:{}:{}", self.chain.chain_id(), week, role);
            let entry = self.ledger.build_entry(
                key,
                week,
                Actor::Role(role),
                RecordedEffect::Applied(AppliedEffect::OrderPlaced {
                    chain_id: self.chain.chain_id().to_string(),
                    week,
                    actor: Actor::Role(role),
                    quantity,
                }),
                now_ms,
            );
            if let Err(err) = store.append(self.chain.chain_id(), &entry) {
                log::warn!("auto-fill entry not persisted: {}", err);
            }
            self.chain
                .role_mut(role)
                .place_order(quantity)
                .expect("auto-fill quantity is non-negative");
            self.week_actions.insert(role, quantity);
            self.ledger.record(entry);
            auto_filled.push((role, quantity));
        }

        let customer_order = self
            .pending_customer_order
            .take()
            .unwrap_or_else(|| self.demand.demand_for_week(week));

        let record = self.chain.advance_week(customer_order);
        let completed = self.chain.status() == ChainStatus::Completed;

        self.week_actions.clear();
        self.phase = RoundPhase::AwaitingActions;
        self.deadline_ms = None;
        if !completed {
            self.arm_deadline(now_ms);
        }

        AdvanceOutcome {
            snapshot: ChainSnapshot::from(&self.chain),
            record,
            auto_filled,
            completed,
        }
    }
}

/// Deterministic validation failures are remembered; transient conditions
/// are not (retrying the same key once they clear must succeed).
fn is_remembered_rejection(err: &ActionError) -> bool {
    matches!(
        err,
        ActionError::InvalidQuantity { .. }
            | ActionError::RoleAlreadyActed { .. }
            | ActionError::CustomerAlreadyOrdered { .. }
            | ActionError::WeekMismatch { .. }
    )
}
