//! Supply Game Core - Rust Engine
//!
//! Turn-based multi-chain supply chain simulator with deterministic
//! execution. Several independent chains (Shop → Retailer → Wholesaler →
//! Factory) progress through weekly rounds; shipments arrive after a fixed
//! transport lag, retried player actions are deduplicated through an
//! idempotency ledger, and a read-only host view composes every chain into
//! one synchronized dashboard.
//!
//! # Architecture
//!
//! - **core**: clock seam (ledger timestamps, timeout deadlines)
//! - **models**: domain types (Role, OrderPipeline, RoleState, ChainState, Action)
//! - **ledger**: idempotency record (key → applied effect)
//! - **scoring**: holding/backorder costs and the bullwhip metric
//! - **events**: audit log of everything that happened
//! - **demand**: customer demand patterns
//! - **coordinator**: per-chain round state machine + multi-chain engine
//! - **host**: read-only aggregate view
//! - **persist**: durable store contracts (ledger append, chain snapshots)
//! - **bridge**: narrow typed exchange with the factory-mode subsystem
//! - **rng**: deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. All money values are i64 (cents)
//! 2. All randomness is deterministic (seeded RNG)
//! 3. An idempotency key mutates state at most once
//! 4. Readers consume immutable snapshots, never live chain state

// Module declarations
pub mod bridge;
pub mod coordinator;
pub mod core;
pub mod demand;
pub mod events;
pub mod host;
pub mod ledger;
pub mod models;
pub mod persist;
pub mod rng;
pub mod scoring;

// Re-exports for convenience
pub use coordinator::{
    engine::{ChainCheckpoint, GameCheckpoint},
    FallbackOrder, GameConfig, GameEngine, GameError, RoundCoordinator, RoundPhase,
    TimeoutPolicy, TimeoutSubstitution, WeekAdvanced,
};
pub use demand::{DemandConfig, DemandGenerator, DemandPattern};
pub use events::{EventLog, GameEvent};
pub use host::{HostAggregator, HostView};
pub use ledger::{EventLedger, LedgerEntry, RecordedEffect};
pub use models::{
    Action, ActionError, ActionKind, Actor, AppliedEffect, ChainSnapshot, ChainState,
    ChainStatus, OrderPipeline, PipelineError, Role, RoleState,
};
pub use persist::{
    InMemoryLedgerStore, InMemorySnapshotStore, LedgerStore, PersistError, SnapshotStore,
};
pub use rng::RngManager;
pub use scoring::{CostRates, ScoreRecord, ScoringEngine};

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

// PyO3 exports (when feature enabled)
#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn supply_game_core_rs(_py: Python<'_>, m: &PyModule) -> PyResult<()> {
    m.add_class::<ffi::engine::PyGameEngine>()?;
    Ok(())
}
