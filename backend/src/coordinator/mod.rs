//! Round coordination
//!
//! The synchronization core: per-chain round state machines
//! ([`round::RoundCoordinator`]) and the multi-chain engine
//! ([`engine::GameEngine`]) that owns them, plus the configuration types
//! shared by both.

pub mod engine;
pub mod round;

pub use engine::GameEngine;
pub use round::{AdvanceOutcome, RoundCoordinator, RoundPhase, SubmitResult};

use crate::demand::DemandConfig;
use crate::models::chain::ChainSnapshot;
use crate::models::role::Role;
use crate::persist::PersistError;
use crate::scoring::CostRates;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Complete game configuration.
///
/// # Example
/// ```
/// use supply_game_core_rs::coordinator::GameConfig;
///
/// let config = GameConfig {
///     num_chains: 2,
///     weeks_total: 26,
///     ..GameConfig::default()
/// };
/// assert_eq!(config.shipment_lag, 4);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Number of competing supply chains
    pub num_chains: usize,

    /// Weeks to play before chains complete
    pub weeks_total: usize,

    /// Transit delay for shipments/production, in weeks
    pub shipment_lag: usize,

    /// Transit delay for order transmission, in weeks (0 = upstream sees
    /// the downstream order the same week)
    pub order_lag: usize,

    /// Starting inventory per role
    pub initial_inventory: i64,

    /// Holding/backorder cost rates (cents per unit-week)
    pub cost_rates: CostRates,

    /// Customer demand stream configuration
    pub demand: DemandConfig,

    /// Roles whose action gates the week advance. Roles not listed here are
    /// auto-played (repeat last order) when the week closes.
    pub required_roles: Vec<Role>,

    /// Round-timeout policy (off by default)
    pub timeout: TimeoutPolicy,

    /// Lockstep mode: no chain begins week N+1 until every chain has
    /// completed week N
    pub lockstep: bool,

    /// Trailing window for the bullwhip metric; `None` = full history
    pub bullwhip_window: Option<usize>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            num_chains: 1,
            weeks_total: 52,
            shipment_lag: 4,
            order_lag: 0,
            initial_inventory: 100,
            cost_rates: CostRates::default(),
            demand: DemandConfig::default(),
            required_roles: Role::CHAIN_ORDER.to_vec(),
            timeout: TimeoutPolicy::Disabled,
            lockstep: false,
            bullwhip_window: None,
        }
    }
}

/// What to do about a chain whose week never fills up with actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TimeoutPolicy {
    /// Wait indefinitely (default): the chain stays in `AwaitingActions`
    Disabled,

    /// After `deadline_ms` of wall time per week, substitute a default
    /// action for every missing required role and advance
    AutoSubstitute {
        deadline_ms: u64,
        fallback: FallbackOrder,
    },
}

/// The default action substituted for a silent role.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FallbackOrder {
    /// Repeat the role's last placed order (0 if it never ordered)
    RepeatLastOrder,

    /// Order a fixed quantity
    Constant(i64),
}

/// Push notification emitted after each successful advance.
///
/// Delivery is at-least-once; consumers must dedup by `(chain_id, week)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekAdvanced {
    pub chain_id: String,
    /// The week the advance closed
    pub week: usize,
    pub snapshot: ChainSnapshot,
}

/// Record of one auto-filled action from the timeout sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeoutSubstitution {
    pub chain_id: String,
    pub week: usize,
    pub role: Role,
    pub quantity: i64,
    /// Synthetic idempotency key, distinguishable from player keys
    pub key: String,
}

/// Game-level (non-action) failures.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GameError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("chain {0} not found")]
    ChainNotFound(String),

    #[error("seat {role} on chain {chain_id} is already taken")]
    SeatTaken { chain_id: String, role: Role },

    #[error("checkpoint was created under a different config (expected hash {expected}, got {actual})")]
    CheckpointMismatch { expected: String, actual: String },

    #[error(transparent)]
    Persist(#[from] PersistError),
}

pub(crate) fn validate_config(config: &GameConfig) -> Result<(), GameError> {
    if config.num_chains == 0 {
        return Err(GameError::InvalidConfig(
            "num_chains must be > 0".to_string(),
        ));
    }
    if config.weeks_total == 0 {
        return Err(GameError::InvalidConfig(
            "weeks_total must be > 0".to_string(),
        ));
    }
    if config.initial_inventory < 0 {
        return Err(GameError::InvalidConfig(
            "initial_inventory must be non-negative".to_string(),
        ));
    }
    if config.required_roles.is_empty() {
        return Err(GameError::InvalidConfig(
            "required_roles must not be empty".to_string(),
        ));
    }
    let mut seen = std::collections::HashSet::new();
    for role in &config.required_roles {
        if !seen.insert(role) {
            return Err(GameError::InvalidConfig(format!(
                "duplicate required role: {}",
                role
            )));
        }
    }
    if let TimeoutPolicy::AutoSubstitute { deadline_ms, .. } = &config.timeout {
        if *deadline_ms == 0 {
            return Err(GameError::InvalidConfig(
                "timeout deadline_ms must be > 0".to_string(),
            ));
        }
    }
    Ok(())
}
