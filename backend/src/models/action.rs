//! Action model
//!
//! A player (or the host, acting as the synthetic customer feeding the Shop)
//! submits exactly one action per week per seat. Every action carries a
//! caller-supplied idempotency key: retried submissions are safe because the
//! coordinator replays the recorded effect instead of re-mutating state.

use crate::models::chain::ChainStatus;
use crate::models::role::Role;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Who is acting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Actor {
    /// The synthetic end-customer producer feeding the Shop
    Customer,
    /// One of the four chain roles
    Role(Role),
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actor::Customer => f.write_str("Customer"),
            Actor::Role(role) => write!(f, "{}", role),
        }
    }
}

/// What the actor wants to do this week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    /// Order `quantity` units from upstream (or from production, for the Factory)
    PlaceOrder { quantity: i64 },

    /// Mark the seat as done for the week without ordering (order of zero)
    Advance,
}

/// One validated, idempotency-keyed submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub chain_id: String,
    pub week: usize,
    pub actor: Actor,
    pub kind: ActionKind,
    pub idempotency_key: String,
}

impl Action {
    /// A role's weekly order.
    pub fn place_order(
        chain_id: impl Into<String>,
        week: usize,
        role: Role,
        quantity: i64,
        idempotency_key: impl Into<String>,
    ) -> Self {
        Self {
            chain_id: chain_id.into(),
            week,
            actor: Actor::Role(role),
            kind: ActionKind::PlaceOrder { quantity },
            idempotency_key: idempotency_key.into(),
        }
    }

    /// A role passing its turn (no new order this week).
    pub fn advance(
        chain_id: impl Into<String>,
        week: usize,
        role: Role,
        idempotency_key: impl Into<String>,
    ) -> Self {
        Self {
            chain_id: chain_id.into(),
            week,
            actor: Actor::Role(role),
            kind: ActionKind::Advance,
            idempotency_key: idempotency_key.into(),
        }
    }

    /// A host-placed customer order for the chain's Shop.
    pub fn customer_order(
        chain_id: impl Into<String>,
        week: usize,
        quantity: i64,
        idempotency_key: impl Into<String>,
    ) -> Self {
        Self {
            chain_id: chain_id.into(),
            week,
            actor: Actor::Customer,
            kind: ActionKind::PlaceOrder { quantity },
            idempotency_key: idempotency_key.into(),
        }
    }
}

/// The effect a successfully applied action had on the chain.
///
/// Replaying the same idempotency key returns this value verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AppliedEffect {
    /// An order entered the pipelines
    OrderPlaced {
        chain_id: String,
        week: usize,
        actor: Actor,
        quantity: i64,
    },

    /// A role marked itself done without ordering
    ReadyRecorded {
        chain_id: String,
        week: usize,
        role: Role,
    },
}

/// Errors returned synchronously on action submission.
///
/// Validation failures never partially mutate state. `PersistenceUnavailable`
/// means the action was NOT applied; retrying the same idempotency key is
/// safe.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum ActionError {
    #[error("quantity must be non-negative, got {quantity}")]
    InvalidQuantity { quantity: i64 },

    #[error("{role} has already acted for week {week}")]
    RoleAlreadyActed { role: Role, week: usize },

    #[error("a customer order is already recorded for week {week}")]
    CustomerAlreadyOrdered { week: usize },

    #[error("idempotency key {key:?} was already used for a different action")]
    ConflictingIdempotencyKey { key: String },

    #[error("chain {chain_id} is not active (status {status:?})")]
    ChainNotActive {
        chain_id: String,
        status: ChainStatus,
    },

    #[error("chain {chain_id} not found")]
    ChainNotFound { chain_id: String },

    #[error("action targets week {submitted} but the chain is at week {current}")]
    WeekMismatch { submitted: usize, current: usize },

    #[error("lockstep hold: chain is at week {chain_week}, laggards are at week {global_week}")]
    LockstepHold {
        chain_week: usize,
        global_week: usize,
    },

    #[error("durable write failed, action not applied: {reason}")]
    PersistenceUnavailable { reason: String },
}
