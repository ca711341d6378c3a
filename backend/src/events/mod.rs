//! Event logging for audit and replay.
//!
//! Captures every significant state change during a game: actions applied or
//! rejected, weeks advancing, timeout substitutions, chain lifecycle edges.
//! The log is how the engine explains itself after the fact — the ledger
//! answers "was this key applied?", the event log answers "what happened and
//! in what order?".

use crate::models::action::Actor;
use crate::models::role::Role;
use serde::{Deserialize, Serialize};

/// A significant state change, tagged with the chain and week it touched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A chain moved from Waiting to Active
    ChainActivated { chain_id: String },

    /// A validated action mutated the chain
    ActionApplied {
        chain_id: String,
        week: usize,
        actor: Actor,
        quantity: i64,
        key: String,
    },

    /// A seen idempotency key returned its recorded effect without mutation
    ActionReplayed {
        chain_id: String,
        week: usize,
        key: String,
    },

    /// A submission was rejected (and the rejection remembered)
    ActionRejected {
        chain_id: String,
        week: usize,
        key: String,
        reason: String,
    },

    /// The round-timeout policy auto-filled a missing action
    TimeoutSubstituted {
        chain_id: String,
        week: usize,
        role: Role,
        quantity: i64,
        key: String,
    },

    /// A week closed: pipelines shifted, demand fulfilled, scores recomputed
    WeekAdvanced {
        chain_id: String,
        week: usize,
        customer_demand: i64,
        week_cost: i64,
    },

    /// The chain reached its configured week count
    ChainCompleted { chain_id: String, week: usize },

    /// The chain was terminally aborted
    ChainAborted { chain_id: String, week: usize },
}

impl GameEvent {
    /// The chain this event belongs to.
    pub fn chain_id(&self) -> &str {
        match self {
            GameEvent::ChainActivated { chain_id }
            | GameEvent::ActionApplied { chain_id, .. }
            | GameEvent::ActionReplayed { chain_id, .. }
            | GameEvent::ActionRejected { chain_id, .. }
            | GameEvent::TimeoutSubstituted { chain_id, .. }
            | GameEvent::WeekAdvanced { chain_id, .. }
            | GameEvent::ChainCompleted { chain_id, .. }
            | GameEvent::ChainAborted { chain_id, .. } => chain_id,
        }
    }

    /// The week the event relates to, if any.
    pub fn week(&self) -> Option<usize> {
        match self {
            GameEvent::ChainActivated { .. } => None,
            GameEvent::ActionApplied { week, .. }
            | GameEvent::ActionReplayed { week, .. }
            | GameEvent::ActionRejected { week, .. }
            | GameEvent::TimeoutSubstituted { week, .. }
            | GameEvent::WeekAdvanced { week, .. }
            | GameEvent::ChainCompleted { week, .. }
            | GameEvent::ChainAborted { week, .. } => Some(*week),
        }
    }

    /// Short event type name for filtering.
    pub fn event_type(&self) -> &'static str {
        match self {
            GameEvent::ChainActivated { .. } => "ChainActivated",
            GameEvent::ActionApplied { .. } => "ActionApplied",
            GameEvent::ActionReplayed { .. } => "ActionReplayed",
            GameEvent::ActionRejected { .. } => "ActionRejected",
            GameEvent::TimeoutSubstituted { .. } => "TimeoutSubstituted",
            GameEvent::WeekAdvanced { .. } => "WeekAdvanced",
            GameEvent::ChainCompleted { .. } => "ChainCompleted",
            GameEvent::ChainAborted { .. } => "ChainAborted",
        }
    }
}

/// Append-only in-memory event log with simple query helpers.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<GameEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn log(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn events_for_chain(&self, chain_id: &str) -> Vec<&GameEvent> {
        self.events
            .iter()
            .filter(|e| e.chain_id() == chain_id)
            .collect()
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<&GameEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_and_query() {
        let mut log = EventLog::new();
        assert!(log.is_empty());

        log.log(GameEvent::ChainActivated {
            chain_id: "chain_0".to_string(),
        });
        log.log(GameEvent::WeekAdvanced {
            chain_id: "chain_0".to_string(),
            week: 0,
            customer_demand: 4,
            week_cost: 20_000,
        });
        log.log(GameEvent::WeekAdvanced {
            chain_id: "chain_1".to_string(),
            week: 0,
            customer_demand: 4,
            week_cost: 18_000,
        });

        assert_eq!(log.len(), 3);
        assert_eq!(log.events_for_chain("chain_0").len(), 2);
        assert_eq!(log.events_of_type("WeekAdvanced").len(), 2);
    }

    #[test]
    fn test_event_accessors() {
        let event = GameEvent::TimeoutSubstituted {
            chain_id: "chain_0".to_string(),
            week: 3,
            role: Role::Wholesaler,
            quantity: 6,
            key: "timeout:chain_0:3:Wholesaler".to_string(),
        };
        assert_eq!(event.chain_id(), "chain_0");
        assert_eq!(event.week(), Some(3));
        assert_eq!(event.event_type(), "TimeoutSubstituted");

        let event = GameEvent::ChainActivated {
            chain_id: "chain_0".to_string(),
        };
        assert_eq!(event.week(), None);
    }
}
