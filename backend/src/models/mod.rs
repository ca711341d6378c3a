//! Domain models for the supply chain simulation.

pub mod action;
pub mod chain;
pub mod pipeline;
pub mod role;
pub mod role_state;

pub use action::{Action, ActionError, ActionKind, Actor, AppliedEffect};
pub use chain::{ChainSnapshot, ChainState, ChainStatus, RoleSnapshot, RoleWeek, WeekRecord};
pub use pipeline::{OrderPipeline, PipelineError};
pub use role::{DemandSource, Role};
pub use role_state::{PlayerSeat, RoleState};
