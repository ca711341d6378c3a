//! Factory-mode bridge
//!
//! Narrow, typed exchange with the real-time factory subsystem. The factory
//! engine's internal grid/recipe logic is entirely external to this core:
//! it sends a computed production rate for a chain, and reads back how well
//! that chain is satisfying end-customer demand.

use crate::models::chain::ChainSnapshot;
use crate::models::role::Role;
use serde::{Deserialize, Serialize};

/// Throughput parameters pushed from the factory subsystem.
///
/// The production rate caps the Factory role's weekly order quantity (its
/// production capacity).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeUpdate {
    pub target_chain_id: String,
    pub production_rate: i64,
}

/// Production metrics read back by the factory subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeReading {
    pub chain_id: String,
    /// Units shipped to end customers ÷ units demanded, over recorded
    /// history; 1.0 when no demand has been dealt yet
    pub demand_satisfied_ratio: f64,
}

/// Fraction of end-customer demand the chain has satisfied so far.
///
/// Shipped quantity per week is reconstructed from the Shop's recorded
/// series: shipped_w = demand_w + backlog_{w-1} - backlog_w.
pub fn demand_satisfied_ratio(snapshot: &ChainSnapshot) -> f64 {
    let shop = snapshot.role(Role::Shop);
    let demanded: i64 = shop.demand_received.iter().sum();
    if demanded == 0 {
        return 1.0;
    }
    let mut shipped = 0i64;
    let mut prev_backlog = 0i64;
    for (week, &demand) in shop.demand_received.iter().enumerate() {
        let backlog = shop.backlog_history[week];
        shipped += demand + prev_backlog - backlog;
        prev_backlog = backlog;
    }
    shipped as f64 / demanded as f64
}
