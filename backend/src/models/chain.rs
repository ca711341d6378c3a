//! Chain state model
//!
//! A complete four-role chain: the RoleStates in chain order, the customer
//! demand link feeding the Shop, the chain's week index, and its lifecycle
//! status. All four roles always share the chain's week index — only the
//! round coordinator's advance moves it, and it moves all roles together.
//!
//! Week arithmetic: "week N's advance" is the transition that closes week N.
//! A quantity ordered during week W is released by the advance closing week
//! W + lag.

use crate::models::pipeline::OrderPipeline;
use crate::models::role::Role;
use crate::models::role_state::{PlayerSeat, RoleState};
use serde::{Deserialize, Serialize};

/// Chain lifecycle status.
///
/// `Waiting` chains are still seating players; `Active` chains accept
/// actions; `Completed`/`Aborted` are terminal — chains are never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainStatus {
    Waiting,
    Active,
    Completed,
    Aborted,
}

/// What happened to one role during a week's advance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleWeek {
    pub role: Role,
    /// Shipment released from the supply line this week
    pub arrival: i64,
    /// Demand dealt to this role this week
    pub demand: i64,
    /// Quantity actually shipped (backlog-first fulfillment)
    pub shipped: i64,
    /// Order the role placed during the closed week
    pub placed: i64,
    /// Post-fulfillment inventory
    pub inventory: i64,
    /// Post-fulfillment backlog
    pub backlog: i64,
}

/// Full record of one closed week, returned by [`ChainState::advance_week`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekRecord {
    /// The week this advance closed
    pub week: usize,
    /// Customer demand released to the Shop this week
    pub customer_demand: i64,
    /// Per-role outcomes in chain order
    pub roles: Vec<RoleWeek>,
}

/// A complete four-role supply chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainState {
    chain_id: String,
    game_id: String,

    /// RoleStates indexed by [`Role::index`] (chain order, downstream first)
    roles: Vec<RoleState>,

    /// Customer orders in transit toward the Shop
    customer_link: OrderPipeline,

    /// Current week, monotonic from 0
    week: usize,

    /// Total weeks to play before the chain completes
    weeks_total: usize,

    status: ChainStatus,
}

impl ChainState {
    /// Create a chain at week 0 in `Waiting` status.
    pub fn new(
        chain_id: String,
        game_id: String,
        initial_inventory: i64,
        shipment_lag: usize,
        order_lag: usize,
        weeks_total: usize,
    ) -> Self {
        let roles = Role::CHAIN_ORDER
            .iter()
            .map(|&role| RoleState::new(role, initial_inventory, shipment_lag, order_lag))
            .collect();
        Self {
            chain_id,
            game_id,
            roles,
            customer_link: OrderPipeline::new(order_lag),
            week: 0,
            weeks_total,
            status: ChainStatus::Waiting,
        }
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub fn week(&self) -> usize {
        self.week
    }

    pub fn weeks_total(&self) -> usize {
        self.weeks_total
    }

    pub fn status(&self) -> ChainStatus {
        self.status
    }

    pub fn role(&self, role: Role) -> &RoleState {
        &self.roles[role.index()]
    }

    pub fn role_mut(&mut self, role: Role) -> &mut RoleState {
        &mut self.roles[role.index()]
    }

    pub fn roles(&self) -> &[RoleState] {
        &self.roles
    }

    /// True when every seat has a player.
    pub fn all_seated(&self) -> bool {
        self.roles.iter().all(|r| r.player().is_some())
    }

    /// Move a `Waiting` chain to `Active`. No-op for any other status.
    pub fn activate(&mut self) {
        if self.status == ChainStatus::Waiting {
            self.status = ChainStatus::Active;
        }
    }

    /// Terminally abort the chain.
    pub fn abort(&mut self) {
        if matches!(self.status, ChainStatus::Waiting | ChainStatus::Active) {
            self.status = ChainStatus::Aborted;
        }
    }

    /// Execute the `Advancing` transition for the current week.
    ///
    /// The caller (round coordinator) guarantees gating: every required role
    /// has exactly one recorded action, and this runs at most once per week.
    ///
    /// Sequence: release demand signals from the order links, release
    /// arrivals from the supply lines, then per role in chain order apply
    /// arrival, fulfill demand, and record history. Finally the week index
    /// increments; reaching `weeks_total` completes the chain.
    pub fn advance_week(&mut self, customer_order: i64) -> WeekRecord {
        debug_assert_eq!(self.status, ChainStatus::Active);

        // Customer order joins the demand link; with order lag 0 it is
        // released by this same advance.
        self.customer_link
            .enqueue(customer_order.max(0))
            .expect("customer order validated non-negative");

        // Release demand: the Shop draws from the customer link, every other
        // role from its downstream neighbor's order link.
        let mut demands = [0i64; 4];
        demands[Role::Shop.index()] = self.customer_link.advance();
        for &role in &Role::CHAIN_ORDER {
            if let Some(down) = role.downstream() {
                demands[role.index()] = self.roles[down.index()].advance_order_link();
            }
        }

        // Release arrivals.
        let mut arrivals = [0i64; 4];
        for &role in &Role::CHAIN_ORDER {
            arrivals[role.index()] = self.roles[role.index()].advance_supply();
        }

        // Apply arrivals and fulfill demand in chain order.
        let closed_week = self.week;
        let mut role_weeks = Vec::with_capacity(4);
        for &role in &Role::CHAIN_ORDER {
            let idx = role.index();
            let state = &mut self.roles[idx];
            let placed = state.placed_this_week();
            state.apply_arrival(arrivals[idx]);
            let shipped = state.apply_demand(demands[idx]);
            state.record_week(demands[idx]);
            role_weeks.push(RoleWeek {
                role,
                arrival: arrivals[idx],
                demand: demands[idx],
                shipped,
                placed,
                inventory: state.inventory(),
                backlog: state.backlog(),
            });
        }

        self.week += 1;
        if self.week >= self.weeks_total {
            self.status = ChainStatus::Completed;
        }

        WeekRecord {
            week: closed_week,
            customer_demand: demands[Role::Shop.index()],
            roles: role_weeks,
        }
    }
}

// ============================================================================
// Snapshots
// ============================================================================

/// Immutable snapshot of one role, complete enough to restore it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleSnapshot {
    pub role: Role,
    pub inventory: i64,
    pub backlog: i64,
    pub supply_line: OrderPipeline,
    pub order_link: OrderPipeline,
    pub placed_this_week: i64,
    pub player: Option<PlayerSeat>,
    pub orders_placed: Vec<i64>,
    pub demand_received: Vec<i64>,
    pub inventory_history: Vec<i64>,
    pub backlog_history: Vec<i64>,
}

impl From<&RoleState> for RoleSnapshot {
    fn from(state: &RoleState) -> Self {
        RoleSnapshot {
            role: state.role(),
            inventory: state.inventory(),
            backlog: state.backlog(),
            supply_line: state.supply_line().clone(),
            order_link: state.order_link().clone(),
            placed_this_week: state.placed_this_week(),
            player: state.player().cloned(),
            orders_placed: state.orders_placed().to_vec(),
            demand_received: state.demand_received().to_vec(),
            inventory_history: state.inventory_history().to_vec(),
            backlog_history: state.backlog_history().to_vec(),
        }
    }
}

impl From<&RoleSnapshot> for RoleState {
    fn from(snapshot: &RoleSnapshot) -> Self {
        RoleState::from_snapshot(
            snapshot.role,
            snapshot.inventory,
            snapshot.backlog,
            snapshot.supply_line.clone(),
            snapshot.order_link.clone(),
            snapshot.placed_this_week,
            snapshot.player.clone(),
            snapshot.orders_placed.clone(),
            snapshot.demand_received.clone(),
            snapshot.inventory_history.clone(),
            snapshot.backlog_history.clone(),
        )
    }
}

/// Immutable post-advance snapshot of a chain.
///
/// This is what the host aggregator, the scoring engine, and the snapshot
/// store consume — readers never touch the live [`ChainState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub chain_id: String,
    pub game_id: String,
    pub week: usize,
    pub weeks_total: usize,
    pub status: ChainStatus,
    pub customer_link: OrderPipeline,
    pub roles: Vec<RoleSnapshot>,
}

impl ChainSnapshot {
    pub fn role(&self, role: Role) -> &RoleSnapshot {
        &self.roles[role.index()]
    }
}

impl From<&ChainState> for ChainSnapshot {
    fn from(chain: &ChainState) -> Self {
        ChainSnapshot {
            chain_id: chain.chain_id.clone(),
            game_id: chain.game_id.clone(),
            week: chain.week,
            weeks_total: chain.weeks_total,
            status: chain.status,
            customer_link: chain.customer_link.clone(),
            roles: chain.roles.iter().map(RoleSnapshot::from).collect(),
        }
    }
}

impl From<&ChainSnapshot> for ChainState {
    fn from(snapshot: &ChainSnapshot) -> Self {
        ChainState {
            chain_id: snapshot.chain_id.clone(),
            game_id: snapshot.game_id.clone(),
            roles: snapshot.roles.iter().map(RoleState::from).collect(),
            customer_link: snapshot.customer_link.clone(),
            week: snapshot.week,
            weeks_total: snapshot.weeks_total,
            status: snapshot.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active_chain() -> ChainState {
        let mut chain = ChainState::new(
            "game_1_chain_0".to_string(),
            "game_1".to_string(),
            100,
            4,
            0,
            52,
        );
        chain.activate();
        chain
    }

    #[test]
    fn test_all_roles_share_week_index() {
        let mut chain = active_chain();
        for &role in &Role::CHAIN_ORDER {
            chain.role_mut(role).place_order(4).unwrap();
        }
        let record = chain.advance_week(4);
        assert_eq!(record.week, 0);
        assert_eq!(chain.week(), 1);
        // History length is the shared week counter for every role
        for &role in &Role::CHAIN_ORDER {
            assert_eq!(chain.role(role).orders_placed().len(), 1);
        }
    }

    #[test]
    fn test_demand_propagates_from_downstream_orders() {
        let mut chain = active_chain();
        chain.role_mut(Role::Shop).place_order(9).unwrap();
        for &role in &[Role::Retailer, Role::Wholesaler, Role::Factory] {
            chain.role_mut(role).place_order(0).unwrap();
        }
        let record = chain.advance_week(6);
        assert_eq!(record.customer_demand, 6);
        // With order lag 0 the Retailer sees the Shop's order the same week
        assert_eq!(record.roles[Role::Retailer.index()].demand, 9);
        // The Wholesaler sees the Retailer's (zero) order, not the Shop's
        assert_eq!(record.roles[Role::Wholesaler.index()].demand, 0);
    }

    #[test]
    fn test_order_arrives_after_shipment_lag() {
        let mut chain = active_chain();
        chain.role_mut(Role::Shop).place_order(10).unwrap();
        for &role in &[Role::Retailer, Role::Wholesaler, Role::Factory] {
            chain.role_mut(role).place_order(0).unwrap();
        }

        // Advances closing weeks 0..=3: nothing arrives at the Shop
        for week in 0..4 {
            let record = chain.advance_week(0);
            assert_eq!(record.week, week);
            assert_eq!(record.roles[Role::Shop.index()].arrival, 0);
            for &role in &Role::CHAIN_ORDER {
                chain.role_mut(role).place_order(0).unwrap();
            }
        }

        // Week 4's advance releases exactly the ordered quantity
        let record = chain.advance_week(0);
        assert_eq!(record.week, 4);
        assert_eq!(record.roles[Role::Shop.index()].arrival, 10);
    }

    #[test]
    fn test_completion_at_weeks_total() {
        let mut chain = ChainState::new(
            "c".to_string(),
            "g".to_string(),
            100,
            4,
            0,
            2,
        );
        chain.activate();
        chain.advance_week(0);
        assert_eq!(chain.status(), ChainStatus::Active);
        chain.advance_week(0);
        assert_eq!(chain.status(), ChainStatus::Completed);
        assert_eq!(chain.week(), 2);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut chain = active_chain();
        chain
            .role_mut(Role::Shop)
            .seat_player("player_1".into(), "Alice".into());
        chain.role_mut(Role::Shop).place_order(5).unwrap();
        for &role in &[Role::Retailer, Role::Wholesaler, Role::Factory] {
            chain.role_mut(role).place_order(3).unwrap();
        }
        chain.advance_week(4);

        let snapshot = ChainSnapshot::from(&chain);
        let restored = ChainState::from(&snapshot);
        assert_eq!(restored, chain);
    }
}
