//! Role state model
//!
//! One role's mutable simulation state: inventory on hand, backlog of unmet
//! demand carried forward, and the two pipelines it touches — its incoming
//! supply line (shipments/production in transit toward it) and its outgoing
//! order link (the demand signal traveling to its upstream neighbor).
//!
//! # Fulfillment invariant
//!
//! After a week's fulfillment step, inventory and backlog are never both
//! positive: available inventory is exhausted against owed quantity (existing
//! backlog first, then this week's demand) before any shortfall is carried.

use crate::models::pipeline::{OrderPipeline, PipelineError};
use crate::models::role::Role;
use serde::{Deserialize, Serialize};

/// A seated player, recorded when someone joins a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSeat {
    pub player_id: String,
    pub player_name: String,
}

/// Mutable state of one role within a chain.
///
/// # Example
/// ```
/// use supply_game_core_rs::models::{Role, RoleState};
///
/// let mut shop = RoleState::new(Role::Shop, 100, 4, 0);
/// shop.apply_arrival(10);
/// assert_eq!(shop.inventory(), 110);
///
/// let shipped = shop.apply_demand(30);
/// assert_eq!(shipped, 30);
/// assert_eq!(shop.inventory(), 80);
/// assert_eq!(shop.backlog(), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleState {
    role: Role,

    /// Units on hand (never negative)
    inventory: i64,

    /// Unmet demand carried forward (never negative)
    backlog: i64,

    /// Incoming shipments/production in transit toward this role
    supply_line: OrderPipeline,

    /// Outgoing demand signal in transit to the upstream neighbor
    order_link: OrderPipeline,

    /// Quantity ordered since the last advance (exactly one order per week)
    placed_this_week: i64,

    /// Player occupying this seat, if any
    player: Option<PlayerSeat>,

    // Per-week history, index = week, recorded at each advance
    orders_placed: Vec<i64>,
    demand_received: Vec<i64>,
    inventory_history: Vec<i64>,
    backlog_history: Vec<i64>,
}

impl RoleState {
    /// Create a role with its starting inventory and pipeline lags.
    pub fn new(role: Role, initial_inventory: i64, shipment_lag: usize, order_lag: usize) -> Self {
        assert!(initial_inventory >= 0, "initial_inventory must be non-negative");
        Self {
            role,
            inventory: initial_inventory,
            backlog: 0,
            supply_line: OrderPipeline::new(shipment_lag),
            order_link: OrderPipeline::new(order_lag),
            placed_this_week: 0,
            player: None,
            orders_placed: Vec::new(),
            demand_received: Vec::new(),
            inventory_history: Vec::new(),
            backlog_history: Vec::new(),
        }
    }

    /// Restore a role from persisted snapshot fields.
    ///
    /// Used when rebuilding a chain from the snapshot store; all invariants
    /// are assumed to have held when the snapshot was taken.
    #[allow(clippy::too_many_arguments)]
    pub fn from_snapshot(
        role: Role,
        inventory: i64,
        backlog: i64,
        supply_line: OrderPipeline,
        order_link: OrderPipeline,
        placed_this_week: i64,
        player: Option<PlayerSeat>,
        orders_placed: Vec<i64>,
        demand_received: Vec<i64>,
        inventory_history: Vec<i64>,
        backlog_history: Vec<i64>,
    ) -> Self {
        Self {
            role,
            inventory,
            backlog,
            supply_line,
            order_link,
            placed_this_week,
            player,
            orders_placed,
            demand_received,
            inventory_history,
            backlog_history,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn inventory(&self) -> i64 {
        self.inventory
    }

    pub fn backlog(&self) -> i64 {
        self.backlog
    }

    /// Quantity ordered so far this week (0 until the role acts).
    pub fn placed_this_week(&self) -> i64 {
        self.placed_this_week
    }

    pub fn supply_line(&self) -> &OrderPipeline {
        &self.supply_line
    }

    pub fn order_link(&self) -> &OrderPipeline {
        &self.order_link
    }

    pub fn player(&self) -> Option<&PlayerSeat> {
        self.player.as_ref()
    }

    /// Seat a player at this role. Returns false if the seat is taken.
    pub fn seat_player(&mut self, player_id: String, player_name: String) -> bool {
        if self.player.is_some() {
            return false;
        }
        self.player = Some(PlayerSeat {
            player_id,
            player_name,
        });
        true
    }

    /// Add an arrived shipment to inventory.
    pub fn apply_arrival(&mut self, quantity: i64) {
        assert!(quantity >= 0, "arrival quantity must be non-negative");
        self.inventory += quantity;
    }

    /// Fulfill this week's demand, clearing existing backlog first.
    ///
    /// Returns the quantity actually shipped. Any shortfall after inventory
    /// is exhausted is carried as backlog.
    pub fn apply_demand(&mut self, quantity: i64) -> i64 {
        assert!(quantity >= 0, "demand quantity must be non-negative");
        let owed = self.backlog + quantity;
        let shipped = owed.min(self.inventory);
        self.inventory -= shipped;
        self.backlog = owed - shipped;
        debug_assert!(
            !(self.inventory > 0 && self.backlog > 0),
            "inventory and backlog must never both be positive after fulfillment"
        );
        shipped
    }

    /// Place this role's weekly order.
    ///
    /// The quantity enters the role's own supply line (goods/production that
    /// will arrive after the shipment lag) and, for roles with an upstream
    /// neighbor, the order link carrying the demand signal upstream.
    pub fn place_order(&mut self, quantity: i64) -> Result<(), PipelineError> {
        self.supply_line.enqueue(quantity)?;
        if self.role.upstream().is_some() {
            self.order_link.enqueue(quantity)?;
        }
        self.placed_this_week += quantity;
        Ok(())
    }

    /// Release this week's arrivals from the supply line.
    pub fn advance_supply(&mut self) -> i64 {
        self.supply_line.advance()
    }

    /// Release this week's demand signal toward the upstream neighbor.
    pub fn advance_order_link(&mut self) -> i64 {
        self.order_link.advance()
    }

    /// Record the closed week into history and reset the weekly order slot.
    pub fn record_week(&mut self, demand: i64) {
        self.orders_placed.push(self.placed_this_week);
        self.demand_received.push(demand);
        self.inventory_history.push(self.inventory);
        self.backlog_history.push(self.backlog);
        self.placed_this_week = 0;
    }

    pub fn orders_placed(&self) -> &[i64] {
        &self.orders_placed
    }

    pub fn demand_received(&self) -> &[i64] {
        &self.demand_received
    }

    pub fn inventory_history(&self) -> &[i64] {
        &self.inventory_history
    }

    pub fn backlog_history(&self) -> &[i64] {
        &self.backlog_history
    }
}
