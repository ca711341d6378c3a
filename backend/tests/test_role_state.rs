//! Fulfillment invariants for role state.

use proptest::prelude::*;
use supply_game_core_rs::{Role, RoleState};

#[test]
fn test_shortfall_becomes_backlog() {
    let mut role = RoleState::new(Role::Shop, 10, 4, 0);
    let shipped = role.apply_demand(25);
    assert_eq!(shipped, 10);
    assert_eq!(role.inventory(), 0);
    assert_eq!(role.backlog(), 15);
}

#[test]
fn test_backlog_cleared_before_new_demand() {
    let mut role = RoleState::new(Role::Retailer, 0, 4, 0);
    role.apply_demand(12); // backlog 12

    // 10 arrive: all 10 go to the old backlog before the new demand of 5
    role.apply_arrival(10);
    let shipped = role.apply_demand(5);
    assert_eq!(shipped, 10);
    assert_eq!(role.inventory(), 0);
    assert_eq!(role.backlog(), 7); // 12 - 10 + 5
}

#[test]
fn test_surplus_clears_backlog_entirely() {
    let mut role = RoleState::new(Role::Wholesaler, 0, 4, 0);
    role.apply_demand(8);
    role.apply_arrival(20);
    let shipped = role.apply_demand(3);
    assert_eq!(shipped, 11);
    assert_eq!(role.inventory(), 9);
    assert_eq!(role.backlog(), 0);
}

proptest! {
    /// After fulfillment, inventory > 0 and backlog > 0 never hold together.
    #[test]
    fn prop_never_both_inventory_and_backlog(
        initial in 0i64..200,
        weeks in proptest::collection::vec((0i64..50, 0i64..50), 1..40),
    ) {
        let mut role = RoleState::new(Role::Shop, initial, 4, 0);
        for (arrival, demand) in weeks {
            role.apply_arrival(arrival);
            role.apply_demand(demand);
            prop_assert!(!(role.inventory() > 0 && role.backlog() > 0));
            prop_assert!(role.inventory() >= 0);
            prop_assert!(role.backlog() >= 0);
        }
    }

    /// Shipped quantity never exceeds what was owed or what was on hand.
    #[test]
    fn prop_shipped_is_bounded(
        initial in 0i64..200,
        arrival in 0i64..100,
        demand in 0i64..100,
    ) {
        let mut role = RoleState::new(Role::Factory, initial, 4, 0);
        role.apply_arrival(arrival);
        let on_hand = role.inventory();
        let shipped = role.apply_demand(demand);
        prop_assert!(shipped <= on_hand);
        prop_assert!(shipped <= demand); // no prior backlog: owed == demand
    }
}
