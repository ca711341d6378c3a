//! Cost computation and the bullwhip metric.

use supply_game_core_rs::models::{ChainSnapshot, ChainState, RoleSnapshot};
use supply_game_core_rs::{CostRates, OrderPipeline, Role, ScoringEngine};

fn role_snapshot(role: Role, placed: Vec<i64>, received: Vec<i64>) -> RoleSnapshot {
    let weeks = placed.len();
    RoleSnapshot {
        role,
        inventory: 0,
        backlog: 0,
        supply_line: OrderPipeline::new(4),
        order_link: OrderPipeline::new(0),
        placed_this_week: 0,
        player: None,
        orders_placed: placed,
        demand_received: received,
        inventory_history: vec![0; weeks],
        backlog_history: vec![0; weeks],
    }
}

fn snapshot_with_series(placed: Vec<i64>, received: Vec<i64>) -> ChainSnapshot {
    ChainSnapshot {
        chain_id: "chain_0".to_string(),
        game_id: "game_0".to_string(),
        week: placed.len(),
        weeks_total: 52,
        status: supply_game_core_rs::ChainStatus::Active,
        customer_link: OrderPipeline::new(0),
        roles: Role::CHAIN_ORDER
            .iter()
            .map(|&role| role_snapshot(role, placed.clone(), received.clone()))
            .collect(),
    }
}

#[test]
fn test_holding_and_backorder_costs() {
    let mut chain = ChainState::new("chain_0".to_string(), "game_0".to_string(), 20, 4, 0, 52);
    chain.activate();
    chain.advance_week(30); // Shop ships 20, backlogs 10; others idle at 20

    let engine = ScoringEngine::new(CostRates::default(), None);
    let scores = engine.score_upto(&ChainSnapshot::from(&chain), 0);
    assert_eq!(scores.len(), 4);

    let shop = &scores[Role::Shop.index()];
    assert_eq!(shop.holding_cost, 0);
    assert_eq!(shop.backorder_cost, 10 * 200);
    assert_eq!(shop.cumulative_role_cost, 2_000);

    let retailer = &scores[Role::Retailer.index()];
    assert_eq!(retailer.holding_cost, 20 * 50);
    assert_eq!(retailer.backorder_cost, 0);

    // Chain cumulative: Shop 2000 + three idle roles at 1000 each.
    assert_eq!(scores.last().unwrap().cumulative_chain_cost, 5_000);
}

#[test]
fn test_cumulative_costs_accumulate_across_weeks() {
    let mut chain = ChainState::new("chain_0".to_string(), "game_0".to_string(), 10, 4, 0, 52);
    chain.activate();
    chain.advance_week(0);
    chain.advance_week(0);

    let engine = ScoringEngine::new(CostRates::default(), None);
    let snapshot = ChainSnapshot::from(&chain);
    let scores = engine.score_upto(&snapshot, usize::MAX);
    // 2 weeks × 4 roles
    assert_eq!(scores.len(), 8);
    // Every role holds 10 units for 2 weeks: 4 × 10 × 50 × 2
    assert_eq!(engine.chain_total(&snapshot), 4_000);
    assert_eq!(engine.week_cost(&snapshot, 0), 2_000);
    assert_eq!(engine.week_cost(&snapshot, 1), 2_000);
}

#[test]
fn test_bullwhip_ratio_doubled_variance() {
    // Demand received alternates 0,2 (variance 1); orders placed follow the
    // 0,2,4,2 cycle (variance 2): each role amplifies variance by 2.
    let received = vec![0, 2, 0, 2, 0, 2, 0, 2];
    let placed = vec![0, 2, 4, 2, 0, 2, 4, 2];
    let snapshot = snapshot_with_series(placed, received);

    let engine = ScoringEngine::new(CostRates::default(), None);
    let scores = engine.score_upto(&snapshot, usize::MAX);
    for &role in &Role::CHAIN_ORDER {
        let last = scores
            .iter()
            .rev()
            .find(|r| r.role == role)
            .unwrap();
        let ratio = last.bullwhip_ratio.expect("variance is nonzero");
        assert!(
            (ratio - 2.0).abs() < 1e-9,
            "expected ratio ~2.0 for {}, got {}",
            role,
            ratio
        );
    }
}

#[test]
fn test_bullwhip_undefined_without_downstream_variance() {
    let snapshot = snapshot_with_series(vec![1, 5, 1, 5], vec![4, 4, 4, 4]);
    let engine = ScoringEngine::new(CostRates::default(), None);
    let scores = engine.score_upto(&snapshot, usize::MAX);
    assert!(scores.last().unwrap().bullwhip_ratio.is_none());
}

#[test]
fn test_scoring_is_deterministic_and_pure() {
    let mut chain = ChainState::new("chain_0".to_string(), "game_0".to_string(), 50, 4, 0, 52);
    chain.activate();
    for week in 0..6 {
        chain.advance_week(week as i64 % 5);
    }
    let snapshot = ChainSnapshot::from(&chain);
    let engine = ScoringEngine::new(CostRates::default(), None);

    let once = engine.score_upto(&snapshot, usize::MAX);
    let twice = engine.score_upto(&snapshot, usize::MAX);
    assert_eq!(once, twice);

    // Scoring never mutates the snapshot.
    assert_eq!(snapshot, ChainSnapshot::from(&chain));
}

#[test]
fn test_upto_week_truncates() {
    let mut chain = ChainState::new("chain_0".to_string(), "game_0".to_string(), 10, 4, 0, 52);
    chain.activate();
    for _ in 0..5 {
        chain.advance_week(0);
    }
    let engine = ScoringEngine::new(CostRates::default(), None);
    let scores = engine.score_upto(&ChainSnapshot::from(&chain), 1);
    // Weeks 0 and 1 only.
    assert_eq!(scores.len(), 8);
    assert!(scores.iter().all(|r| r.week <= 1));
}
