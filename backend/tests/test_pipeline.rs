//! Pipeline timing and conservation properties.

use proptest::prelude::*;
use supply_game_core_rs::{OrderPipeline, PipelineError};

#[test]
fn test_enqueue_rejects_negative() {
    let mut pipeline = OrderPipeline::new(4);
    assert_eq!(
        pipeline.enqueue(-7),
        Err(PipelineError::InvalidQuantity(-7))
    );
    assert!(pipeline.enqueue(0).is_ok());
}

#[test]
fn test_lag_four_shipment_timing() {
    // A quantity enqueued during week 0 is released by the advance closing
    // week 4, never earlier, never later.
    let mut pipeline = OrderPipeline::new(4);
    pipeline.enqueue(10).unwrap();
    for week in 0..4 {
        assert_eq!(pipeline.advance(), 0, "released early at week {}", week);
    }
    assert_eq!(pipeline.advance(), 10);
    assert_eq!(pipeline.advance(), 0);
}

#[test]
fn test_lag_zero_order_transmission() {
    let mut pipeline = OrderPipeline::new(0);
    pipeline.enqueue(6).unwrap();
    assert_eq!(pipeline.advance(), 6);
}

#[test]
fn test_windowed_conservation() {
    // Total enqueued over any window equals total released lag weeks later.
    let lag = 3;
    let mut pipeline = OrderPipeline::new(lag);
    let traffic = [5i64, 0, 12, 3, 0, 0, 7, 1, 9, 4];

    let mut released = Vec::new();
    for &qty in &traffic {
        pipeline.enqueue(qty).unwrap();
        released.push(pipeline.advance());
    }
    for _ in 0..=lag {
        released.push(pipeline.advance());
    }

    for (week, &qty) in traffic.iter().enumerate() {
        assert_eq!(released[week + lag], qty);
    }
    assert_eq!(pipeline.in_transit(), 0);
}

proptest! {
    #[test]
    fn prop_quantity_is_conserved(
        lag in 0usize..8,
        traffic in proptest::collection::vec(0i64..1_000, 0..50),
    ) {
        let mut pipeline = OrderPipeline::new(lag);
        let mut released = 0i64;
        for &qty in &traffic {
            pipeline.enqueue(qty).unwrap();
            released += pipeline.advance();
        }
        prop_assert_eq!(
            released + pipeline.in_transit(),
            traffic.iter().sum::<i64>()
        );
    }

    #[test]
    fn prop_exact_lag(lag in 0usize..8, qty in 1i64..1_000, idle in 0usize..6) {
        let mut pipeline = OrderPipeline::new(lag);
        for _ in 0..idle {
            prop_assert_eq!(pipeline.advance(), 0);
        }
        pipeline.enqueue(qty).unwrap();
        // The advance closing the enqueue week plus lag-1 more release nothing
        for _ in 0..lag {
            prop_assert_eq!(pipeline.advance(), 0);
        }
        prop_assert_eq!(pipeline.advance(), qty);
    }
}
