//! Order pipeline model
//!
//! A fixed-capacity delay queue modeling quantities in transit between two
//! adjacent roles (or from the Factory's production line back to itself).
//! Quantities enter at the tail and fall off the head exactly `lag` advances
//! later; nothing in transit is ever created or destroyed.
//!
//! The pipeline has no notion of "week". Its timing guarantee holds because
//! the round coordinator calls [`OrderPipeline::advance`] exactly once per
//! week per pipeline (per-week gating).
//!
//! CRITICAL: quantities are i64 units and never negative once accepted.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

/// Errors that can occur during pipeline operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("quantity must be non-negative, got {0}")]
    InvalidQuantity(i64),
}

/// Fixed-lag FIFO delay queue for orders/shipments in transit.
///
/// A quantity enqueued during week W is released by the advance that closes
/// week W + lag. Lag 0 is legal: the quantity is released by the very next
/// advance (same-week order transmission).
///
/// # Example
/// ```
/// use supply_game_core_rs::models::OrderPipeline;
///
/// let mut pipeline = OrderPipeline::new(2);
/// pipeline.enqueue(10).unwrap();
/// assert_eq!(pipeline.advance(), 0); // week 0 closes, nothing due yet
/// assert_eq!(pipeline.advance(), 0); // week 1 closes
/// assert_eq!(pipeline.advance(), 10); // week 2 closes: 0 + lag 2
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPipeline {
    /// Transit delay in weeks
    lag: usize,

    /// Quantity accumulated since the last advance (this week's tail)
    staged: i64,

    /// In-transit slots, head first; always exactly `lag` entries between advances
    slots: VecDeque<i64>,
}

impl OrderPipeline {
    /// Create an empty pipeline with the given transit lag.
    pub fn new(lag: usize) -> Self {
        Self {
            lag,
            staged: 0,
            slots: VecDeque::from(vec![0; lag]),
        }
    }

    /// Transit lag in weeks.
    pub fn lag(&self) -> usize {
        self.lag
    }

    /// Append a quantity at the tail.
    ///
    /// Multiple enqueues within the same week accumulate into one tail slot.
    pub fn enqueue(&mut self, quantity: i64) -> Result<(), PipelineError> {
        if quantity < 0 {
            return Err(PipelineError::InvalidQuantity(quantity));
        }
        self.staged += quantity;
        Ok(())
    }

    /// Shift every slot one position toward the head and return the quantity
    /// that falls off (0 if that slot was never filled). A fresh empty tail
    /// slot is left behind.
    pub fn advance(&mut self) -> i64 {
        self.slots.push_back(self.staged);
        self.staged = 0;
        self.slots.pop_front().unwrap_or(0)
    }

    /// The quantity the next advance will release, without advancing.
    pub fn peek_arrivals(&self) -> i64 {
        match self.slots.front() {
            Some(head) => *head,
            None => self.staged, // lag 0: next advance releases the tail directly
        }
    }

    /// Total quantity currently in transit (staged + all slots).
    pub fn in_transit(&self) -> i64 {
        self.staged + self.slots.iter().sum::<i64>()
    }
}
