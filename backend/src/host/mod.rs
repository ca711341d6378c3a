//! Host aggregator
//!
//! Read-only composition over all of a game's chains. The host dashboard is
//! built from immutable post-advance snapshots, never from live chain state,
//! so reads neither block nor are blocked by in-flight coordinator
//! mutations.
//!
//! The displayed "global" week is the minimum week across Active chains:
//! the dashboard never shows a chain further ahead than the laggards, which
//! would leak information about rounds other players have not decided yet.

use crate::models::chain::{ChainSnapshot, ChainStatus};
use crate::scoring::{ScoreRecord, ScoringEngine};
use serde::{Deserialize, Serialize};

/// One chain's slice of the host view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainOverview {
    pub snapshot: ChainSnapshot,
    /// Cumulative chain cost over recorded history (cents)
    pub total_cost: i64,
    /// Per-role per-week scores over recorded history
    pub scores: Vec<ScoreRecord>,
}

/// The synchronized aggregate view for a privileged observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostView {
    pub game_id: String,
    /// Minimum week across Active chains (see module docs)
    pub global_week: usize,
    pub chains: Vec<ChainOverview>,
}

/// Stateless read-only composition helpers.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostAggregator;

impl HostAggregator {
    /// The globally displayed week: minimum across Active chains.
    ///
    /// If no chain is Active (all still seating, or all finished) the
    /// minimum over every chain is used instead, so the view stays defined
    /// for the whole game lifecycle.
    pub fn global_week(snapshots: &[ChainSnapshot]) -> usize {
        let active_min = snapshots
            .iter()
            .filter(|s| s.status == ChainStatus::Active)
            .map(|s| s.week)
            .min();
        match active_min {
            Some(week) => week,
            None => snapshots.iter().map(|s| s.week).min().unwrap_or(0),
        }
    }

    /// Whether, under lockstep mode, a chain at `chain_week` may accept
    /// actions: no chain begins week N+1 until every chain has completed
    /// week N.
    pub fn lockstep_permits(chain_week: usize, global_week: usize) -> bool {
        chain_week <= global_week
    }

    /// Build the full host view from snapshots.
    pub fn compose(
        game_id: &str,
        mut snapshots: Vec<ChainSnapshot>,
        scoring: &ScoringEngine,
    ) -> HostView {
        snapshots.sort_by(|a, b| a.chain_id.cmp(&b.chain_id));
        let global_week = Self::global_week(&snapshots);
        let chains = snapshots
            .into_iter()
            .map(|snapshot| {
                let scores = scoring.score_upto(&snapshot, usize::MAX);
                let total_cost = scores
                    .last()
                    .map(|r| r.cumulative_chain_cost)
                    .unwrap_or(0);
                ChainOverview {
                    snapshot,
                    total_cost,
                    scores,
                }
            })
            .collect();
        HostView {
            game_id: game_id.to_string(),
            global_week,
            chains,
        }
    }
}
