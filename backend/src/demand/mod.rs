//! Customer demand generation
//!
//! Each chain has one stream of end-customer demand feeding its Shop. The
//! host may place customer orders explicitly; when a week advances without
//! one, the configured pattern supplies the value. All generation is
//! deterministic: same seed + same config produces the same demand series.
//!
//! # Example
//!
//! ```
//! use supply_game_core_rs::demand::{DemandConfig, DemandGenerator, DemandPattern};
//!
//! let config = DemandConfig {
//!     pattern: DemandPattern::Constant { level: 8 },
//!     rng_seed: 42,
//! };
//! let mut generator = DemandGenerator::new(&config, 0);
//! assert_eq!(generator.demand_for_week(0), 8);
//! assert_eq!(generator.demand_for_week(1), 8);
//! ```

use crate::rng::RngManager;
use serde::{Deserialize, Serialize};

/// Weekly customer demand pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DemandPattern {
    /// Fixed demand every week
    Constant { level: i64 },

    /// Square wave alternating between `high` and `low` every `period` weeks
    Step { low: i64, high: i64, period: usize },

    /// `amplitude * sin(0.1 * week) + base`, truncated toward zero
    SineWave { base: i64, amplitude: i64 },

    /// Uniform random in `[min, max]` from the seeded RNG
    Random { min: i64, max: i64 },
}

/// Demand configuration for a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandConfig {
    /// Pattern shared by all chains in the game
    pub pattern: DemandPattern,

    /// Seed for the `Random` pattern; each chain derives its own stream
    pub rng_seed: u64,
}

impl Default for DemandConfig {
    fn default() -> Self {
        Self {
            pattern: DemandPattern::SineWave {
                base: 5,
                amplitude: 10,
            },
            rng_seed: 0,
        }
    }
}

/// Per-chain demand stream.
///
/// Negative pattern values (a deep sine trough) clamp to zero: demand is a
/// non-negative quantity everywhere else in the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandGenerator {
    pattern: DemandPattern,
    rng: RngManager,
}

impl DemandGenerator {
    /// Create the demand stream for one chain.
    ///
    /// `chain_index` decorrelates the random streams of sibling chains while
    /// keeping every stream reproducible from the game seed.
    pub fn new(config: &DemandConfig, chain_index: usize) -> Self {
        let seed = config
            .rng_seed
            .wrapping_add((chain_index as u64).wrapping_mul(0x9E37_79B9));
        Self {
            pattern: config.pattern.clone(),
            rng: RngManager::new(seed),
        }
    }

    /// Customer demand for the given week, always >= 0.
    ///
    /// The `Random` pattern advances the RNG; callers must request weeks in
    /// order (the coordinator asks exactly once per advance).
    pub fn demand_for_week(&mut self, week: usize) -> i64 {
        let raw = match &self.pattern {
            DemandPattern::Constant { level } => *level,
            DemandPattern::Step { low, high, period } => {
                let period = (*period).max(1);
                if (week / period) % 2 == 0 {
                    *high
                } else {
                    *low
                }
            }
            DemandPattern::SineWave { base, amplitude } => {
                (*amplitude as f64 * (week as f64 * 0.1).sin()) as i64 + *base
            }
            DemandPattern::Random { min, max } => {
                let (lo, hi) = (*min, *max);
                self.rng.int_in(lo.min(hi), lo.max(hi))
            }
        };
        raw.max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_pattern() {
        let config = DemandConfig {
            pattern: DemandPattern::Constant { level: 4 },
            rng_seed: 0,
        };
        let mut generator = DemandGenerator::new(&config, 0);
        for week in 0..20 {
            assert_eq!(generator.demand_for_week(week), 4);
        }
    }

    #[test]
    fn test_step_pattern_square_wave() {
        let config = DemandConfig {
            pattern: DemandPattern::Step {
                low: 5,
                high: 10,
                period: 10,
            },
            rng_seed: 0,
        };
        let mut generator = DemandGenerator::new(&config, 0);
        assert_eq!(generator.demand_for_week(0), 10);
        assert_eq!(generator.demand_for_week(9), 10);
        assert_eq!(generator.demand_for_week(10), 5);
        assert_eq!(generator.demand_for_week(19), 5);
        assert_eq!(generator.demand_for_week(20), 10);
    }

    #[test]
    fn test_sine_matches_formula() {
        let config = DemandConfig {
            pattern: DemandPattern::SineWave {
                base: 5,
                amplitude: 10,
            },
            rng_seed: 0,
        };
        let mut generator = DemandGenerator::new(&config, 0);
        for week in 0..60 {
            let expected = ((10.0 * (week as f64 * 0.1).sin()) as i64 + 5).max(0);
            assert_eq!(generator.demand_for_week(week), expected);
        }
    }

    #[test]
    fn test_sine_trough_clamps_to_zero() {
        let config = DemandConfig {
            pattern: DemandPattern::SineWave {
                base: 0,
                amplitude: 10,
            },
            rng_seed: 0,
        };
        let mut generator = DemandGenerator::new(&config, 0);
        // sin is negative around week 40 (4.0 rad); raw value would be < 0
        assert_eq!(generator.demand_for_week(40), 0);
    }

    #[test]
    fn test_random_is_deterministic_and_bounded() {
        let config = DemandConfig {
            pattern: DemandPattern::Random { min: 2, max: 8 },
            rng_seed: 99,
        };
        let mut a = DemandGenerator::new(&config, 0);
        let mut b = DemandGenerator::new(&config, 0);
        for week in 0..50 {
            let v = a.demand_for_week(week);
            assert_eq!(v, b.demand_for_week(week));
            assert!((2..=8).contains(&v));
        }
    }

    #[test]
    fn test_sibling_chains_get_distinct_random_streams() {
        let config = DemandConfig {
            pattern: DemandPattern::Random { min: 0, max: 1000 },
            rng_seed: 7,
        };
        let mut a = DemandGenerator::new(&config, 0);
        let mut b = DemandGenerator::new(&config, 1);
        let same = (0..20).filter(|&w| a.demand_for_week(w) == b.demand_for_week(w)).count();
        assert!(same < 20);
    }
}
