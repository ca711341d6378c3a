//! PyO3 wrapper for the game engine
//!
//! # Example (from Python)
//!
//! ```python
//! import json
//! from supply_game._core import GameEngine
//!
//! config = {
//!     "num_chains": 2,
//!     "weeks_total": 26,
//!     "shipment_lag": 4,
//!     "order_lag": 0,
//!     "initial_inventory": 100,
//!     "cost_rates": {"holding_cost_per_unit": 50, "backorder_cost_per_unit": 200},
//!     "demand": {"pattern": {"SineWave": {"base": 5, "amplitude": 10}}, "rng_seed": 42},
//!     "required_roles": ["Shop", "Retailer", "Wholesaler", "Factory"],
//!     "timeout": "Disabled",
//!     "lockstep": False,
//!     "bullwhip_window": None,
//! }
//!
//! engine = GameEngine(json.dumps(config))
//! engine.start()
//! chain_id = engine.chain_ids()[0]
//! effect = engine.submit_action(json.dumps({
//!     "chain_id": chain_id,
//!     "week": 0,
//!     "actor": {"Role": "Shop"},
//!     "kind": {"PlaceOrder": {"quantity": 10}},
//!     "idempotency_key": "ui-1",
//! }))
//! view = json.loads(engine.get_host_view())
//! ```

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::coordinator::{GameConfig, GameEngine};
use crate::models::action::Action;

/// Python wrapper around [`GameEngine`].
///
/// Validation failures raise `ValueError` with the core's typed reason in
/// the message; the caller can retry a `PersistenceUnavailable` failure with
/// the same idempotency key.
#[pyclass(name = "GameEngine")]
pub struct PyGameEngine {
    inner: GameEngine,
}

#[pymethods]
impl PyGameEngine {
    /// Create an engine from a JSON-encoded [`GameConfig`].
    #[new]
    fn new(config_json: &str) -> PyResult<Self> {
        let config: GameConfig = serde_json::from_str(config_json)
            .map_err(|e| PyValueError::new_err(format!("invalid config: {}", e)))?;
        let inner = GameEngine::new(config)
            .map_err(|e| PyValueError::new_err(format!("failed to create game: {}", e)))?;
        Ok(PyGameEngine { inner })
    }

    /// The generated game id.
    fn game_id(&self) -> String {
        self.inner.game_id().to_string()
    }

    /// Ids of all chains in this game.
    fn chain_ids(&self) -> Vec<String> {
        self.inner.chain_ids().to_vec()
    }

    /// Seat a player; returns the generated player id.
    fn join_chain(&self, chain_id: &str, role: &str, player_name: &str) -> PyResult<String> {
        let role = role
            .parse()
            .map_err(|e| PyValueError::new_err(format!("{}", e)))?;
        self.inner
            .join_chain(chain_id, role, player_name)
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    /// Force-activate every chain.
    fn start(&self) {
        self.inner.start();
    }

    /// Submit a JSON-encoded [`Action`]; returns the applied effect as JSON.
    fn submit_action(&self, action_json: &str) -> PyResult<String> {
        let action: Action = serde_json::from_str(action_json)
            .map_err(|e| PyValueError::new_err(format!("invalid action: {}", e)))?;
        let effect = self
            .inner
            .submit_action(action)
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        to_json(&effect)
    }

    /// Host-placed customer order; returns the applied effect as JSON.
    fn place_customer_order(
        &self,
        chain_id: &str,
        week: usize,
        quantity: i64,
        idempotency_key: &str,
    ) -> PyResult<String> {
        let effect = self
            .inner
            .place_customer_order(chain_id, week, quantity, idempotency_key)
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        to_json(&effect)
    }

    /// JSON snapshot of one chain, or None if the chain does not exist.
    fn get_chain_state(&self, chain_id: &str) -> PyResult<Option<String>> {
        match self.inner.get_chain_state(chain_id) {
            None => Ok(None),
            Some(snapshot) => to_json(&snapshot).map(Some),
        }
    }

    /// JSON host view: global week plus every chain's snapshot and scores.
    fn get_host_view(&self) -> PyResult<String> {
        to_json(&self.inner.get_host_view())
    }

    /// JSON array of score records for one chain through `upto_week`.
    fn get_score(&self, chain_id: &str, upto_week: usize) -> PyResult<String> {
        to_json(&self.inner.get_score(chain_id, upto_week))
    }

    /// Take pending week-advanced notifications as a JSON array.
    fn drain_notifications(&self) -> PyResult<String> {
        to_json(&self.inner.drain_notifications())
    }

    /// Run the round-timeout sweep; returns substitutions as a JSON array.
    fn sweep_timeouts(&self) -> PyResult<String> {
        to_json(&self.inner.sweep_timeouts())
    }

    /// Push a factory-mode production rate onto a chain.
    fn apply_bridge_update(&self, chain_id: &str, production_rate: i64) -> PyResult<()> {
        self.inner
            .apply_bridge_update(&crate::bridge::BridgeUpdate {
                target_chain_id: chain_id.to_string(),
                production_rate,
            })
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    /// Factory-mode metrics for a chain as JSON, or None if unknown.
    fn bridge_reading(&self, chain_id: &str) -> PyResult<Option<String>> {
        match self.inner.bridge_reading(chain_id) {
            None => Ok(None),
            Some(reading) => to_json(&reading).map(Some),
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> PyResult<String> {
    serde_json::to_string(value)
        .map_err(|e| PyRuntimeError::new_err(format!("serialization failed: {}", e)))
}
