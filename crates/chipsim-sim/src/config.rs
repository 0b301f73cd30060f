//! Simulation configuration

use crate::simulator::{SimulationError, SimulationResult};
use chipsim_netlist::DEFAULT_MAX_NESTING_DEPTH;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for simulation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Deepest composite nesting accepted by builds and live edits
    pub max_nesting_depth: usize,
    /// Emit a trace event for every undriven input met during a step
    pub trace_floating_inputs: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            trace_floating_inputs: false,
        }
    }
}

impl SimulationConfig {
    pub fn from_toml_str(s: &str) -> SimulationResult<Self> {
        let config: SimulationConfig =
            toml::from_str(s).map_err(|e| SimulationError::Config(e.to_string()))?;
        if config.max_nesting_depth == 0 {
            return Err(SimulationError::Config(
                "max_nesting_depth must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> SimulationResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| SimulationError::Io(e.to_string()))?;
        Self::from_toml_str(&content)
    }
}
