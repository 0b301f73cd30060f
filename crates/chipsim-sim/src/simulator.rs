//! Simulator facade
//!
//! Owns the chip library, the built root chip and the counters of the most
//! recent step. Hosts call [`Simulator::step`] once per frame and route
//! structural edits through the same instance between steps.

use crate::config::SimulationConfig;
use crate::gate_eval::SimTime;
use crate::scheduler::{self, StepReport};
use chipsim_netlist::{
    Chip, ChipDescription, ChipEditor, ChipId, ChipLibrary, ChipSnapshot, GraphBuilder,
    NetlistError, PinAddress, PinDescription, PinDirection, PinId, PinState, SubChipDescription,
};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur during simulation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimulationError {
    #[error(transparent)]
    Netlist(#[from] NetlistError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(String),
}

/// Result type for simulation operations
pub type SimulationResult<T> = Result<T, SimulationError>;

pub struct Simulator {
    library: ChipLibrary,
    root: Chip,
    config: SimulationConfig,
    last_report: StepReport,
    steps: u64,
}

impl Simulator {
    /// Build the library chip `root` and prepare it for stepping
    pub fn new(
        library: ChipLibrary,
        root: &str,
        config: SimulationConfig,
    ) -> SimulationResult<Self> {
        let chip = GraphBuilder::new(&library)
            .with_max_depth(config.max_nesting_depth)
            .build(root)?;
        Ok(Self::with_root(library, chip, config))
    }

    /// Simulate a description that is not itself part of the library
    pub fn from_description(
        library: ChipLibrary,
        description: &ChipDescription,
        config: SimulationConfig,
    ) -> SimulationResult<Self> {
        let chip = GraphBuilder::new(&library)
            .with_max_depth(config.max_nesting_depth)
            .build_description(description)?;
        Ok(Self::with_root(library, chip, config))
    }

    fn with_root(library: ChipLibrary, root: Chip, config: SimulationConfig) -> Self {
        info!(
            "simulating '{}': {} chips, depth {}",
            root.name,
            root.chip_count(),
            root.depth()
        );
        Self {
            library,
            root,
            config,
            last_report: StepReport::default(),
            steps: 0,
        }
    }

    /// Run one step with `inputs` on the root's input pins, in pin order
    pub fn step(&mut self, inputs: &[PinState], now: SimTime) -> SimulationResult<StepReport> {
        let report = scheduler::step(&mut self.root, inputs, now, &self.config)?;
        self.last_report = report;
        self.steps += 1;
        Ok(report)
    }

    /// Root output states, in pin order
    pub fn outputs(&self) -> Vec<PinState> {
        self.root.output_states()
    }

    pub fn root(&self) -> &Chip {
        &self.root
    }

    pub fn library(&self) -> &ChipLibrary {
        &self.library
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Debug counters of the most recent step
    pub fn last_report(&self) -> StepReport {
        self.last_report
    }

    pub fn step_count(&self) -> u64 {
        self.steps
    }

    pub fn get_chip_or_sub_chip(&self, path: &[ChipId]) -> Option<&Chip> {
        self.root.get_chip_or_sub_chip(path)
    }

    pub fn pin_state(&self, path: &[ChipId], address: &PinAddress) -> Option<PinState> {
        self.root.pin_state(path, address)
    }

    pub fn snapshot(&self, path: &[ChipId]) -> Option<ChipSnapshot> {
        self.get_chip_or_sub_chip(path).map(Chip::snapshot)
    }

    /// Forget all pin history and held primitive state; structure is kept
    pub fn reset(&mut self) {
        self.root.reset();
        self.last_report = StepReport::default();
        self.steps = 0;
        debug!("reset '{}'", self.root.name);
    }

    // === Structural edits ===

    pub fn add_chip(&mut self, path: &[ChipId], sub: &SubChipDescription) -> SimulationResult<()> {
        Ok(self.editor().add_chip(path, sub)?)
    }

    pub fn remove_chip(&mut self, path: &[ChipId], id: ChipId) -> SimulationResult<Chip> {
        Ok(self.editor().remove_chip(path, id)?)
    }

    pub fn add_pin(
        &mut self,
        path: &[ChipId],
        pin: &PinDescription,
        direction: PinDirection,
    ) -> SimulationResult<()> {
        Ok(self.editor().add_pin(path, pin, direction)?)
    }

    pub fn remove_pin(
        &mut self,
        path: &[ChipId],
        pin: PinId,
        direction: PinDirection,
    ) -> SimulationResult<()> {
        Ok(self.editor().remove_pin(path, pin, direction)?)
    }

    pub fn add_connection(
        &mut self,
        path: &[ChipId],
        source: PinAddress,
        target: PinAddress,
    ) -> SimulationResult<()> {
        Ok(self.editor().add_connection(path, source, target)?)
    }

    pub fn remove_connection(
        &mut self,
        path: &[ChipId],
        source: PinAddress,
        target: PinAddress,
    ) -> SimulationResult<()> {
        Ok(self.editor().remove_connection(path, source, target)?)
    }

    fn editor(&mut self) -> ChipEditor<'_> {
        ChipEditor::new(&mut self.root, &self.library).with_max_depth(self.config.max_nesting_depth)
    }
}
