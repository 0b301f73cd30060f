//! ChipSim - frame-stepped evaluator for hierarchical digital-logic netlists
//!
//! A chip is either a primitive gate or a composite of sub-chips wired
//! together through their pins. [`netlist`] builds and edits chip trees,
//! [`sim`] steps them once per host frame.
//!
//! ```
//! use chipsim::prelude::*;
//!
//! let library = ChipLibrary::new()
//!     .with(
//!         ChipDescription::new("BUFFER")
//!             .with_input(0, "in")
//!             .with_output(1, "out")
//!             .with_sub_chip("NOT", 0)
//!             .with_sub_chip("NOT", 1)
//!             .with_connection(PinAddress::parent_input(0), PinAddress::child_input(0, 0))
//!             .with_connection(PinAddress::child_output(0, 1), PinAddress::child_input(1, 0))
//!             .with_connection(PinAddress::child_output(1, 1), PinAddress::parent_output(1)),
//!     )
//!     .unwrap();
//!
//! let mut sim = Simulator::new(library, "BUFFER", SimulationConfig::default()).unwrap();
//! sim.step(&[PinState::High], SimTime::new(0.0, 0)).unwrap();
//! assert_eq!(sim.outputs(), vec![PinState::High]);
//! ```

pub use chipsim_netlist as netlist;
pub use chipsim_sim as sim;

pub mod prelude {
    pub use chipsim_netlist::{
        ChipDescription, ChipId, ChipLibrary, NetlistError, PinAddress, PinDescription,
        PinDirection, PinId, PinState, PinWidth, PrimitiveKind, SubChipDescription,
    };
    pub use chipsim_sim::{SimTime, SimulationConfig, SimulationError, Simulator, StepReport};
}
