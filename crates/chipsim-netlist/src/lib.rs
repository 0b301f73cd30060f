//! ChipSim Netlist - hierarchical chip graph
//!
//! This crate handles:
//! - Tri-state pin values and bus merging
//! - The primitive chip catalogue
//! - Structural chip descriptions and the chip library
//! - The runtime chip tree and its connection index
//! - Feedback loop detection (registered pins)
//! - Building chip trees from descriptions and editing them live

pub mod address;
pub mod builder;
pub mod cycle;
pub mod description;
pub mod editor;
pub mod error;
pub mod graph;
pub mod pin_state;
pub mod primitives;

pub use address::{ChipId, ChipPath, PinAddress, PinDirection, PinId, PinOwner};
pub use builder::{GraphBuilder, DEFAULT_MAX_NESTING_DEPTH};
pub use cycle::{analyze_cycles, is_acyclic, CycleReport};
pub use description::{
    ChipDescription, ChipLibrary, ChipRef, ConnectionDescription, PinDescription, PinWidth,
    SubChipDescription,
};
pub use editor::ChipEditor;
pub use error::{NetlistError, Result};
pub use graph::{Chip, ChipKind, ChipSnapshot, Composite, Pin, PinSnapshot, Wiring};
pub use pin_state::{number_to_states, states_to_number, PinState};
pub use primitives::PrimitiveKind;
