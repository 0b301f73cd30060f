//! Structural errors raised while building or editing a chip graph

use crate::address::{ChipId, PinAddress, PinId};
use thiserror::Error;

/// Result type for netlist operations
pub type Result<T> = std::result::Result<T, NetlistError>;

/// Errors that can occur while building or editing a chip graph
///
/// All of these are rejected at the edit boundary; the graph is left as it
/// was before the failed operation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NetlistError {
    #[error("Unknown chip '{0}'")]
    UnknownChip(String),

    #[error("Chip '{0}' contains itself")]
    CircularDefinition(String),

    #[error("Chip '{name}' is nested deeper than the limit of {limit}")]
    NestingTooDeep { name: String, limit: usize },

    #[error("Duplicate pin {pin:?} on chip '{chip}'")]
    DuplicatePin { chip: String, pin: PinId },

    #[error("Duplicate sub-chip {0} in composite")]
    DuplicateChip(ChipId),

    #[error("Primitive '{0}' cannot be redefined")]
    ReservedName(String),

    #[error("No pin at {0}")]
    UnknownPin(PinAddress),

    #[error("No sub-chip {0} in composite")]
    UnknownSubChip(ChipId),

    #[error("{0} cannot drive a connection")]
    NotASource(PinAddress),

    #[error("{0} cannot be driven by a connection")]
    NotATarget(PinAddress),

    #[error("Width mismatch between {source_pin} and {target}")]
    WidthMismatch {
        source_pin: PinAddress,
        target: PinAddress,
    },

    #[error("{target} is already driven by {existing}")]
    FanInViolation {
        target: PinAddress,
        existing: PinAddress,
    },

    #[error("No connection from {source_pin} to {target}")]
    MissingConnection {
        source_pin: PinAddress,
        target: PinAddress,
    },

    #[error("No chip at path {0:?}")]
    UnknownPath(Vec<ChipId>),

    #[error("Chip '{0}' is a primitive and has no internal wiring")]
    NotComposite(String),

    #[error("Invalid internal state for '{chip}': {reason}")]
    InvalidInternalState { chip: String, reason: String },
}
