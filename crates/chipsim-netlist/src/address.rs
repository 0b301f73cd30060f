//! Stable identifiers and pin addresses
//!
//! Chip IDs are unique within the parent composite, pin IDs are unique within
//! the owning chip. A [`PinAddress`] locates a pin from the point of view of a
//! composite: either one of its own boundary pins or a pin of a direct sub-chip.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a sub-chip instance within its parent composite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChipId(pub u32);

/// Identifier of a pin within its owning chip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PinId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinDirection {
    Input,
    Output,
}

/// Who owns the addressed pin, relative to the composite doing the addressing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinOwner {
    /// The composite's own boundary pin
    Parent,
    /// A pin of a direct sub-chip
    Child(ChipId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PinAddress {
    pub owner: PinOwner,
    pub pin: PinId,
    pub direction: PinDirection,
}

impl PinAddress {
    pub fn parent_input(pin: u32) -> Self {
        Self {
            owner: PinOwner::Parent,
            pin: PinId(pin),
            direction: PinDirection::Input,
        }
    }

    pub fn parent_output(pin: u32) -> Self {
        Self {
            owner: PinOwner::Parent,
            pin: PinId(pin),
            direction: PinDirection::Output,
        }
    }

    pub fn child_input(chip: u32, pin: u32) -> Self {
        Self {
            owner: PinOwner::Child(ChipId(chip)),
            pin: PinId(pin),
            direction: PinDirection::Input,
        }
    }

    pub fn child_output(chip: u32, pin: u32) -> Self {
        Self {
            owner: PinOwner::Child(ChipId(chip)),
            pin: PinId(pin),
            direction: PinDirection::Output,
        }
    }

    /// Composite inputs and sub-chip outputs drive connections
    pub fn is_source(&self) -> bool {
        matches!(
            (self.owner, self.direction),
            (PinOwner::Parent, PinDirection::Input) | (PinOwner::Child(_), PinDirection::Output)
        )
    }

    /// Composite outputs and sub-chip inputs are driven by connections
    pub fn is_target(&self) -> bool {
        !self.is_source()
    }

    pub fn child(&self) -> Option<ChipId> {
        match self.owner {
            PinOwner::Parent => None,
            PinOwner::Child(id) => Some(id),
        }
    }
}

impl fmt::Display for ChipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for PinAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.direction {
            PinDirection::Input => "in",
            PinDirection::Output => "out",
        };
        match self.owner {
            PinOwner::Parent => write!(f, "self.{}{}", dir, self.pin.0),
            PinOwner::Child(id) => write!(f, "{}.{}{}", id, dir, self.pin.0),
        }
    }
}

/// Path of sub-chip IDs from the root; empty means the root itself
pub type ChipPath = [ChipId];
