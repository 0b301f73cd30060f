//! Built-in chip types
//!
//! The closed set of primitives every library can reference by name. The
//! evaluation functions live in `chipsim-sim`; this module only describes
//! their shape.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveKind {
    // === Combinational Logic ===
    And,
    Or,
    Nand,
    Nor,
    Xor,
    Xnor,
    Not,
    /// inputs: [enable, data]
    TriStateBuffer,
    /// Labelled wire segment; internal state word 0 links origin/terminus pairs
    Bus,

    // === Time Dependent ===
    /// inputs: [mode0, mode1]
    Clock,
    /// One-step register; internal state word 0 holds the captured value
    TickDelay,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 11] = [
        PrimitiveKind::And,
        PrimitiveKind::Or,
        PrimitiveKind::Nand,
        PrimitiveKind::Nor,
        PrimitiveKind::Xor,
        PrimitiveKind::Xnor,
        PrimitiveKind::Not,
        PrimitiveKind::TriStateBuffer,
        PrimitiveKind::Bus,
        PrimitiveKind::Clock,
        PrimitiveKind::TickDelay,
    ];

    /// Library name used by descriptions to reference this primitive
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveKind::And => "AND",
            PrimitiveKind::Or => "OR",
            PrimitiveKind::Nand => "NAND",
            PrimitiveKind::Nor => "NOR",
            PrimitiveKind::Xor => "XOR",
            PrimitiveKind::Xnor => "XNOR",
            PrimitiveKind::Not => "NOT",
            PrimitiveKind::TriStateBuffer => "TRI-STATE BUFFER",
            PrimitiveKind::Bus => "BUS",
            PrimitiveKind::Clock => "CLOCK",
            PrimitiveKind::TickDelay => "TICK DELAY",
        }
    }

    pub fn from_name(name: &str) -> Option<PrimitiveKind> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }

    /// Returns the number of input pins for this primitive
    pub fn input_count(&self) -> usize {
        match self {
            PrimitiveKind::And
            | PrimitiveKind::Or
            | PrimitiveKind::Nand
            | PrimitiveKind::Nor
            | PrimitiveKind::Xor
            | PrimitiveKind::Xnor => 2,
            PrimitiveKind::Not => 1,
            PrimitiveKind::TriStateBuffer => 2, // enable, data
            PrimitiveKind::Bus => 1,
            PrimitiveKind::Clock => 2, // mode0, mode1
            PrimitiveKind::TickDelay => 1,
        }
    }

    /// Returns the number of output pins for this primitive
    pub fn output_count(&self) -> usize {
        1
    }

    /// Returns true if the output depends on history, not only on the inputs
    pub fn is_sequential(&self) -> bool {
        matches!(self, PrimitiveKind::TickDelay)
    }

    /// Internal state words a freshly placed instance starts with
    pub fn default_internal_state(&self) -> Vec<u32> {
        match self {
            PrimitiveKind::TickDelay => vec![0],
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
