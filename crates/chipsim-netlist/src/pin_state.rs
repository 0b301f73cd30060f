//! Tri-state pin values
//!
//! Every pin in the chip graph carries one [`PinState`]. Gates read anything
//! that is not `High` as a logic zero; buses merge several drivers with
//! [`PinState::combine`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Value carried by a single pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PinState {
    Low,
    High,
    /// Undriven / high-impedance
    #[default]
    Floating,
}

impl PinState {
    /// Bus merge of two drivers
    ///
    /// `High` dominates, `Floating` is the identity, so the operation is
    /// commutative and associative and independent of driver order.
    pub fn combine(self, other: PinState) -> PinState {
        match (self, other) {
            (PinState::High, _) | (_, PinState::High) => PinState::High,
            (PinState::Floating, s) | (s, PinState::Floating) => s,
            (PinState::Low, PinState::Low) => PinState::Low,
        }
    }

    /// Merge any number of drivers; no drivers yields `Floating`
    pub fn merge<I>(states: I) -> PinState
    where
        I: IntoIterator<Item = PinState>,
    {
        states
            .into_iter()
            .fold(PinState::Floating, PinState::combine)
    }

    /// `High` maps to 1, everything else to 0
    pub fn to_bit(self) -> u8 {
        match self {
            PinState::High => 1,
            PinState::Low | PinState::Floating => 0,
        }
    }

    pub fn is_high(self) -> bool {
        self == PinState::High
    }

    pub fn is_floating(self) -> bool {
        self == PinState::Floating
    }

    pub fn from_bool(value: bool) -> PinState {
        if value {
            PinState::High
        } else {
            PinState::Low
        }
    }

    /// Encoding used for primitive internal state words
    pub fn to_word(self) -> u32 {
        match self {
            PinState::Low => 0,
            PinState::High => 1,
            PinState::Floating => 2,
        }
    }

    /// Inverse of [`PinState::to_word`]; unknown words read as `Low`
    pub fn from_word(word: u32) -> PinState {
        match word {
            1 => PinState::High,
            2 => PinState::Floating,
            _ => PinState::Low,
        }
    }
}

impl From<bool> for PinState {
    fn from(value: bool) -> Self {
        PinState::from_bool(value)
    }
}

impl fmt::Display for PinState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinState::Low => write!(f, "0"),
            PinState::High => write!(f, "1"),
            PinState::Floating => write!(f, "Z"),
        }
    }
}

/// Pack pin states into a number, first state is the least significant bit
pub fn states_to_number(states: &[PinState]) -> u64 {
    states
        .iter()
        .take(64)
        .enumerate()
        .fold(0u64, |acc, (i, s)| acc | (u64::from(s.to_bit()) << i))
}

/// Unpack `width` bits of `value` into pin states, least significant bit first
pub fn number_to_states(value: u64, width: usize) -> Vec<PinState> {
    (0..width)
        .map(|i| PinState::from_bool(i < 64 && (value >> i) & 1 == 1))
        .collect()
}
