//! Primitive Evaluation
//!
//! Evaluation functions for the built-in chip types. Evaluation is pure: the
//! output depends only on the inputs, the primitive's internal state words
//! and the supplied simulation time. Sequential primitives update their held
//! state separately through [`update_primitive_state`], after their outputs
//! for the step have been produced.
//!
//! # Usage
//!
//! ```
//! use chipsim_netlist::{PinState, PrimitiveKind};
//! use chipsim_sim::gate_eval::{evaluate_primitive, SimTime};
//!
//! let outputs = evaluate_primitive(
//!     PrimitiveKind::Nand,
//!     &[PinState::High, PinState::High],
//!     &[],
//!     SimTime::default(),
//! );
//! assert_eq!(outputs, vec![PinState::Low]);
//! ```

use chipsim_netlist::{PinState, PrimitiveKind};

/// Simulation clock passed into every step
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SimTime {
    /// Wall time in seconds
    pub time: f64,
    /// Host frame counter
    pub frame: u64,
}

impl SimTime {
    pub fn new(time: f64, frame: u64) -> Self {
        Self { time, frame }
    }
}

/// Evaluate a primitive
///
/// # Panics
///
/// If `inputs` does not match the primitive's input count. A correctly built
/// graph never does this.
pub fn evaluate_primitive(
    kind: PrimitiveKind,
    inputs: &[PinState],
    internal_state: &[u32],
    now: SimTime,
) -> Vec<PinState> {
    assert_eq!(
        inputs.len(),
        kind.input_count(),
        "{} evaluated with {} inputs",
        kind,
        inputs.len()
    );

    // Gates read anything but High as a logic zero
    let bit = |i: usize| inputs[i].is_high();

    let output = match kind {
        // === Combinational Logic ===
        PrimitiveKind::And => PinState::from_bool(bit(0) && bit(1)),
        PrimitiveKind::Or => PinState::from_bool(bit(0) || bit(1)),
        PrimitiveKind::Nand => PinState::from_bool(!(bit(0) && bit(1))),
        PrimitiveKind::Nor => PinState::from_bool(!(bit(0) || bit(1))),
        PrimitiveKind::Xor => PinState::from_bool(bit(0) ^ bit(1)),
        PrimitiveKind::Xnor => PinState::from_bool(!(bit(0) ^ bit(1))),
        PrimitiveKind::Not => PinState::from_bool(!bit(0)),

        PrimitiveKind::TriStateBuffer => {
            // inputs: [enable, data]
            if bit(0) {
                inputs[1]
            } else {
                PinState::Floating
            }
        }

        // Linked buses are merged by the scheduler; a lone segment is a wire
        PrimitiveKind::Bus => inputs[0],

        // === Time Dependent ===
        PrimitiveKind::Clock => PinState::from_bool(clock_level(bit(0), bit(1), now)),

        PrimitiveKind::TickDelay => held_state(internal_state),
    };
    vec![output]
}

/// Capture this step's inputs into a sequential primitive's held state
pub fn update_primitive_state(
    kind: PrimitiveKind,
    inputs: &[PinState],
    internal_state: &mut Vec<u32>,
) {
    if kind == PrimitiveKind::TickDelay {
        let captured = inputs.first().copied().unwrap_or(PinState::Low);
        internal_state.clear();
        internal_state.push(captured.to_word());
    }
}

/// Value a TICK DELAY currently presents; an empty state reads as Low
pub fn held_state(internal_state: &[u32]) -> PinState {
    internal_state
        .first()
        .copied()
        .map(PinState::from_word)
        .unwrap_or(PinState::Low)
}

/// Clock output for the mode selected by (input0, input1)
///
/// `00` toggles every 0.5s, `01` every 0.25s, `10` every 8 frames and
/// `11` every 2 frames. Each mode starts a period LOW.
pub fn clock_level(mode0: bool, mode1: bool, now: SimTime) -> bool {
    match (mode0, mode1) {
        (false, false) => now.time.rem_euclid(1.0) >= 0.5,
        (false, true) => now.time.rem_euclid(0.5) >= 0.25,
        (true, false) => now.frame % 16 >= 8,
        (true, true) => now.frame % 4 >= 2,
    }
}
