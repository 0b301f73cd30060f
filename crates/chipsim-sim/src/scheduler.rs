//! Evaluation Scheduler
//!
//! One step resolves every pin in the tree. Within a composite, sub-chips are
//! pulled on demand: resolving a chip first resolves the drivers of its
//! inputs, then evaluates it, and every chip is evaluated at most once per
//! step. Registered inputs are not pulled; they present the value latched at
//! the end of the previous step, which is what keeps the pull finite on
//! graphs with feedback.
//!
//! Sequential primitives (TICK DELAY) present the value they captured in the
//! previous step, so they are evaluated without pulling their inputs. Their
//! inputs are resolved and captured once the rest of the composite is done.
//!
//! Linked BUS chips are resolved together: each member outputs the merge of
//! every member's input.

use crate::config::SimulationConfig;
use crate::gate_eval::{evaluate_primitive, update_primitive_state, SimTime};
use crate::simulator::{SimulationError, SimulationResult};
use chipsim_netlist::{
    Chip, ChipKind, Composite, Pin, PinAddress, PinDirection, PinId, PinOwner, PinState,
};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{trace, warn};

/// Debug counters of one step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StepReport {
    /// Inputs found without a driver
    pub floating_inputs: usize,
    /// Registered inputs that read last step's value
    pub registered_inputs: usize,
    pub chips_evaluated: usize,
}

/// Run one step on `root`
///
/// `inputs` holds one state per root input pin, in pin order.
pub fn step(
    root: &mut Chip,
    inputs: &[PinState],
    now: SimTime,
    config: &SimulationConfig,
) -> SimulationResult<StepReport> {
    if inputs.len() != root.inputs.len() {
        return Err(SimulationError::InvalidInput(format!(
            "'{}' has {} input pins, got {} values",
            root.name,
            root.inputs.len(),
            inputs.len()
        )));
    }
    for (pin, state) in root.inputs.values_mut().zip(inputs) {
        pin.state = *state;
    }

    let mut scheduler = Scheduler {
        now,
        trace_floating: config.trace_floating_inputs,
        report: StepReport::default(),
    };
    scheduler.evaluate_chip(root);
    capture_held_state(root);
    Ok(scheduler.report)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Pending,
    InProgress,
    Done,
}

/// Evaluation state of one composite during a step
struct Frame<'a> {
    /// The composite's own input pins
    inputs: &'a IndexMap<PinId, Pin>,
    composite: &'a mut Composite,
    /// Evaluation unit of each child, by child index
    unit_of: Vec<usize>,
    units: Vec<Vec<usize>>,
    visits: Vec<Visit>,
}

struct Scheduler {
    now: SimTime,
    trace_floating: bool,
    report: StepReport,
}

impl Scheduler {
    fn evaluate_chip(&mut self, chip: &mut Chip) {
        self.report.chips_evaluated += 1;
        let Chip {
            inputs,
            outputs,
            internal_state,
            kind,
            ..
        } = chip;
        match kind {
            ChipKind::Primitive(kind) => {
                let states: Vec<PinState> = inputs.values().map(|p| p.state).collect();
                let results = evaluate_primitive(*kind, &states, internal_state, self.now);
                for (pin, state) in outputs.values_mut().zip(results) {
                    pin.state = state;
                }
            }
            ChipKind::Composite(composite) => self.evaluate_composite(inputs, outputs, composite),
        }
    }

    fn evaluate_composite(
        &mut self,
        inputs: &IndexMap<PinId, Pin>,
        outputs: &mut IndexMap<PinId, Pin>,
        composite: &mut Composite,
    ) {
        for chip in composite.children.values_mut() {
            for pin in chip.inputs.values_mut().filter(|p| p.registered) {
                pin.state = pin.next_state;
                self.report.registered_inputs += 1;
            }
        }

        let (unit_of, units) = evaluation_units(composite);
        let count = unit_of.len();
        let mut frame = Frame {
            inputs,
            composite,
            unit_of,
            units,
            visits: vec![Visit::Pending; count],
        };

        for idx in 0..count {
            self.resolve(&mut frame, idx);
        }

        for (id, pin) in outputs.iter_mut() {
            let target = PinAddress {
                owner: PinOwner::Parent,
                pin: *id,
                direction: PinDirection::Output,
            };
            pin.state = match frame.composite.wiring.driver_of(&target) {
                Some(source) => self.source_value(&mut frame, &source),
                None => PinState::Floating,
            };
        }

        self.capture_sequential(&mut frame);
        self.latch_registered(&mut frame);
    }

    /// Resolve the inputs of the chip at `idx` (and its bus net), then evaluate it
    fn resolve(&mut self, frame: &mut Frame<'_>, idx: usize) {
        match frame.visits[idx] {
            Visit::Done => return,
            Visit::InProgress => {
                if let Some((id, _)) = frame.composite.children.get_index(idx) {
                    warn!("re-entered {} while resolving it, using its previous outputs", id);
                }
                return;
            }
            Visit::Pending => {}
        }

        let unit = frame.units[frame.unit_of[idx]].clone();
        for &member in &unit {
            frame.visits[member] = Visit::InProgress;
        }
        for &member in &unit {
            let sequential = frame
                .composite
                .children
                .get_index(member)
                .is_some_and(|(_, chip)| chip.is_sequential());
            if !sequential {
                self.resolve_inputs(frame, member);
            }
        }

        let linked = frame
            .composite
            .children
            .get_index(idx)
            .and_then(|(_, chip)| chip.bus_link())
            .is_some();
        if linked {
            self.evaluate_bus_net(frame, &unit);
        } else if let Some((_, chip)) = frame.composite.children.get_index_mut(idx) {
            self.evaluate_chip(chip);
        }

        for &member in &unit {
            frame.visits[member] = Visit::Done;
        }
    }

    fn resolve_inputs(&mut self, frame: &mut Frame<'_>, idx: usize) {
        let Some((chip_id, chip)) = frame.composite.children.get_index(idx) else {
            return;
        };
        let chip_id = *chip_id;
        let drivers: Vec<(PinAddress, Option<PinAddress>)> = chip
            .inputs
            .values()
            .filter(|p| !p.registered)
            .map(|p| {
                let target = PinAddress {
                    owner: PinOwner::Child(chip_id),
                    pin: p.id,
                    direction: PinDirection::Input,
                };
                (target, frame.composite.wiring.driver_of(&target))
            })
            .collect();

        for (target, driver) in drivers {
            let value = match driver {
                Some(source) => self.source_value(frame, &source),
                None => {
                    self.report.floating_inputs += 1;
                    if self.trace_floating {
                        trace!("{} has no driver", target);
                    }
                    PinState::Floating
                }
            };
            if let Some(pin) = frame
                .composite
                .children
                .get_index_mut(idx)
                .and_then(|(_, chip)| chip.inputs.get_mut(&target.pin))
            {
                pin.state = value;
            }
        }
    }

    /// Current value of a source pin, pulling its chip first
    fn source_value(&mut self, frame: &mut Frame<'_>, source: &PinAddress) -> PinState {
        match source.owner {
            PinOwner::Parent => frame
                .inputs
                .get(&source.pin)
                .map(|p| p.state)
                .unwrap_or(PinState::Floating),
            PinOwner::Child(id) => {
                let Some(idx) = frame.composite.children.get_index_of(&id) else {
                    return PinState::Floating;
                };
                self.resolve(frame, idx);
                frame
                    .composite
                    .children
                    .get_index(idx)
                    .and_then(|(_, chip)| chip.outputs.get(&source.pin))
                    .map(|p| p.state)
                    .unwrap_or(PinState::Floating)
            }
        }
    }

    fn evaluate_bus_net(&mut self, frame: &mut Frame<'_>, members: &[usize]) {
        let merged = PinState::merge(members.iter().flat_map(|&m| {
            frame
                .composite
                .children
                .get_index(m)
                .map(|(_, chip)| chip.input_states())
                .unwrap_or_default()
        }));
        for &member in members {
            if let Some((_, chip)) = frame.composite.children.get_index_mut(member) {
                for pin in chip.outputs.values_mut() {
                    pin.state = merged;
                }
            }
        }
        self.report.chips_evaluated += members.len();
    }

    /// Resolve the inputs of every sequential child and capture them
    fn capture_sequential(&mut self, frame: &mut Frame<'_>) {
        for idx in 0..frame.composite.children.len() {
            let sequential = frame
                .composite
                .children
                .get_index(idx)
                .is_some_and(|(_, chip)| chip.is_sequential());
            if !sequential {
                continue;
            }
            self.resolve_inputs(frame, idx);
            if let Some((_, chip)) = frame.composite.children.get_index_mut(idx) {
                capture_held_state(chip);
            }
        }
    }

    /// Store each registered input's current driver value for the next step
    fn latch_registered(&mut self, frame: &mut Frame<'_>) {
        let wiring = &frame.composite.wiring;
        let registered: Vec<(usize, PinId, Option<PinAddress>)> = frame
            .composite
            .children
            .iter()
            .enumerate()
            .flat_map(|(idx, (chip_id, chip))| {
                chip.inputs
                    .values()
                    .filter(|p| p.registered)
                    .map(move |p| {
                        let target = PinAddress {
                            owner: PinOwner::Child(*chip_id),
                            pin: p.id,
                            direction: PinDirection::Input,
                        };
                        (idx, p.id, wiring.driver_of(&target))
                    })
            })
            .collect();

        for (idx, pin_id, driver) in registered {
            let value = match driver {
                Some(source) => self.source_value(frame, &source),
                None => PinState::Floating,
            };
            if let Some(pin) = frame
                .composite
                .children
                .get_index_mut(idx)
                .and_then(|(_, chip)| chip.inputs.get_mut(&pin_id))
            {
                pin.next_state = value;
            }
        }
    }
}

/// Latch a sequential primitive's current inputs into its internal state
fn capture_held_state(chip: &mut Chip) {
    if let Some(kind) = chip.primitive_kind() {
        let states = chip.input_states();
        update_primitive_state(kind, &states, &mut chip.internal_state);
    }
}

/// Group child indices into evaluation units: one per linked bus net, one per
/// other chip
fn evaluation_units(composite: &Composite) -> (Vec<usize>, Vec<Vec<usize>>) {
    let mut unit_of = Vec::with_capacity(composite.children.len());
    let mut units: Vec<Vec<usize>> = Vec::new();
    let mut by_link: HashMap<u32, usize> = HashMap::new();

    for (idx, chip) in composite.children.values().enumerate() {
        let unit = match chip.bus_link() {
            Some(link) => *by_link.entry(link).or_insert_with(|| {
                units.push(Vec::new());
                units.len() - 1
            }),
            None => {
                units.push(Vec::new());
                units.len() - 1
            }
        };
        units[unit].push(idx);
        unit_of.push(unit);
    }
    (unit_of, units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chipsim_netlist::{ChipDescription, ChipLibrary, GraphBuilder};
    use PinState::{Floating, High, Low};

    fn build(desc: ChipDescription) -> Chip {
        GraphBuilder::new(&ChipLibrary::new())
            .build_description(&desc)
            .unwrap()
    }

    fn run(chip: &mut Chip, inputs: &[PinState]) -> StepReport {
        step(chip, inputs, SimTime::default(), &SimulationConfig::default()).unwrap()
    }

    #[test]
    fn test_pull_order_independent_of_child_order() {
        // The NOT feeding the output is listed before the one driving it
        let mut chip = build(
            ChipDescription::new("BUFFER")
                .with_input(0, "in")
                .with_output(1, "out")
                .with_sub_chip("NOT", 1)
                .with_sub_chip("NOT", 0)
                .with_connection(PinAddress::parent_input(0), PinAddress::child_input(0, 0))
                .with_connection(PinAddress::child_output(0, 1), PinAddress::child_input(1, 0))
                .with_connection(PinAddress::child_output(1, 1), PinAddress::parent_output(1)),
        );
        let report = run(&mut chip, &[High]);
        assert_eq!(chip.output_states(), vec![High]);
        assert_eq!(report.chips_evaluated, 3);
        assert_eq!(report.floating_inputs, 0);
    }

    #[test]
    fn test_undriven_inputs_counted() {
        let mut chip = build(
            ChipDescription::new("HALF")
                .with_input(0, "a")
                .with_output(1, "y")
                .with_sub_chip("AND", 0)
                .with_connection(PinAddress::parent_input(0), PinAddress::child_input(0, 0))
                .with_connection(PinAddress::child_output(0, 2), PinAddress::parent_output(1)),
        );
        let report = run(&mut chip, &[High]);
        assert_eq!(report.floating_inputs, 1);
        assert_eq!(chip.pin_state(&[], &PinAddress::child_input(0, 1)), Some(Floating));
        assert_eq!(chip.output_states(), vec![Low]);
    }

    #[test]
    fn test_undriven_output_floats() {
        let mut chip = build(ChipDescription::new("EMPTY").with_output(0, "y"));
        run(&mut chip, &[]);
        assert_eq!(chip.output_states(), vec![Floating]);
    }

    #[test]
    fn test_input_length_checked() {
        let mut chip = build(ChipDescription::new("EMPTY").with_input(0, "a"));
        let err = step(&mut chip, &[], SimTime::default(), &SimulationConfig::default())
            .unwrap_err();
        assert!(matches!(err, SimulationError::InvalidInput(_)));
    }

    #[test]
    fn test_ring_oscillator_toggles() {
        let mut chip = build(
            ChipDescription::new("RING")
                .with_output(0, "y")
                .with_sub_chip("NOT", 0)
                .with_connection(PinAddress::child_output(0, 1), PinAddress::child_input(0, 0))
                .with_connection(PinAddress::child_output(0, 1), PinAddress::parent_output(0)),
        );
        let mut seen = Vec::new();
        for _ in 0..4 {
            let report = run(&mut chip, &[]);
            assert_eq!(report.registered_inputs, 1);
            seen.push(chip.output_states()[0]);
        }
        // First step reads the initial Floating as Low
        assert_eq!(seen, vec![High, Low, High, Low]);
    }

    #[test]
    fn test_tick_delay_breaks_loop_without_registered_pin() {
        let mut chip = build(
            ChipDescription::new("TOGGLE")
                .with_output(0, "q")
                .with_sub_chip("TICK DELAY", 0)
                .with_sub_chip("NOT", 1)
                .with_connection(PinAddress::child_output(0, 1), PinAddress::child_input(1, 0))
                .with_connection(PinAddress::child_output(1, 1), PinAddress::child_input(0, 0))
                .with_connection(PinAddress::child_output(0, 1), PinAddress::parent_output(0)),
        );
        let mut seen = Vec::new();
        for _ in 0..4 {
            let report = run(&mut chip, &[]);
            assert_eq!(report.registered_inputs, 0);
            assert_eq!(report.floating_inputs, 0);
            assert_eq!(report.chips_evaluated, 3);
            seen.push(chip.output_states()[0]);
        }
        assert_eq!(seen, vec![Low, High, Low, High]);
    }

    #[test]
    fn test_linked_bus_merges_drivers() {
        // Two tri-state buffers drive linked bus segments 1 and 2
        let mut chip = build(
            ChipDescription::new("SHARED")
                .with_input(0, "en_a")
                .with_input(1, "a")
                .with_input(2, "en_b")
                .with_input(3, "b")
                .with_output(4, "y")
                .with_sub_chip("TRI-STATE BUFFER", 10)
                .with_sub_chip("TRI-STATE BUFFER", 11)
                .with_stateful_sub_chip("BUS", 1, vec![5])
                .with_stateful_sub_chip("BUS", 2, vec![5])
                .with_connection(PinAddress::parent_input(0), PinAddress::child_input(10, 0))
                .with_connection(PinAddress::parent_input(1), PinAddress::child_input(10, 1))
                .with_connection(PinAddress::parent_input(2), PinAddress::child_input(11, 0))
                .with_connection(PinAddress::parent_input(3), PinAddress::child_input(11, 1))
                .with_connection(PinAddress::child_output(10, 2), PinAddress::child_input(1, 0))
                .with_connection(PinAddress::child_output(11, 2), PinAddress::child_input(2, 0))
                .with_connection(PinAddress::child_output(2, 1), PinAddress::parent_output(4)),
        );

        run(&mut chip, &[Low, High, Low, High]);
        assert_eq!(chip.output_states(), vec![Floating]);

        run(&mut chip, &[High, High, Low, Low]);
        assert_eq!(chip.output_states(), vec![High]);

        run(&mut chip, &[Low, High, High, Low]);
        assert_eq!(chip.output_states(), vec![Low]);

        // Contention resolves High
        run(&mut chip, &[High, Low, High, High]);
        assert_eq!(chip.output_states(), vec![High]);
    }
}
