//! Feedback loop detection
//!
//! For every sub-chip of a composite we walk forward along
//! output -> downstream input connections. When the walk comes back to the
//! chip it started from, the input pin that closed the loop is marked
//! `registered` and the walk does not continue through it. A registered pin
//! reads the previous step's value, so once every loop has one the remaining
//! dependency graph is acyclic and the scheduler can resolve it in one pass.
//!
//! Dependencies are tracked at chip granularity: every output of a sub-chip is
//! assumed to depend on every one of its inputs. The exception is a sequential
//! primitive (TICK DELAY), whose output is the value it captured last step, so
//! a loop through one already has its delay and gets no mark. BUS chips that
//! share a link ID form one bus node and are walked as a single unit.

use crate::address::{ChipId, PinAddress, PinDirection, PinOwner};
use crate::graph::Composite;
use indexmap::{IndexMap, IndexSet};
use petgraph::algo::is_cyclic_directed;
use petgraph::graphmap::DiGraphMap;
use std::collections::HashSet;
use tracing::{debug, trace};

/// Outcome of one analysis pass over a composite
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Sub-chip input pins now marked as registered, in discovery order
    pub registered: Vec<PinAddress>,
}

impl CycleReport {
    pub fn loop_count(&self) -> usize {
        self.registered.len()
    }
}

/// Re-mark the registered pins of `composite`
///
/// Previous marks are cleared first, so removing the connection that closed a
/// loop also removes its mark. A pin that becomes registered starts its
/// "next" slot from its current value.
pub fn analyze_cycles(composite: &mut Composite) -> CycleReport {
    let breaks = find_loop_breaks(composite);

    for (chip_id, chip) in composite.children.iter_mut() {
        for pin in chip.inputs.values_mut() {
            let address = PinAddress {
                owner: PinOwner::Child(*chip_id),
                pin: pin.id,
                direction: PinDirection::Input,
            };
            let registered = breaks.contains(&address);
            if registered && !pin.registered {
                pin.next_state = pin.state;
            }
            pin.registered = registered;
        }
    }

    debug!(
        "cycle analysis: {} sub-chips, {} registered pins",
        composite.children.len(),
        breaks.len()
    );
    debug_assert!(is_acyclic(composite));

    CycleReport {
        registered: breaks.into_iter().collect(),
    }
}

/// Evaluation unit of each sub-chip: its bus net, or just itself
fn units(composite: &Composite) -> IndexMap<ChipId, Vec<ChipId>> {
    let groups = composite.bus_groups();
    composite
        .children
        .iter()
        .map(|(id, chip)| {
            let unit = chip
                .bus_link()
                .and_then(|link| groups.get(&link).cloned())
                .unwrap_or_else(|| vec![*id]);
            (*id, unit)
        })
        .collect()
}

/// Sub-chip input pins each sub-chip's outputs drive within the same step
fn successors(composite: &Composite) -> IndexMap<ChipId, Vec<PinAddress>> {
    composite
        .children
        .iter()
        .map(|(id, chip)| {
            let targets = chip
                .outputs
                .keys()
                .flat_map(|pin| {
                    let source = PinAddress {
                        owner: PinOwner::Child(*id),
                        pin: *pin,
                        direction: PinDirection::Output,
                    };
                    composite.wiring.fanout_of(&source).iter().copied()
                })
                .filter(|target| same_step(composite, target))
                .collect();
            (*id, targets)
        })
        .collect()
}

/// True if `target` is a sub-chip input read in the step it is driven
fn same_step(composite: &Composite, target: &PinAddress) -> bool {
    target
        .child()
        .and_then(|id| composite.child(id))
        .is_some_and(|chip| !chip.is_sequential())
}

fn find_loop_breaks(composite: &Composite) -> IndexSet<PinAddress> {
    let units = units(composite);
    let successors = successors(composite);
    let mut breaks: IndexSet<PinAddress> = IndexSet::new();

    for origin in composite.children.keys() {
        let origin_unit: &[ChipId] = &units[origin];
        let mut visited: HashSet<ChipId> = origin_unit.iter().copied().collect();
        let mut stack = vec![*origin];

        while let Some(chip) = stack.pop() {
            for member in &units[&chip] {
                for target in &successors[member] {
                    if breaks.contains(target) {
                        continue;
                    }
                    let Some(next) = target.child() else {
                        continue;
                    };
                    if origin_unit.contains(&next) {
                        trace!("registered {} closes a loop through {}", target, origin);
                        breaks.insert(*target);
                        continue;
                    }
                    if visited.insert(next) {
                        visited.extend(units[&next].iter().copied());
                        stack.push(next);
                    }
                }
            }
        }
    }

    breaks
}

/// True if the composite's dependency graph has no cycle once registered pins
/// are treated as fixed boundary values
pub fn is_acyclic(composite: &Composite) -> bool {
    let units = units(composite);
    let mut graph: DiGraphMap<ChipId, ()> = DiGraphMap::new();
    for unit in units.values() {
        graph.add_node(unit[0]);
    }
    for conn in composite.wiring.iter() {
        let (Some(from), Some(to)) = (conn.source.child(), conn.target.child()) else {
            continue;
        };
        if !same_step(composite, &conn.target) {
            continue;
        }
        let registered = composite
            .child(to)
            .and_then(|chip| chip.inputs.get(&conn.target.pin))
            .map(|pin| pin.registered)
            .unwrap_or(false);
        if registered {
            continue;
        }
        if let (Some(a), Some(b)) = (units.get(&from), units.get(&to)) {
            graph.add_edge(a[0], b[0], ());
        }
    }
    !is_cyclic_directed(&graph)
}
