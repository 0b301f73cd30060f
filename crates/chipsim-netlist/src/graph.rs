//! Runtime chip graph
//!
//! The graph is a tree: the root is the chip being simulated and each
//! composite exclusively owns its sub-chips, keyed by stable [`ChipId`].
//! Connections are stored per composite as address pairs in a [`Wiring`]
//! index rather than as references between pins, so the tree holds no
//! reference cycles and edits are plain map updates.

use crate::address::{ChipId, PinAddress, PinDirection, PinId, PinOwner};
use crate::description::{ConnectionDescription, PinDescription, PinWidth};
use crate::error::{NetlistError, Result};
use crate::pin_state::PinState;
use crate::primitives::PrimitiveKind;
use indexmap::IndexMap;
use serde::Serialize;

// ============================================================================
// Pins
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pin {
    pub id: PinId,
    pub name: String,
    pub direction: PinDirection,
    pub width: PinWidth,
    /// Value resolved in the most recent step
    pub state: PinState,
    /// Set by cycle analysis on input pins that break a feedback loop.
    /// Such a pin reads the value its driver had at the end of the previous
    /// step instead of waiting for the current one.
    pub registered: bool,
    /// Driver value latched at the end of a step, swapped into `state` at the
    /// start of the next one. Only meaningful while `registered` is set.
    pub next_state: PinState,
}

impl Pin {
    pub fn new(
        id: PinId,
        name: impl Into<String>,
        direction: PinDirection,
        width: PinWidth,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            direction,
            width,
            state: PinState::Floating,
            registered: false,
            next_state: PinState::Floating,
        }
    }

    pub fn from_description(desc: &PinDescription, direction: PinDirection) -> Self {
        Self::new(desc.id, desc.name.clone(), direction, desc.width)
    }

    pub fn reset(&mut self) {
        self.state = PinState::Floating;
        self.next_state = PinState::Floating;
    }
}

// ============================================================================
// Wiring
// ============================================================================

/// Connection index of one composite
///
/// Every target has at most one driver; a source may fan out to any number
/// of targets. Both directions are kept in sync by [`Wiring::connect`] and
/// [`Wiring::disconnect`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Wiring {
    /// target -> source
    drivers: IndexMap<PinAddress, PinAddress>,
    /// source -> targets
    fanout: IndexMap<PinAddress, Vec<PinAddress>>,
}

impl Wiring {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn driver_of(&self, target: &PinAddress) -> Option<PinAddress> {
        self.drivers.get(target).copied()
    }

    pub fn fanout_of(&self, source: &PinAddress) -> &[PinAddress] {
        self.fanout.get(source).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, source: &PinAddress, target: &PinAddress) -> bool {
        self.drivers.get(target) == Some(source)
    }

    /// Add `source -> target`, rejecting a second driver on `target`
    pub fn connect(&mut self, source: PinAddress, target: PinAddress) -> Result<()> {
        if let Some(existing) = self.drivers.get(&target) {
            return Err(NetlistError::FanInViolation {
                target,
                existing: *existing,
            });
        }
        self.drivers.insert(target, source);
        self.fanout.entry(source).or_default().push(target);
        Ok(())
    }

    pub fn disconnect(&mut self, source: &PinAddress, target: &PinAddress) -> Result<()> {
        if !self.contains(source, target) {
            return Err(NetlistError::MissingConnection {
                source_pin: *source,
                target: *target,
            });
        }
        self.drivers.shift_remove(target);
        if let Some(targets) = self.fanout.get_mut(source) {
            targets.retain(|t| t != target);
            if targets.is_empty() {
                self.fanout.shift_remove(source);
            }
        }
        Ok(())
    }

    /// Remove every connection with an endpoint matching `touches`
    pub fn remove_touching<F>(&mut self, touches: F) -> Vec<ConnectionDescription>
    where
        F: Fn(&PinAddress) -> bool,
    {
        let doomed: Vec<ConnectionDescription> = self
            .iter()
            .filter(|c| touches(&c.source) || touches(&c.target))
            .collect();
        for conn in &doomed {
            // Pairs come straight from the index, so they are present
            let _ = self.disconnect(&conn.source, &conn.target);
        }
        doomed
    }

    /// Connections in insertion order of their targets
    pub fn iter(&self) -> impl Iterator<Item = ConnectionDescription> + '_ {
        self.drivers
            .iter()
            .map(|(target, source)| ConnectionDescription {
                source: *source,
                target: *target,
            })
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}

// ============================================================================
// Chips
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChipKind {
    Primitive(PrimitiveKind),
    Composite(Composite),
}

/// Internals of a user-defined chip
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Composite {
    pub children: IndexMap<ChipId, Chip>,
    pub wiring: Wiring,
}

impl Composite {
    pub fn child(&self, id: ChipId) -> Option<&Chip> {
        self.children.get(&id)
    }

    pub fn child_mut(&mut self, id: ChipId) -> Option<&mut Chip> {
        self.children.get_mut(&id)
    }

    /// BUS chips sharing a link ID, keyed by link, in child order
    pub fn bus_groups(&self) -> IndexMap<u32, Vec<ChipId>> {
        let mut groups: IndexMap<u32, Vec<ChipId>> = IndexMap::new();
        for (id, chip) in &self.children {
            if let Some(link) = chip.bus_link() {
                groups.entry(link).or_default().push(*id);
            }
        }
        groups
    }

    /// Sub-chip input pins currently marked as registered
    pub fn registered_pins(&self) -> Vec<PinAddress> {
        self.children
            .iter()
            .flat_map(|(chip_id, chip)| {
                chip.inputs
                    .values()
                    .filter(|pin| pin.registered)
                    .map(move |pin| PinAddress {
                        owner: PinOwner::Child(*chip_id),
                        pin: pin.id,
                        direction: PinDirection::Input,
                    })
            })
            .collect()
    }
}

/// A chip instance: primitive gate or composite block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chip {
    pub id: ChipId,
    /// Library name this instance was built from
    pub name: String,
    pub inputs: IndexMap<PinId, Pin>,
    pub outputs: IndexMap<PinId, Pin>,
    /// Opaque words used by stateful primitives
    pub internal_state: Vec<u32>,
    pub kind: ChipKind,
}

impl Chip {
    /// Instantiate a primitive; inputs get pin IDs `0..n`, outputs `n..n+m`
    pub fn primitive(kind: PrimitiveKind, id: ChipId, internal_state: Vec<u32>) -> Self {
        let n_in = kind.input_count() as u32;
        let n_out = kind.output_count() as u32;
        let inputs = (0..n_in)
            .map(|i| {
                let pin = Pin::new(
                    PinId(i),
                    format!("in{}", i),
                    PinDirection::Input,
                    PinWidth::Bit1,
                );
                (pin.id, pin)
            })
            .collect();
        let outputs = (n_in..n_in + n_out)
            .map(|i| {
                let pin = Pin::new(
                    PinId(i),
                    format!("out{}", i - n_in),
                    PinDirection::Output,
                    PinWidth::Bit1,
                );
                (pin.id, pin)
            })
            .collect();
        let internal_state = if internal_state.is_empty() {
            kind.default_internal_state()
        } else {
            internal_state
        };
        Chip {
            id,
            name: kind.name().to_string(),
            inputs,
            outputs,
            internal_state,
            kind: ChipKind::Primitive(kind),
        }
    }

    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self.kind {
            ChipKind::Primitive(kind) => Some(kind),
            ChipKind::Composite(_) => None,
        }
    }

    /// True for primitives whose outputs only depend on held state, so their
    /// inputs are not needed before they are evaluated
    pub fn is_sequential(&self) -> bool {
        self.primitive_kind().is_some_and(|kind| kind.is_sequential())
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.kind, ChipKind::Composite(_))
    }

    pub fn as_composite(&self) -> Option<&Composite> {
        match &self.kind {
            ChipKind::Composite(c) => Some(c),
            ChipKind::Primitive(_) => None,
        }
    }

    pub fn as_composite_mut(&mut self) -> Option<&mut Composite> {
        match &mut self.kind {
            ChipKind::Composite(c) => Some(c),
            ChipKind::Primitive(_) => None,
        }
    }

    /// Link ID of a BUS primitive that takes part in a bus net
    pub fn bus_link(&self) -> Option<u32> {
        match self.kind {
            ChipKind::Primitive(PrimitiveKind::Bus) => self.internal_state.first().copied(),
            _ => None,
        }
    }

    pub fn pin(&self, id: PinId, direction: PinDirection) -> Option<&Pin> {
        match direction {
            PinDirection::Input => self.inputs.get(&id),
            PinDirection::Output => self.outputs.get(&id),
        }
    }

    pub fn pin_mut(&mut self, id: PinId, direction: PinDirection) -> Option<&mut Pin> {
        match direction {
            PinDirection::Input => self.inputs.get_mut(&id),
            PinDirection::Output => self.outputs.get_mut(&id),
        }
    }

    /// Resolve an address relative to this chip (own pins or a direct sub-chip's)
    pub fn resolve(&self, address: &PinAddress) -> Option<&Pin> {
        match address.owner {
            PinOwner::Parent => self.pin(address.pin, address.direction),
            PinOwner::Child(id) => self
                .as_composite()?
                .child(id)?
                .pin(address.pin, address.direction),
        }
    }

    pub fn resolve_mut(&mut self, address: &PinAddress) -> Option<&mut Pin> {
        match address.owner {
            PinOwner::Parent => self.pin_mut(address.pin, address.direction),
            PinOwner::Child(id) => self
                .as_composite_mut()?
                .child_mut(id)?
                .pin_mut(address.pin, address.direction),
        }
    }

    /// Follow a path of sub-chip IDs; the empty path is this chip
    pub fn get_chip_or_sub_chip(&self, path: &[ChipId]) -> Option<&Chip> {
        let mut chip = self;
        for id in path {
            chip = chip.as_composite()?.child(*id)?;
        }
        Some(chip)
    }

    pub fn get_chip_or_sub_chip_mut(&mut self, path: &[ChipId]) -> Option<&mut Chip> {
        let mut chip = self;
        for id in path {
            chip = chip.as_composite_mut()?.child_mut(*id)?;
        }
        Some(chip)
    }

    /// State of the pin at `address`, relative to the chip at `path`
    pub fn pin_state(&self, path: &[ChipId], address: &PinAddress) -> Option<PinState> {
        self.get_chip_or_sub_chip(path)?
            .resolve(address)
            .map(|pin| pin.state)
    }

    pub fn input_states(&self) -> Vec<PinState> {
        self.inputs.values().map(|p| p.state).collect()
    }

    pub fn output_states(&self) -> Vec<PinState> {
        self.outputs.values().map(|p| p.state).collect()
    }

    /// Composite nesting depth; primitives are depth 0
    pub fn depth(&self) -> usize {
        match &self.kind {
            ChipKind::Primitive(_) => 0,
            ChipKind::Composite(c) => {
                1 + c.children.values().map(Chip::depth).max().unwrap_or(0)
            }
        }
    }

    /// Number of chips in this subtree, including this one
    pub fn chip_count(&self) -> usize {
        match &self.kind {
            ChipKind::Primitive(_) => 1,
            ChipKind::Composite(c) => 1 + c.children.values().map(Chip::chip_count).sum::<usize>(),
        }
    }

    /// Return every pin to `Floating` and primitives to their initial state
    pub fn reset(&mut self) {
        for pin in self.inputs.values_mut().chain(self.outputs.values_mut()) {
            pin.reset();
        }
        match &mut self.kind {
            ChipKind::Primitive(PrimitiveKind::TickDelay) => {
                self.internal_state = PrimitiveKind::TickDelay.default_internal_state();
            }
            ChipKind::Primitive(_) => {}
            ChipKind::Composite(c) => {
                for child in c.children.values_mut() {
                    child.reset();
                }
            }
        }
    }

    pub fn snapshot(&self) -> ChipSnapshot {
        let pins = |pins: &IndexMap<PinId, Pin>| -> Vec<PinSnapshot> {
            pins.values()
                .map(|p| PinSnapshot {
                    id: p.id,
                    state: p.state,
                    registered: p.registered,
                })
                .collect()
        };
        ChipSnapshot {
            id: self.id,
            name: self.name.clone(),
            inputs: pins(&self.inputs),
            outputs: pins(&self.outputs),
            children: self
                .as_composite()
                .map(|c| c.children.values().map(Chip::snapshot).collect())
                .unwrap_or_default(),
        }
    }
}

// ============================================================================
// Snapshots
// ============================================================================

/// Read-only copy of pin states for renderers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChipSnapshot {
    pub id: ChipId,
    pub name: String,
    pub inputs: Vec<PinSnapshot>,
    pub outputs: Vec<PinSnapshot>,
    pub children: Vec<ChipSnapshot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PinSnapshot {
    pub id: PinId,
    pub state: PinState,
    pub registered: bool,
}
