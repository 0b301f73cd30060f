//! Graph Builder
//!
//! Compiles a structural [`ChipDescription`] into a runtime [`Chip`] tree.
//! Sub-chips are resolved by name through the [`ChipLibrary`] and built
//! before the composite that instantiates them is wired, so every name a
//! composite references is fully built by the time its connections are
//! checked. A chip type that (indirectly) contains itself is rejected.

use crate::address::{ChipId, PinAddress, PinDirection};
use crate::cycle::analyze_cycles;
use crate::description::{ChipDescription, ChipLibrary, ChipRef, SubChipDescription};
use crate::error::{NetlistError, Result};
use crate::graph::{Chip, ChipKind, Composite, Pin};
use crate::primitives::PrimitiveKind;
use indexmap::IndexMap;
use std::collections::HashSet;
use tracing::debug;

/// Default bound on composite nesting
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 64;

pub struct GraphBuilder<'a> {
    library: &'a ChipLibrary,
    max_depth: usize,
    /// Composite names currently being built, outermost first
    loading: Vec<String>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(library: &'a ChipLibrary) -> Self {
        Self {
            library,
            max_depth: DEFAULT_MAX_NESTING_DEPTH,
            loading: Vec::new(),
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Build inside existing composites (live edits), outermost first.
    /// They count toward the nesting limit and may not be instantiated again.
    pub fn enclosed_by(mut self, ancestors: Vec<String>) -> Self {
        self.loading = ancestors;
        self
    }

    /// Build the library chip `name` as a simulation root
    pub fn build(&mut self, name: &str) -> Result<Chip> {
        self.build_named(name, ChipId(0), &[])
    }

    /// Build a root from a description that need not be in the library
    pub fn build_description(&mut self, description: &ChipDescription) -> Result<Chip> {
        self.build_composite(description, ChipId(0))
    }

    /// Build one sub-chip instance
    pub fn build_sub_chip(&mut self, sub: &SubChipDescription) -> Result<Chip> {
        self.build_named(&sub.name, sub.id, &sub.internal_state)
    }

    fn build_named(&mut self, name: &str, id: ChipId, internal_state: &[u32]) -> Result<Chip> {
        let library = self.library;
        match library.resolve(name) {
            Some(ChipRef::Primitive(kind)) => {
                validate_internal_state(kind, internal_state)?;
                Ok(Chip::primitive(kind, id, internal_state.to_vec()))
            }
            Some(ChipRef::Composite(description)) => self.build_composite(description, id),
            None => Err(NetlistError::UnknownChip(name.to_string())),
        }
    }

    fn build_composite(&mut self, description: &ChipDescription, id: ChipId) -> Result<Chip> {
        let name = description.name.as_str();
        if self.loading.iter().any(|n| n == name) {
            return Err(NetlistError::CircularDefinition(name.to_string()));
        }
        if self.loading.len() >= self.max_depth {
            return Err(NetlistError::NestingTooDeep {
                name: name.to_string(),
                limit: self.max_depth,
            });
        }

        self.loading.push(name.to_string());
        let result = self.assemble(description, id);
        self.loading.pop();
        result
    }

    fn assemble(&mut self, description: &ChipDescription, id: ChipId) -> Result<Chip> {
        let name = description.name.as_str();

        let mut seen = HashSet::new();
        for pin in description.inputs.iter().chain(&description.outputs) {
            if !seen.insert(pin.id) {
                return Err(NetlistError::DuplicatePin {
                    chip: name.to_string(),
                    pin: pin.id,
                });
            }
        }
        let inputs: IndexMap<_, _> = description
            .inputs
            .iter()
            .map(|p| (p.id, Pin::from_description(p, PinDirection::Input)))
            .collect();
        let outputs: IndexMap<_, _> = description
            .outputs
            .iter()
            .map(|p| (p.id, Pin::from_description(p, PinDirection::Output)))
            .collect();

        // Post-order: every referenced chip is built before this one is wired
        let mut composite = Composite::default();
        for sub in &description.sub_chips {
            if composite.children.contains_key(&sub.id) {
                return Err(NetlistError::DuplicateChip(sub.id));
            }
            let child = self.build_sub_chip(sub)?;
            composite.children.insert(sub.id, child);
        }

        let mut chip = Chip {
            id,
            name: name.to_string(),
            inputs,
            outputs,
            internal_state: Vec::new(),
            kind: ChipKind::Composite(composite),
        };

        for conn in &description.connections {
            validate_connection(&chip, &conn.source, &conn.target)?;
            if let Some(composite) = chip.as_composite_mut() {
                composite.wiring.connect(conn.source, conn.target)?;
            }
        }

        if let Some(composite) = chip.as_composite_mut() {
            let report = analyze_cycles(composite);
            debug!(
                "built '{}': {} sub-chips, {} connections, {} registered pins",
                name,
                composite.children.len(),
                composite.wiring.len(),
                report.loop_count()
            );
        }
        Ok(chip)
    }
}

/// Check that `source -> target` is a legal connection inside `chip`
///
/// Fan-in is checked separately by the wiring index.
pub(crate) fn validate_connection(
    chip: &Chip,
    source: &PinAddress,
    target: &PinAddress,
) -> Result<()> {
    if !source.is_source() {
        return Err(NetlistError::NotASource(*source));
    }
    if !target.is_target() {
        return Err(NetlistError::NotATarget(*target));
    }
    let source_pin = lookup_pin(chip, source)?;
    let target_pin = lookup_pin(chip, target)?;
    if source_pin.width != target_pin.width {
        return Err(NetlistError::WidthMismatch {
            source_pin: *source,
            target: *target,
        });
    }
    Ok(())
}

pub(crate) fn lookup_pin<'c>(chip: &'c Chip, address: &PinAddress) -> Result<&'c Pin> {
    if let Some(id) = address.child() {
        let composite = chip
            .as_composite()
            .ok_or_else(|| NetlistError::NotComposite(chip.name.clone()))?;
        if composite.child(id).is_none() {
            return Err(NetlistError::UnknownSubChip(id));
        }
    }
    chip.resolve(address)
        .ok_or(NetlistError::UnknownPin(*address))
}

fn validate_internal_state(kind: PrimitiveKind, words: &[u32]) -> Result<()> {
    let invalid = |reason: &str| NetlistError::InvalidInternalState {
        chip: kind.name().to_string(),
        reason: reason.to_string(),
    };
    match kind {
        PrimitiveKind::Bus if words.len() > 1 => Err(invalid("expected at most one link word")),
        PrimitiveKind::TickDelay if words.len() > 1 => Err(invalid("expected one held-state word")),
        PrimitiveKind::TickDelay if words.first().is_some_and(|w| *w > 2) => {
            Err(invalid("held state must be 0, 1 or 2"))
        }
        _ => Ok(()),
    }
}
