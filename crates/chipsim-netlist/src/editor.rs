//! Structural Editor
//!
//! Live edits of a built chip tree. Every operation targets the composite at
//! an ID path from the root, checks everything it needs before touching the
//! tree, and re-runs cycle analysis on the edited composite and its ancestors.
//! A rejected edit leaves the tree exactly as it was; an accepted one leaves
//! the state of every unrelated pin untouched.

use crate::address::{ChipId, PinAddress, PinDirection, PinId, PinOwner};
use crate::builder::{validate_connection, GraphBuilder, DEFAULT_MAX_NESTING_DEPTH};
use crate::cycle::analyze_cycles;
use crate::description::{ChipLibrary, PinDescription, SubChipDescription};
use crate::error::{NetlistError, Result};
use crate::graph::{Chip, ChipKind, Composite, Pin};
use tracing::debug;

pub struct ChipEditor<'a> {
    root: &'a mut Chip,
    library: &'a ChipLibrary,
    max_depth: usize,
}

impl<'a> ChipEditor<'a> {
    pub fn new(root: &'a mut Chip, library: &'a ChipLibrary) -> Self {
        Self {
            root,
            library,
            max_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Instantiate a new sub-chip inside the composite at `path`
    pub fn add_chip(&mut self, path: &[ChipId], sub: &SubChipDescription) -> Result<()> {
        let ancestors = self.ancestor_names(path)?;
        let composite = self.composite_at(path)?;
        if composite.children.contains_key(&sub.id) {
            return Err(NetlistError::DuplicateChip(sub.id));
        }

        let chip = GraphBuilder::new(self.library)
            .with_max_depth(self.max_depth)
            .enclosed_by(ancestors)
            .build_sub_chip(sub)?;

        self.composite_at_mut(path)?.children.insert(sub.id, chip);
        debug!("added '{}' as {} at {:?}", sub.name, sub.id, path);
        self.reanalyze(path);
        Ok(())
    }

    /// Remove a sub-chip and every connection touching its pins
    pub fn remove_chip(&mut self, path: &[ChipId], id: ChipId) -> Result<Chip> {
        let composite = self.composite_at_mut(path)?;
        let chip = composite
            .children
            .shift_remove(&id)
            .ok_or(NetlistError::UnknownSubChip(id))?;
        let removed = composite.wiring.remove_touching(|a| a.child() == Some(id));

        debug!(
            "removed {} ('{}') at {:?} with {} connections",
            id,
            chip.name,
            path,
            removed.len()
        );
        self.reanalyze(path);
        Ok(chip)
    }

    /// Add a boundary pin to the composite at `path`
    pub fn add_pin(
        &mut self,
        path: &[ChipId],
        pin: &PinDescription,
        direction: PinDirection,
    ) -> Result<()> {
        let chip = self.composite_chip_at_mut(path)?;
        if chip.inputs.contains_key(&pin.id) || chip.outputs.contains_key(&pin.id) {
            return Err(NetlistError::DuplicatePin {
                chip: chip.name.clone(),
                pin: pin.id,
            });
        }
        let new_pin = Pin::from_description(pin, direction);
        match direction {
            PinDirection::Input => chip.inputs.insert(pin.id, new_pin),
            PinDirection::Output => chip.outputs.insert(pin.id, new_pin),
        };
        debug!("added {:?} pin {:?} to '{}'", direction, pin.id, chip.name);
        Ok(())
    }

    /// Remove a boundary pin of the composite at `path`
    ///
    /// Connections to it are deleted both inside the composite and, for a
    /// nested composite, in the enclosing one.
    pub fn remove_pin(
        &mut self,
        path: &[ChipId],
        pin: PinId,
        direction: PinDirection,
    ) -> Result<()> {
        let address = PinAddress {
            owner: PinOwner::Parent,
            pin,
            direction,
        };
        let chip = self.composite_chip_at_mut(path)?;
        let removed = match direction {
            PinDirection::Input => chip.inputs.shift_remove(&pin),
            PinDirection::Output => chip.outputs.shift_remove(&pin),
        };
        if removed.is_none() {
            return Err(NetlistError::UnknownPin(address));
        }
        if let Some(composite) = chip.as_composite_mut() {
            composite.wiring.remove_touching(|a| *a == address);
        }

        if let Some((id, parent_path)) = path.split_last() {
            let outer = PinAddress {
                owner: PinOwner::Child(*id),
                pin,
                direction,
            };
            let parent = self.composite_at_mut(parent_path)?;
            parent.wiring.remove_touching(|a| *a == outer);
        }

        debug!("removed {} at {:?}", address, path);
        self.reanalyze(path);
        Ok(())
    }

    pub fn add_connection(
        &mut self,
        path: &[ChipId],
        source: PinAddress,
        target: PinAddress,
    ) -> Result<()> {
        let chip = self.composite_chip_at_mut(path)?;
        validate_connection(chip, &source, &target)?;
        if let Some(composite) = chip.as_composite_mut() {
            composite.wiring.connect(source, target)?;
        }
        debug!("connected {} -> {} at {:?}", source, target, path);
        self.reanalyze(path);
        Ok(())
    }

    pub fn remove_connection(
        &mut self,
        path: &[ChipId],
        source: PinAddress,
        target: PinAddress,
    ) -> Result<()> {
        self.composite_at_mut(path)?
            .wiring
            .disconnect(&source, &target)?;
        debug!("disconnected {} -> {} at {:?}", source, target, path);
        self.reanalyze(path);
        Ok(())
    }

    // ------------------------------------------------------------------------

    fn composite_chip_at_mut(&mut self, path: &[ChipId]) -> Result<&mut Chip> {
        let chip = self
            .root
            .get_chip_or_sub_chip_mut(path)
            .ok_or_else(|| NetlistError::UnknownPath(path.to_vec()))?;
        if !chip.is_composite() {
            return Err(NetlistError::NotComposite(chip.name.clone()));
        }
        Ok(chip)
    }

    fn composite_at(&self, path: &[ChipId]) -> Result<&Composite> {
        let chip = self
            .root
            .get_chip_or_sub_chip(path)
            .ok_or_else(|| NetlistError::UnknownPath(path.to_vec()))?;
        chip.as_composite()
            .ok_or_else(|| NetlistError::NotComposite(chip.name.clone()))
    }

    fn composite_at_mut(&mut self, path: &[ChipId]) -> Result<&mut Composite> {
        let chip = self.composite_chip_at_mut(path)?;
        match &mut chip.kind {
            ChipKind::Composite(composite) => Ok(composite),
            ChipKind::Primitive(_) => Err(NetlistError::NotComposite(chip.name.clone())),
        }
    }

    /// Names of the root and every composite along `path`, outermost first
    fn ancestor_names(&self, path: &[ChipId]) -> Result<Vec<String>> {
        (0..=path.len())
            .map(|depth| {
                self.root
                    .get_chip_or_sub_chip(&path[..depth])
                    .map(|chip| chip.name.clone())
                    .ok_or_else(|| NetlistError::UnknownPath(path.to_vec()))
            })
            .collect()
    }

    /// Cycle analysis on the composite at `path` and each enclosing one
    fn reanalyze(&mut self, path: &[ChipId]) {
        for depth in (0..=path.len()).rev() {
            if let Some(composite) = self
                .root
                .get_chip_or_sub_chip_mut(&path[..depth])
                .and_then(Chip::as_composite_mut)
            {
                analyze_cycles(composite);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::description::ChipDescription;
    use crate::pin_state::PinState;

    fn library() -> ChipLibrary {
        ChipLibrary::new()
            .with(
                ChipDescription::new("BUFFER")
                    .with_input(0, "in")
                    .with_output(1, "out")
                    .with_sub_chip("NOT", 0)
                    .with_sub_chip("NOT", 1)
                    .with_connection(PinAddress::parent_input(0), PinAddress::child_input(0, 0))
                    .with_connection(PinAddress::child_output(0, 1), PinAddress::child_input(1, 0))
                    .with_connection(PinAddress::child_output(1, 1), PinAddress::parent_output(1)),
            )
            .unwrap()
            .with(
                ChipDescription::new("TOP")
                    .with_input(0, "a")
                    .with_output(1, "y")
                    .with_sub_chip("BUFFER", 3)
                    .with_connection(PinAddress::parent_input(0), PinAddress::child_input(3, 0))
                    .with_connection(PinAddress::child_output(3, 1), PinAddress::parent_output(1)),
            )
            .unwrap()
    }

    fn wiring_at<'c>(root: &'c Chip, path: &[ChipId]) -> &'c crate::graph::Wiring {
        &root.get_chip_or_sub_chip(path).unwrap().as_composite().unwrap().wiring
    }

    #[test]
    fn test_remove_chip_drops_connections() {
        let library = library();
        let mut root = GraphBuilder::new(&library).build("TOP").unwrap();
        let path = [ChipId(3)];

        let removed = ChipEditor::new(&mut root, &library)
            .remove_chip(&path, ChipId(0))
            .unwrap();
        assert_eq!(removed.name, "NOT");

        let wiring = wiring_at(&root, &path);
        assert_eq!(wiring.len(), 1);
        assert!(wiring.iter().all(|c| c.source.child() != Some(ChipId(0))
            && c.target.child() != Some(ChipId(0))));
        assert!(root
            .pin_state(&path, &PinAddress::child_input(0, 0))
            .is_none());
    }

    #[test]
    fn test_add_connection_fan_in_leaves_tree_unchanged() {
        let library = library();
        let mut root = GraphBuilder::new(&library).build("TOP").unwrap();
        let before = root.clone();

        let err = ChipEditor::new(&mut root, &library)
            .add_connection(
                &[ChipId(3)],
                PinAddress::parent_input(0),
                PinAddress::child_input(1, 0),
            )
            .unwrap_err();
        assert!(matches!(err, NetlistError::FanInViolation { .. }));
        assert_eq!(root, before);
    }

    #[test]
    fn test_connection_edits_update_registration() {
        let library = library();
        let mut root = GraphBuilder::new(&library).build("TOP").unwrap();
        let path = [ChipId(3)];
        let mut editor = ChipEditor::new(&mut root, &library);

        editor
            .remove_connection(&path, PinAddress::parent_input(0), PinAddress::child_input(0, 0))
            .unwrap();
        editor
            .add_connection(&path, PinAddress::child_output(1, 1), PinAddress::child_input(0, 0))
            .unwrap();

        let composite = root.get_chip_or_sub_chip(&path).unwrap().as_composite().unwrap();
        assert_eq!(composite.registered_pins().len(), 1);
    }

    #[test]
    fn test_remove_nested_pin_cleans_parent() {
        let library = library();
        let mut root = GraphBuilder::new(&library).build("TOP").unwrap();

        ChipEditor::new(&mut root, &library)
            .remove_pin(&[ChipId(3)], PinId(1), PinDirection::Output)
            .unwrap();

        assert_eq!(wiring_at(&root, &[ChipId(3)]).len(), 2);
        let top = wiring_at(&root, &[]);
        assert_eq!(top.len(), 1);
        assert!(top.driver_of(&PinAddress::parent_output(1)).is_none());
    }

    #[test]
    fn test_add_pin_and_chip() {
        let library = library();
        let mut root = GraphBuilder::new(&library).build("TOP").unwrap();
        let mut editor = ChipEditor::new(&mut root, &library);

        editor
            .add_pin(&[], &PinDescription::new(2, "b"), PinDirection::Input)
            .unwrap();
        let err = editor
            .add_pin(&[], &PinDescription::new(2, "again"), PinDirection::Output)
            .unwrap_err();
        assert!(matches!(err, NetlistError::DuplicatePin { .. }));

        editor
            .add_chip(&[], &SubChipDescription::new("BUFFER", 4))
            .unwrap();
        editor
            .add_connection(&[], PinAddress::parent_input(2), PinAddress::child_input(4, 0))
            .unwrap();
        assert_eq!(root.chip_count(), 7);
        assert_eq!(
            root.pin_state(&[], &PinAddress::parent_input(2)),
            Some(PinState::Floating)
        );
    }

    #[test]
    fn test_add_chip_rejects_reentrant_type() {
        let library = library();
        let mut root = GraphBuilder::new(&library).build("TOP").unwrap();
        let err = ChipEditor::new(&mut root, &library)
            .add_chip(&[ChipId(3)], &SubChipDescription::new("TOP", 9))
            .unwrap_err();
        assert_eq!(err, NetlistError::CircularDefinition("TOP".into()));
    }

    #[test]
    fn test_edit_bad_paths() {
        let library = library();
        let mut root = GraphBuilder::new(&library).build("TOP").unwrap();
        let mut editor = ChipEditor::new(&mut root, &library);

        assert_eq!(
            editor.remove_chip(&[ChipId(8)], ChipId(0)).unwrap_err(),
            NetlistError::UnknownPath(vec![ChipId(8)])
        );
        assert_eq!(
            editor
                .remove_chip(&[ChipId(3), ChipId(0)], ChipId(0))
                .unwrap_err(),
            NetlistError::NotComposite("NOT".into())
        );
        assert_eq!(
            editor.remove_chip(&[], ChipId(42)).unwrap_err(),
            NetlistError::UnknownSubChip(ChipId(42))
        );
    }
}
