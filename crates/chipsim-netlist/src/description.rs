//! Structural chip descriptions
//!
//! A description is what the editor/save layer hands over: the boundary pins,
//! the named sub-chip instances and the point-to-point connections of one
//! composite chip. Descriptions reference other chips by name; the
//! [`ChipLibrary`] resolves those names.

use crate::address::{ChipId, PinAddress, PinId};
use crate::error::{NetlistError, Result};
use crate::primitives::PrimitiveKind;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Bit-width class of a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PinWidth {
    #[default]
    Bit1,
    Bit4,
    Bit8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinDescription {
    pub id: PinId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub width: PinWidth,
}

impl PinDescription {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id: PinId(id),
            name: name.into(),
            width: PinWidth::Bit1,
        }
    }

    pub fn with_width(mut self, width: PinWidth) -> Self {
        self.width = width;
        self
    }
}

/// A named instance of another chip inside a composite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubChipDescription {
    /// Library name of the instantiated chip
    pub name: String,
    pub id: ChipId,
    /// Opaque words for stateful primitives (bus link, held tick-delay bit)
    #[serde(default)]
    pub internal_state: Vec<u32>,
}

impl SubChipDescription {
    pub fn new(name: impl Into<String>, id: u32) -> Self {
        Self {
            name: name.into(),
            id: ChipId(id),
            internal_state: Vec::new(),
        }
    }

    pub fn with_internal_state(mut self, words: Vec<u32>) -> Self {
        self.internal_state = words;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDescription {
    pub source: PinAddress,
    pub target: PinAddress,
}

/// Structural description of a composite chip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipDescription {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<PinDescription>,
    #[serde(default)]
    pub outputs: Vec<PinDescription>,
    #[serde(default)]
    pub sub_chips: Vec<SubChipDescription>,
    #[serde(default)]
    pub connections: Vec<ConnectionDescription>,
}

impl ChipDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            sub_chips: Vec::new(),
            connections: Vec::new(),
        }
    }

    pub fn with_input(mut self, id: u32, name: impl Into<String>) -> Self {
        self.inputs.push(PinDescription::new(id, name));
        self
    }

    pub fn with_output(mut self, id: u32, name: impl Into<String>) -> Self {
        self.outputs.push(PinDescription::new(id, name));
        self
    }

    pub fn with_sub_chip(mut self, name: impl Into<String>, id: u32) -> Self {
        self.sub_chips.push(SubChipDescription::new(name, id));
        self
    }

    pub fn with_stateful_sub_chip(
        mut self,
        name: impl Into<String>,
        id: u32,
        internal_state: Vec<u32>,
    ) -> Self {
        self.sub_chips
            .push(SubChipDescription::new(name, id).with_internal_state(internal_state));
        self
    }

    pub fn with_connection(mut self, source: PinAddress, target: PinAddress) -> Self {
        self.connections.push(ConnectionDescription { source, target });
        self
    }

    /// Names of the chips this description instantiates directly
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.sub_chips.iter().map(|s| s.name.as_str())
    }
}

/// What a library name resolves to
#[derive(Debug, Clone, Copy)]
pub enum ChipRef<'a> {
    Primitive(PrimitiveKind),
    Composite(&'a ChipDescription),
}

/// Named chip descriptions available to the builder
///
/// Primitive names always resolve and cannot be shadowed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChipLibrary {
    descriptions: IndexMap<String, ChipDescription>,
}

impl ChipLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a composite description
    pub fn insert(&mut self, description: ChipDescription) -> Result<()> {
        if PrimitiveKind::from_name(&description.name).is_some() {
            return Err(NetlistError::ReservedName(description.name));
        }
        self.descriptions
            .insert(description.name.clone(), description);
        Ok(())
    }

    pub fn with(mut self, description: ChipDescription) -> Result<Self> {
        self.insert(description)?;
        Ok(self)
    }

    pub fn remove(&mut self, name: &str) -> Option<ChipDescription> {
        self.descriptions.shift_remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&ChipDescription> {
        self.descriptions.get(name)
    }

    pub fn resolve(&self, name: &str) -> Option<ChipRef<'_>> {
        if let Some(kind) = PrimitiveKind::from_name(name) {
            return Some(ChipRef::Primitive(kind));
        }
        self.descriptions.get(name).map(ChipRef::Composite)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.descriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptions.is_empty()
    }
}
