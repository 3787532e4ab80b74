// Licensed under the Apache-2.0 license

//! Typed mirror of a register description document.
//!
//! Every optional attribute stays optional here; defaults are applied only
//! when the IR is built, so that inheritance can tell "absent" apart from
//! "explicitly set".

use crate::value::{EnumValueLiteral, Literal};
use serde::Serialize;
use std::fmt;

//=========================================================================
// Enumerations
//=========================================================================

/// The kind of a node that can carry a name or a `derivedFrom` reference.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Device,
    Peripheral,
    Cluster,
    Register,
    Field,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ItemKind::Device => "device",
            ItemKind::Peripheral => "peripheral",
            ItemKind::Cluster => "cluster",
            ItemKind::Register => "register",
            ItemKind::Field => "field",
        })
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Access {
    ReadOnly,
    WriteOnly,
    ReadWrite,
    WriteOnce,
    ReadWriteOnce,
}

impl Access {
    pub fn is_readable(self) -> bool {
        matches!(
            self,
            Access::ReadOnly | Access::ReadWrite | Access::ReadWriteOnce
        )
    }

    pub fn is_writable(self) -> bool {
        !matches!(self, Access::ReadOnly)
    }
}

impl Literal for Access {
    const KIND: &'static str = "access";
    const TABLE: &'static [(&'static str, Self)] = &[
        ("read-only", Access::ReadOnly),
        ("write-only", Access::WriteOnly),
        ("read-write", Access::ReadWrite),
        ("writeOnce", Access::WriteOnce),
        ("read-writeOnce", Access::ReadWriteOnce),
        ("write-once", Access::WriteOnce),
        // Spellings seen in vendor files.
        ("write", Access::WriteOnly),
        ("read", Access::ReadOnly),
    ];
}

/// Side effect of a write on the stored value.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ModifiedWriteValues {
    OneToClear,
    OneToSet,
    OneToToggle,
    ZeroToClear,
    ZeroToSet,
    ZeroToToggle,
    Clear,
    Set,
    Modify,
}

impl Literal for ModifiedWriteValues {
    const KIND: &'static str = "modified write values";
    const TABLE: &'static [(&'static str, Self)] = &[
        ("oneToClear", ModifiedWriteValues::OneToClear),
        ("oneToSet", ModifiedWriteValues::OneToSet),
        ("oneToToggle", ModifiedWriteValues::OneToToggle),
        ("zeroToClear", ModifiedWriteValues::ZeroToClear),
        ("zeroToSet", ModifiedWriteValues::ZeroToSet),
        ("zeroToToggle", ModifiedWriteValues::ZeroToToggle),
        ("clear", ModifiedWriteValues::Clear),
        ("set", ModifiedWriteValues::Set),
        ("modify", ModifiedWriteValues::Modify),
    ];
}

/// Side effect of a read on the stored value.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReadAction {
    Clear,
    Set,
    Modify,
    ModifyExternal,
}

impl Literal for ReadAction {
    const KIND: &'static str = "read action";
    const TABLE: &'static [(&'static str, Self)] = &[
        ("clear", ReadAction::Clear),
        ("set", ReadAction::Set),
        ("modify", ReadAction::Modify),
        ("modifyExternal", ReadAction::ModifyExternal),
    ];
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protection {
    Secure,
    NonSecure,
    Privileged,
}

impl Literal for Protection {
    const KIND: &'static str = "protection";
    const TABLE: &'static [(&'static str, Self)] = &[
        ("s", Protection::Secure),
        ("n", Protection::NonSecure),
        ("p", Protection::Privileged),
    ];
}

/// Which accesses an enumerated value set applies to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Usage {
    Read,
    Write,
    ReadWrite,
}

impl Literal for Usage {
    const KIND: &'static str = "usage";
    const TABLE: &'static [(&'static str, Self)] = &[
        ("read", Usage::Read),
        ("write", Usage::Write),
        ("read-write", Usage::ReadWrite),
    ];
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AddressBlockUsage {
    Registers,
    Buffer,
    Reserved,
}

impl Literal for AddressBlockUsage {
    const KIND: &'static str = "address block usage";
    const TABLE: &'static [(&'static str, Self)] = &[
        ("registers", AddressBlockUsage::Registers),
        ("buffer", AddressBlockUsage::Buffer),
        ("reserved", AddressBlockUsage::Reserved),
    ];
}

//=========================================================================
// Shared attribute groups
//=========================================================================

/// Register properties that flow down from device to peripheral to cluster
/// to register.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RegisterProperties {
    pub size: Option<u64>,
    pub access: Option<Access>,
    pub protection: Option<Protection>,
    pub reset_value: Option<u64>,
    pub reset_mask: Option<u64>,
}

impl RegisterProperties {
    /// Fills every attribute absent here from `parent`.
    pub fn inherit(&self, parent: &RegisterProperties) -> RegisterProperties {
        RegisterProperties {
            size: self.size.or(parent.size),
            access: self.access.or(parent.access),
            protection: self.protection.or(parent.protection),
            reset_value: self.reset_value.or(parent.reset_value),
            reset_mask: self.reset_mask.or(parent.reset_mask),
        }
    }
}

/// Array description of a node: `dim` copies, `increment` bytes apart.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Dimension {
    pub dim: u64,
    pub increment: u64,
    /// Substitution strings for `%s`, one per element.
    pub index: Option<Vec<String>>,
    pub name: Option<String>,
}

impl Dimension {
    /// Element names substituted for `%s`, defaulting to `0..dim`.
    pub fn indices(&self) -> Vec<String> {
        match &self.index {
            Some(index) => index.clone(),
            None => (0..self.dim).map(|i| i.to_string()).collect(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WriteConstraint {
    WriteAsRead(bool),
    UseEnumeratedValues(bool),
    Range { minimum: u64, maximum: u64 },
}

//=========================================================================
// Nodes
//=========================================================================

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Device {
    pub name: String,
    pub vendor: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub address_unit_bits: Option<u64>,
    pub width: Option<u64>,
    pub properties: RegisterProperties,
    pub peripherals: Vec<Peripheral>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Peripheral {
    pub name: String,
    pub derived_from: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub group_name: Option<String>,
    pub prepend_to_name: Option<String>,
    pub append_to_name: Option<String>,
    /// Required in the document; `None` only for derived peripherals that
    /// inherit it.
    pub base_address: Option<u64>,
    pub properties: RegisterProperties,
    pub dim: Option<Dimension>,
    pub address_blocks: Vec<AddressBlock>,
    pub interrupts: Vec<Interrupt>,
    pub children: Vec<RegisterNode>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AddressBlock {
    pub offset: u64,
    pub size: u64,
    pub usage: Option<AddressBlockUsage>,
    pub protection: Option<Protection>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Interrupt {
    pub name: String,
    pub description: Option<String>,
    pub value: i64,
}

/// A child of a peripheral or cluster.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RegisterNode {
    Register(Register),
    Cluster(Cluster),
}

impl RegisterNode {
    pub fn name(&self) -> &str {
        match self {
            RegisterNode::Register(r) => &r.name,
            RegisterNode::Cluster(c) => &c.name,
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            RegisterNode::Register(_) => ItemKind::Register,
            RegisterNode::Cluster(_) => ItemKind::Cluster,
        }
    }

    pub fn derived_from(&self) -> Option<&str> {
        match self {
            RegisterNode::Register(r) => r.derived_from.as_deref(),
            RegisterNode::Cluster(c) => c.derived_from.as_deref(),
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Cluster {
    pub name: String,
    pub derived_from: Option<String>,
    pub description: Option<String>,
    pub header_struct_name: Option<String>,
    pub address_offset: Option<u64>,
    pub properties: RegisterProperties,
    pub dim: Option<Dimension>,
    pub children: Vec<RegisterNode>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Register {
    pub name: String,
    pub derived_from: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub alternate_group: Option<String>,
    pub alternate_register: Option<String>,
    pub address_offset: Option<u64>,
    pub properties: RegisterProperties,
    pub dim: Option<Dimension>,
    pub modified_write_values: Option<ModifiedWriteValues>,
    pub write_constraint: Option<WriteConstraint>,
    pub read_action: Option<ReadAction>,
    pub fields: Vec<Field>,
}

/// Inclusive bit span of a field.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct BitRange {
    pub lsb: u64,
    pub msb: u64,
}

impl BitRange {
    pub fn width(&self) -> u64 {
        self.msb - self.lsb + 1
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Field {
    pub name: String,
    pub derived_from: Option<String>,
    pub description: Option<String>,
    pub bit_range: Option<BitRange>,
    pub access: Option<Access>,
    pub modified_write_values: Option<ModifiedWriteValues>,
    pub write_constraint: Option<WriteConstraint>,
    pub read_action: Option<ReadAction>,
    pub dim: Option<Dimension>,
    pub enumerated_values: Vec<EnumeratedValues>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EnumeratedValues {
    pub name: Option<String>,
    pub usage: Option<Usage>,
    pub values: Vec<EnumeratedValue>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EnumeratedValue {
    pub name: String,
    pub description: Option<String>,
    /// Absent only when `is_default` is set.
    pub value: Option<EnumValueLiteral>,
    pub is_default: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_literals() {
        assert_eq!(Access::from_literal("read-only"), Ok(Access::ReadOnly));
        assert_eq!(Access::from_literal("Read-Write"), Ok(Access::ReadWrite));
        assert_eq!(Access::from_literal("read-writeonce"), Ok(Access::ReadWriteOnce));
        assert_eq!(Access::from_literal(" write-once "), Ok(Access::WriteOnce));
        assert!(Access::from_literal("rw").is_err());
        assert!(Access::ReadWriteOnce.is_readable());
        assert!(!Access::WriteOnce.is_readable());
        assert!(!Access::ReadOnly.is_writable());
    }

    #[test]
    fn test_other_literals() {
        assert_eq!(
            ModifiedWriteValues::from_literal("oneToClear"),
            Ok(ModifiedWriteValues::OneToClear)
        );
        assert_eq!(ReadAction::from_literal("modifyExternal"), Ok(ReadAction::ModifyExternal));
        assert_eq!(Protection::from_literal("S"), Ok(Protection::Secure));
        assert_eq!(Usage::from_literal("read-write"), Ok(Usage::ReadWrite));
        assert_eq!(
            AddressBlockUsage::from_literal("registers"),
            Ok(AddressBlockUsage::Registers)
        );
    }

    #[test]
    fn test_inherit_properties() {
        let parent = RegisterProperties {
            size: Some(16),
            access: Some(Access::ReadOnly),
            reset_value: Some(1),
            ..Default::default()
        };
        let child = RegisterProperties {
            size: Some(8),
            ..Default::default()
        };
        let merged = child.inherit(&parent);
        assert_eq!(merged.size, Some(8));
        assert_eq!(merged.access, Some(Access::ReadOnly));
        assert_eq!(merged.reset_value, Some(1));
        assert_eq!(merged.reset_mask, None);
    }

    #[test]
    fn test_dimension_indices() {
        let dim = Dimension {
            dim: 3,
            increment: 4,
            index: None,
            name: None,
        };
        assert_eq!(dim.indices(), vec!["0", "1", "2"]);
    }
}
