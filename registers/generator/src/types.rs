// Licensed under the Apache-2.0 license

//! The validated intermediate representation (IR).
//!
//! The IR has the same shape as the document model, but every `derivedFrom`
//! is gone, every attribute carries its effective value, names are unique
//! identifiers, and children are in canonical order:
//!
//! - peripherals, registers and clusters by name (byte order)
//! - fields by lower bit, then name
//! - enumerated cases and interrupts by value, then name

use registers_svd::model::{Access, ModifiedWriteValues, Protection, ReadAction, WriteConstraint};
use serde::Serialize;
use std::ops::Range;

//=============================================================================
// Device and peripherals
//=============================================================================

/// A fully resolved device.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Device {
    /// Sanitized device name.
    pub name: String,
    pub vendor: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    /// Bus width in bits.
    pub width: u32,
    pub address_unit_bits: u32,
    pub peripherals: Vec<Peripheral>,
}

impl Device {
    pub fn peripheral(&self, name: &str) -> Option<&Peripheral> {
        self.peripherals.iter().find(|p| p.name == name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Peripheral {
    pub name: String,
    pub description: Option<String>,
    pub group_name: Option<String>,
    pub base_address: u64,
    /// Byte range occupied by the peripheral, relative to `base_address`.
    pub address_range: Range<u64>,
    pub interrupts: Vec<Interrupt>,
    pub registers: Vec<Register>,
    pub clusters: Vec<Cluster>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Interrupt {
    pub name: String,
    pub description: Option<String>,
    pub value: i32,
}

//=============================================================================
// Clusters and registers
//=============================================================================

/// An array of identical elements laid out `stride` bytes apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Vector {
    pub count: u64,
    pub stride: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Cluster {
    pub name: String,
    pub description: Option<String>,
    /// Byte offset from the enclosing peripheral or cluster.
    pub address_offset: u64,
    pub vector: Option<Vector>,
    pub registers: Vec<Register>,
    pub clusters: Vec<Cluster>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Register {
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    /// Byte offset from the enclosing peripheral or cluster.
    pub address_offset: u64,
    /// Width in bits, `1..=64`.
    pub size: u32,
    pub access: Access,
    pub protection: Option<Protection>,
    pub reset_value: u64,
    pub reset_mask: u64,
    pub modified_write_values: ModifiedWriteValues,
    pub write_constraint: Option<WriteConstraint>,
    pub read_action: Option<ReadAction>,
    pub vector: Option<Vector>,
    pub fields: Vec<Field>,
}

impl Register {
    /// Bytes covered by one element.
    pub fn byte_size(&self) -> u64 {
        u64::from(self.size).div_ceil(8)
    }
}

//=============================================================================
// Fields
//=============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    pub description: Option<String>,
    /// Half-open bit range `[lower, upper)`.
    pub bits: Range<u32>,
    pub access: Access,
    pub modified_write_values: ModifiedWriteValues,
    pub write_constraint: Option<WriteConstraint>,
    pub read_action: Option<ReadAction>,
    pub enumerated_values: Vec<EnumCase>,
}

impl Field {
    pub fn width(&self) -> u32 {
        self.bits.end - self.bits.start
    }
}

/// One named value of a field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EnumCase {
    pub name: String,
    pub description: Option<String>,
    /// `None` for the catch-all `isDefault` case.
    pub value: Option<u64>,
    /// Bits that participate in the match; clear bits are "don't care".
    pub mask: u64,
    pub is_default: bool,
}
