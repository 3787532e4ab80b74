// Licensed under the Apache-2.0 license

//! Named access to registers of a running target.
//!
//! Items are addressed with dotted paths such as `TIM1.CR1.CEN` or
//! `DMA.CH[2].CNT`, resolved against the IR, and read or written through a
//! [`MemoryAccess`] implementation supplied by the caller.

use crate::bits;
use crate::types::{Cluster, Device, Field, Peripheral, Register, Vector};
use registers_svd::model::ItemKind;
use thiserror::Error;

/// Raw memory of a target.
pub trait MemoryAccess {
    type Error;

    /// Reads `bit_width` bits at `address`.
    fn read(&mut self, address: u64, bit_width: u32) -> Result<u64, Self::Error>;

    /// Writes the low `bit_width` bits of `value` at `address`.
    fn write(&mut self, address: u64, value: u64, bit_width: u32) -> Result<(), Self::Error>;
}

/// A resolved item with its absolute address.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Item<'a> {
    Peripheral {
        peripheral: &'a Peripheral,
    },
    Cluster {
        cluster: &'a Cluster,
        address: u64,
    },
    Register {
        register: &'a Register,
        address: u64,
    },
    Field {
        register: &'a Register,
        field: &'a Field,
        address: u64,
    },
}

impl Item<'_> {
    pub fn kind(&self) -> ItemKind {
        match self {
            Item::Peripheral { .. } => ItemKind::Peripheral,
            Item::Cluster { .. } => ItemKind::Cluster,
            Item::Register { .. } => ItemKind::Register,
            Item::Field { .. } => ItemKind::Field,
        }
    }

    pub fn address(&self) -> u64 {
        match self {
            Item::Peripheral { peripheral } => peripheral.base_address,
            Item::Cluster { address, .. }
            | Item::Register { address, .. }
            | Item::Field { address, .. } => *address,
        }
    }
}

/// A path that does not name an item of the device.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum LookupError {
    #[error("invalid item path '{0}'")]
    InvalidPath(String),

    #[error("'{path}' has no item named '{name}'")]
    UnknownItem { path: String, name: String },

    #[error("'{name}' is an array and needs an index")]
    MissingIndex { name: String },

    #[error("index {index} is out of range for '{name}' with {count} elements")]
    IndexOutOfRange { name: String, index: u64, count: u64 },
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum AccessError<E> {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("a {0} cannot be read or written")]
    NotAccessible(ItemKind),

    #[error("{kind} '{name}' is not {operation}")]
    AccessDenied {
        kind: ItemKind,
        name: String,
        operation: &'static str,
    },

    #[error("memory access failed: {0:?}")]
    Memory(E),
}

/// One path segment: a name with an optional `[index]`.
fn segment(text: &str) -> Result<(&str, Option<u64>), LookupError> {
    let invalid = || LookupError::InvalidPath(text.to_string());
    match text.split_once('[') {
        None if !text.is_empty() => Ok((text, None)),
        None => Err(invalid()),
        Some((name, rest)) => {
            let index = rest
                .strip_suffix(']')
                .and_then(|index| index.parse().ok())
                .ok_or_else(invalid)?;
            if name.is_empty() {
                return Err(invalid());
            }
            Ok((name, Some(index)))
        }
    }
}

/// Address of element `index` of a node at `offset`.
fn element(
    name: &str,
    offset: u64,
    vector: Option<Vector>,
    index: Option<u64>,
) -> Result<u64, LookupError> {
    match (vector, index) {
        (None, None) => Ok(offset),
        (None, Some(_)) => Err(LookupError::InvalidPath(name.to_string())),
        (Some(_), None) => Err(LookupError::MissingIndex {
            name: name.to_string(),
        }),
        (Some(v), Some(index)) if index < v.count => {
            Ok(offset.wrapping_add(index.wrapping_mul(v.stride)))
        }
        (Some(v), Some(index)) => Err(LookupError::IndexOutOfRange {
            name: name.to_string(),
            index,
            count: v.count,
        }),
    }
}

/// Resolves a dotted item path.
pub fn find_item<'a>(device: &'a Device, path: &str) -> Result<Item<'a>, LookupError> {
    let mut segments = path.split('.');
    let (name, index) = segment(segments.next().unwrap_or(""))?;
    if index.is_some() {
        return Err(LookupError::InvalidPath(path.to_string()));
    }
    let peripheral = device
        .peripheral(name)
        .ok_or_else(|| LookupError::UnknownItem {
            path: device.name.clone(),
            name: name.to_string(),
        })?;

    let mut item = Item::Peripheral { peripheral };
    let mut scope = peripheral.name.clone();
    for text in segments {
        let (name, index) = segment(text)?;
        let unknown = || LookupError::UnknownItem {
            path: scope.clone(),
            name: name.to_string(),
        };
        let (base, registers, clusters) = match item {
            Item::Peripheral { peripheral } => (
                peripheral.base_address,
                peripheral.registers.as_slice(),
                peripheral.clusters.as_slice(),
            ),
            Item::Cluster { cluster, address } => (
                address,
                cluster.registers.as_slice(),
                cluster.clusters.as_slice(),
            ),
            Item::Register { register, address } => {
                let field = register
                    .fields
                    .iter()
                    .find(|f| f.name == name)
                    .ok_or_else(unknown)?;
                if index.is_some() {
                    return Err(LookupError::InvalidPath(path.to_string()));
                }
                item = Item::Field {
                    register,
                    field,
                    address,
                };
                scope = format!("{scope}.{text}");
                continue;
            }
            Item::Field { .. } => return Err(LookupError::InvalidPath(path.to_string())),
        };
        item = if let Some(register) = registers.iter().find(|r| r.name == name) {
            let offset = element(name, register.address_offset, register.vector, index)?;
            Item::Register {
                register,
                address: base.wrapping_add(offset),
            }
        } else if let Some(cluster) = clusters.iter().find(|c| c.name == name) {
            let offset = element(name, cluster.address_offset, cluster.vector, index)?;
            Item::Cluster {
                cluster,
                address: base.wrapping_add(offset),
            }
        } else {
            return Err(unknown());
        };
        scope = format!("{scope}.{text}");
    }
    Ok(item)
}

/// Reads a register or a field.
pub fn read_item<M: MemoryAccess>(
    memory: &mut M,
    item: &Item,
) -> Result<u64, AccessError<M::Error>> {
    match *item {
        Item::Register { register, address } => {
            check(ItemKind::Register, &register.name, register.access.is_readable(), "readable")?;
            let value = memory
                .read(address, register.size)
                .map_err(AccessError::Memory)?;
            Ok(value & bits::mask(0..register.size))
        }
        Item::Field {
            register,
            field,
            address,
        } => {
            check(ItemKind::Field, &field.name, field.access.is_readable(), "readable")?;
            let value = memory
                .read(address, register.size)
                .map_err(AccessError::Memory)?;
            Ok(bits::extract(value, field.bits.clone()))
        }
        _ => Err(AccessError::NotAccessible(item.kind())),
    }
}

/// Writes a register or a field. Field writes keep the other bits of the
/// register: they are read back first, or taken from the reset value when
/// the register cannot be read.
pub fn write_item<M: MemoryAccess>(
    memory: &mut M,
    item: &Item,
    value: u64,
) -> Result<(), AccessError<M::Error>> {
    match *item {
        Item::Register { register, address } => {
            check(ItemKind::Register, &register.name, register.access.is_writable(), "writable")?;
            memory
                .write(address, value & bits::mask(0..register.size), register.size)
                .map_err(AccessError::Memory)
        }
        Item::Field {
            register,
            field,
            address,
        } => {
            check(ItemKind::Field, &field.name, field.access.is_writable(), "writable")?;
            let current = if register.access.is_readable() {
                memory
                    .read(address, register.size)
                    .map_err(AccessError::Memory)?
            } else {
                register.reset_value
            };
            let updated = bits::insert(current, field.bits.clone(), value);
            memory
                .write(address, updated & bits::mask(0..register.size), register.size)
                .map_err(AccessError::Memory)
        }
        _ => Err(AccessError::NotAccessible(item.kind())),
    }
}

fn check<E>(
    kind: ItemKind,
    name: &str,
    allowed: bool,
    operation: &'static str,
) -> Result<(), AccessError<E>> {
    if allowed {
        Ok(())
    } else {
        Err(AccessError::AccessDenied {
            kind,
            name: name.to_string(),
            operation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use registers_svd::model::{Access, ModifiedWriteValues};
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeMemory {
        words: HashMap<u64, u64>,
        writes: Vec<(u64, u64, u32)>,
    }

    impl MemoryAccess for FakeMemory {
        type Error = ();

        fn read(&mut self, address: u64, _bit_width: u32) -> Result<u64, ()> {
            Ok(self.words.get(&address).copied().unwrap_or(0))
        }

        fn write(&mut self, address: u64, value: u64, bit_width: u32) -> Result<(), ()> {
            self.words.insert(address, value);
            self.writes.push((address, value, bit_width));
            Ok(())
        }
    }

    fn field(name: &str, bits: std::ops::Range<u32>, access: Access) -> Field {
        Field {
            name: name.to_string(),
            description: None,
            bits,
            access,
            modified_write_values: ModifiedWriteValues::Modify,
            write_constraint: None,
            read_action: None,
            enumerated_values: vec![],
        }
    }

    fn register(name: &str, offset: u64, access: Access, fields: Vec<Field>) -> Register {
        Register {
            name: name.to_string(),
            display_name: None,
            description: None,
            address_offset: offset,
            size: 16,
            access,
            protection: None,
            reset_value: 0x8000,
            reset_mask: 0xffff,
            modified_write_values: ModifiedWriteValues::Modify,
            write_constraint: None,
            read_action: None,
            vector: None,
            fields,
        }
    }

    fn device() -> Device {
        let mut ccr = register("CCR", 0x4, Access::ReadWrite, vec![]);
        ccr.vector = Some(Vector { count: 4, stride: 4 });
        Device {
            name: "DEV".to_string(),
            vendor: None,
            version: None,
            description: None,
            width: 32,
            address_unit_bits: 8,
            peripherals: vec![Peripheral {
                name: "TIM1".to_string(),
                description: None,
                group_name: None,
                base_address: 0x4001_0000,
                address_range: 0..0x100,
                interrupts: vec![],
                registers: vec![
                    register(
                        "CR1",
                        0,
                        Access::ReadWrite,
                        vec![
                            field("CEN", 0..1, Access::ReadWrite),
                            field("DIR", 4..5, Access::ReadOnly),
                        ],
                    ),
                    register(
                        "EGR",
                        0x14,
                        Access::WriteOnly,
                        vec![field("UG", 0..1, Access::WriteOnly)],
                    ),
                ],
                clusters: vec![Cluster {
                    name: "CH".to_string(),
                    description: None,
                    address_offset: 0x40,
                    vector: Some(Vector {
                        count: 2,
                        stride: 0x20,
                    }),
                    registers: vec![ccr],
                    clusters: vec![],
                }],
            }],
        }
    }

    #[test]
    fn test_find_item() {
        let device = device();
        let item = find_item(&device, "TIM1.CR1.CEN").unwrap();
        assert_eq!(item.kind(), ItemKind::Field);
        assert_eq!(item.address(), 0x4001_0000);

        let item = find_item(&device, "TIM1.CH[1].CCR[2]").unwrap();
        assert_eq!(item.kind(), ItemKind::Register);
        assert_eq!(item.address(), 0x4001_0000 + 0x40 + 0x20 + 0x4 + 8);

        assert_eq!(
            find_item(&device, "TIM1.CH").unwrap_err(),
            LookupError::MissingIndex {
                name: "CH".to_string()
            }
        );
        assert_eq!(
            find_item(&device, "TIM1.CH[2]").unwrap_err(),
            LookupError::IndexOutOfRange {
                name: "CH".to_string(),
                index: 2,
                count: 2
            }
        );
        assert_eq!(
            find_item(&device, "TIM1.CR2").unwrap_err(),
            LookupError::UnknownItem {
                path: "TIM1".to_string(),
                name: "CR2".to_string()
            }
        );
        assert!(matches!(
            find_item(&device, "TIM1.CR1.CEN.X"),
            Err(LookupError::InvalidPath(_))
        ));
        assert!(matches!(
            find_item(&device, "TIM1.CR1[x"),
            Err(LookupError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_field_read_modify_write() {
        let device = device();
        let mut memory = FakeMemory::default();
        memory.words.insert(0x4001_0000, 0x0010);
        let cen = find_item(&device, "TIM1.CR1.CEN").unwrap();
        write_item(&mut memory, &cen, 1).unwrap();
        assert_eq!(memory.words[&0x4001_0000], 0x0011);
        assert_eq!(read_item(&mut memory, &cen).unwrap(), 1);
        let dir = find_item(&device, "TIM1.CR1.DIR").unwrap();
        assert_eq!(read_item(&mut memory, &dir).unwrap(), 1);
        assert!(matches!(
            write_item(&mut memory, &dir, 0),
            Err(AccessError::AccessDenied { operation: "writable", .. })
        ));
    }

    #[test]
    fn test_write_only_register_uses_reset_value() {
        let device = device();
        let mut memory = FakeMemory::default();
        let ug = find_item(&device, "TIM1.EGR.UG").unwrap();
        write_item(&mut memory, &ug, 1).unwrap();
        assert_eq!(memory.writes, vec![(0x4001_0014, 0x8001, 16)]);
        assert!(matches!(
            read_item(&mut memory, &ug),
            Err(AccessError::AccessDenied { operation: "readable", .. })
        ));
    }

    #[test]
    fn test_register_write_is_masked() {
        let device = device();
        let mut memory = FakeMemory::default();
        let cr1 = find_item(&device, "TIM1.CR1").unwrap();
        write_item(&mut memory, &cr1, 0x1_2345).unwrap();
        assert_eq!(memory.writes, vec![(0x4001_0000, 0x2345, 16)]);
        let peripheral = find_item(&device, "TIM1").unwrap();
        assert_eq!(
            read_item(&mut memory, &peripheral),
            Err(AccessError::NotAccessible(ItemKind::Peripheral))
        );
    }

    #[test]
    fn test_lookup_error_converts() {
        fn read_path(
            memory: &mut FakeMemory,
            device: &Device,
            path: &str,
        ) -> Result<u64, AccessError<()>> {
            let item = find_item(device, path)?;
            read_item(memory, &item)
        }

        let device = device();
        let mut memory = FakeMemory::default();
        memory.words.insert(0x4001_0000, 0x0011);
        assert_eq!(read_path(&mut memory, &device, "TIM1.CR1.CEN"), Ok(1));
        let err = read_path(&mut memory, &device, "TIM1.CR9").unwrap_err();
        assert_eq!(err.to_string(), "'TIM1' has no item named 'CR9'");
        assert_eq!(
            err,
            AccessError::Lookup(LookupError::UnknownItem {
                path: "TIM1".to_string(),
                name: "CR9".to_string()
            })
        );
    }
}
