// Licensed under the Apache-2.0 license

//! Conversion of a resolved document model into the IR.
//!
//! Attributes are defaulted down the chain device → peripheral → cluster →
//! register → field, arrays are expanded, names are sanitized and made
//! unique, and field layouts are checked.

use crate::bits;
use crate::error::ValidationError;
use crate::types::{Cluster, Device, EnumCase, Field, Interrupt, Peripheral, Register, Vector};
use crate::util::{sanitize_identifier, UniqueNames};
use registers_svd::model::{
    self as svd, Access, Dimension, ModifiedWriteValues, ReadAction, RegisterProperties,
    WriteConstraint,
};
use std::ops::Range;

type Result<T> = std::result::Result<T, ValidationError>;

const DEFAULT_SIZE: u64 = 32;
const DEFAULT_WIDTH: u64 = 32;
const DEFAULT_ADDRESS_UNIT_BITS: u64 = 8;

/// Text added around every register name of a peripheral.
#[derive(Clone, Copy)]
struct Affix<'a> {
    prepend: &'a str,
    append: &'a str,
}

/// Register attributes that fields fall back to.
struct FieldDefaults {
    access: Access,
    modified_write_values: ModifiedWriteValues,
    write_constraint: Option<WriteConstraint>,
    read_action: Option<ReadAction>,
}

pub(crate) fn build_device(device: &svd::Device) -> Result<Device> {
    let name = identifier("device", &device.name)?;
    let mut peripherals = Vec::new();
    for peripheral in &device.peripherals {
        peripherals.extend(build_peripheral(peripheral, &device.properties)?);
    }
    make_unique(
        &mut peripherals,
        |p| (p.name.clone(), p.base_address),
        |p| &mut p.name,
    );
    peripherals.sort_by(|a, b| a.name.cmp(&b.name));
    log::debug!(
        "Built IR for device {name} with {} peripherals",
        peripherals.len()
    );
    Ok(Device {
        name,
        vendor: device.vendor.clone(),
        version: device.version.clone(),
        description: device.description.clone(),
        width: narrow(device.width.unwrap_or(DEFAULT_WIDTH)),
        address_unit_bits: narrow(device.address_unit_bits.unwrap_or(DEFAULT_ADDRESS_UNIT_BITS)),
        peripherals,
    })
}

fn build_peripheral(
    peripheral: &svd::Peripheral,
    defaults: &RegisterProperties,
) -> Result<Vec<Peripheral>> {
    let path = peripheral.name.as_str();
    let base_address = peripheral
        .base_address
        .ok_or_else(|| ValidationError::MissingElement {
            path: path.to_string(),
            element: "baseAddress",
        })?;
    let properties = peripheral.properties.inherit(defaults);
    let affix = Affix {
        prepend: peripheral.prepend_to_name.as_deref().unwrap_or(""),
        append: peripheral.append_to_name.as_deref().unwrap_or(""),
    };
    let (registers, clusters) = build_level(&peripheral.children, path, &properties, affix)?;
    let interrupts = build_interrupts(peripheral)?;
    let address_range = match peripheral.address_blocks.as_slice() {
        [] => extent(&registers, &clusters),
        blocks => {
            let start = blocks.iter().map(|b| b.offset).min().unwrap_or(0);
            let end = blocks
                .iter()
                .map(|b| b.offset.saturating_add(b.size))
                .max()
                .unwrap_or(0);
            start..end
        }
    };

    let instances = match &peripheral.dim {
        None => vec![(peripheral.name.clone(), base_address)],
        Some(dim) => dim
            .indices()
            .iter()
            .enumerate()
            .map(|(i, index)| {
                (
                    substitute(&peripheral.name, index),
                    element_offset(base_address, i, dim.increment),
                )
            })
            .collect(),
    };
    instances
        .into_iter()
        .map(|(name, base_address)| {
            Ok(Peripheral {
                name: identifier(path, &name)?,
                description: peripheral.description.clone(),
                group_name: peripheral.group_name.clone(),
                base_address,
                address_range: address_range.clone(),
                interrupts: interrupts.clone(),
                registers: registers.clone(),
                clusters: clusters.clone(),
            })
        })
        .collect()
}

fn build_interrupts(peripheral: &svd::Peripheral) -> Result<Vec<Interrupt>> {
    let mut interrupts = peripheral
        .interrupts
        .iter()
        .map(|interrupt| {
            let value = i32::try_from(interrupt.value).map_err(|_| {
                ValidationError::InterruptOutOfRange {
                    peripheral: peripheral.name.clone(),
                    name: interrupt.name.clone(),
                    value: interrupt.value,
                }
            })?;
            Ok(Interrupt {
                name: identifier(&peripheral.name, &interrupt.name)?,
                description: interrupt.description.clone(),
                value,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    interrupts.sort_by(|a, b| (a.value, &a.name).cmp(&(b.value, &b.name)));
    interrupts.dedup();
    make_unique(&mut interrupts, |i| (i.name.clone(), i.value), |i| &mut i.name);
    interrupts.sort_by(|a, b| (a.value, &a.name).cmp(&(b.value, &b.name)));
    Ok(interrupts)
}

/// Builds the registers and clusters of one peripheral or cluster.
fn build_level(
    children: &[svd::RegisterNode],
    path: &str,
    properties: &RegisterProperties,
    affix: Affix,
) -> Result<(Vec<Register>, Vec<Cluster>)> {
    let mut registers = Vec::new();
    let mut clusters = Vec::new();
    for child in children {
        match child {
            svd::RegisterNode::Register(register) => {
                registers.extend(build_register(register, path, properties, affix)?)
            }
            svd::RegisterNode::Cluster(cluster) => {
                clusters.extend(build_cluster(cluster, path, properties, affix)?)
            }
        }
    }

    // Registers and clusters share one namespace.
    let mut order: Vec<(String, u64, bool, usize)> = registers
        .iter()
        .enumerate()
        .map(|(i, r)| (r.name.clone(), r.address_offset, false, i))
        .chain(
            clusters
                .iter()
                .enumerate()
                .map(|(i, c)| (c.name.clone(), c.address_offset, true, i)),
        )
        .collect();
    order.sort();
    let mut names = UniqueNames::new();
    for (name, _, is_cluster, i) in order {
        let unique = names.claim(&name);
        if is_cluster {
            clusters[i].name = unique;
        } else {
            registers[i].name = unique;
        }
    }
    registers.sort_by(|a, b| a.name.cmp(&b.name));
    clusters.sort_by(|a, b| a.name.cmp(&b.name));
    Ok((registers, clusters))
}

fn build_cluster(
    cluster: &svd::Cluster,
    parent: &str,
    defaults: &RegisterProperties,
    affix: Affix,
) -> Result<Vec<Cluster>> {
    let path = format!("{parent}.{}", cluster.name);
    let address_offset = cluster
        .address_offset
        .ok_or_else(|| ValidationError::MissingElement {
            path: path.clone(),
            element: "addressOffset",
        })?;
    let properties = cluster.properties.inherit(defaults);
    let (registers, clusters) = build_level(&cluster.children, &path, &properties, affix)?;
    expand(&cluster.name, address_offset, cluster.dim.as_ref())
        .into_iter()
        .map(|(name, address_offset, vector)| {
            Ok(Cluster {
                name: identifier(&path, &name)?,
                description: cluster.description.clone(),
                address_offset,
                vector,
                registers: registers.clone(),
                clusters: clusters.clone(),
            })
        })
        .collect()
}

fn build_register(
    register: &svd::Register,
    parent: &str,
    defaults: &RegisterProperties,
    affix: Affix,
) -> Result<Vec<Register>> {
    let path = format!("{parent}.{}", register.name);
    let address_offset = register
        .address_offset
        .ok_or_else(|| ValidationError::MissingElement {
            path: path.clone(),
            element: "addressOffset",
        })?;
    let properties = register.properties.inherit(defaults);
    let size = properties.size.unwrap_or(DEFAULT_SIZE);
    if !(1..=64).contains(&size) {
        return Err(ValidationError::InvalidRegisterSize { path, size });
    }
    let size = size as u32;
    let access = properties.access.unwrap_or(Access::ReadWrite);
    let modified_write_values = register
        .modified_write_values
        .unwrap_or(ModifiedWriteValues::Modify);
    let field_defaults = FieldDefaults {
        access,
        modified_write_values,
        write_constraint: register.write_constraint.clone(),
        read_action: register.read_action,
    };
    let fields = build_fields(register, &path, size, &field_defaults)?;

    expand(&register.name, address_offset, register.dim.as_ref())
        .into_iter()
        .map(|(name, address_offset, vector)| {
            let name = format!("{}{name}{}", affix.prepend, affix.append);
            Ok(Register {
                name: identifier(&path, &name)?,
                display_name: register.display_name.clone(),
                description: register.description.clone(),
                address_offset,
                size,
                access,
                protection: properties.protection,
                reset_value: properties.reset_value.unwrap_or(0),
                reset_mask: properties.reset_mask.unwrap_or(bits::mask(0..size)),
                modified_write_values,
                write_constraint: register.write_constraint.clone(),
                read_action: register.read_action,
                vector,
                fields: fields.clone(),
            })
        })
        .collect()
}

fn build_fields(
    register: &svd::Register,
    path: &str,
    size: u32,
    defaults: &FieldDefaults,
) -> Result<Vec<Field>> {
    let mut fields = Vec::new();
    for field in &register.fields {
        let field_path = format!("{path}.{}", field.name);
        let range = field
            .bit_range
            .ok_or_else(|| ValidationError::MissingElement {
                path: field_path.clone(),
                element: "bitRange",
            })?;
        let width = range.width();
        let enumerated_values = build_enum_cases(field, &field_path, width.min(64))?;

        let instances = match &field.dim {
            None => vec![(field.name.clone(), range.lsb)],
            Some(dim) => dim
                .indices()
                .iter()
                .enumerate()
                .map(|(i, index)| {
                    (
                        substitute(&field.name, index),
                        element_offset(range.lsb, i, dim.increment),
                    )
                })
                .collect(),
        };
        for (name, lower) in instances {
            let upper = lower.saturating_add(width);
            if upper > u64::from(size) {
                return Err(ValidationError::FieldOutOfBounds {
                    register: path.to_string(),
                    field: name,
                    lower,
                    upper,
                    size,
                });
            }
            fields.push(Field {
                name: identifier(&field_path, &name)?,
                description: field.description.clone(),
                bits: lower as u32..upper as u32,
                access: field.access.unwrap_or(defaults.access),
                modified_write_values: field
                    .modified_write_values
                    .unwrap_or(defaults.modified_write_values),
                write_constraint: field
                    .write_constraint
                    .clone()
                    .or_else(|| defaults.write_constraint.clone()),
                read_action: field.read_action.or(defaults.read_action),
                enumerated_values: enumerated_values.clone(),
            });
        }
    }

    make_unique(&mut fields, |f| (f.name.clone(), f.bits.start), |f| &mut f.name);
    fields.sort_by(|a, b| (a.bits.start, &a.name).cmp(&(b.bits.start, &b.name)));
    check_overlap(path, &fields)?;
    Ok(fields)
}

/// Fields must be sorted by lower bit.
fn check_overlap(register: &str, fields: &[Field]) -> Result<()> {
    let mut widest: Option<&Field> = None;
    for field in fields {
        if let Some(previous) = widest {
            if field.bits.start < previous.bits.end {
                return Err(ValidationError::FieldOverlap {
                    register: register.to_string(),
                    first: previous.name.clone(),
                    second: field.name.clone(),
                    lower: field.bits.start,
                    upper: field.bits.end.min(previous.bits.end),
                });
            }
        }
        match widest {
            Some(w) if w.bits.end >= field.bits.end => {}
            _ => widest = Some(field),
        }
    }
    Ok(())
}

fn build_enum_cases(field: &svd::Field, path: &str, width: u64) -> Result<Vec<EnumCase>> {
    let field_mask = bits::mask(0..width as u32);
    let mut cases = Vec::new();
    for set in &field.enumerated_values {
        for case in &set.values {
            let (value, mask) = match case.value {
                Some(literal) => {
                    if literal.value & !field_mask != 0 {
                        return Err(ValidationError::EnumValueOutOfRange {
                            field: path.to_string(),
                            case: case.name.clone(),
                            value: literal.value,
                            width: width as u32,
                        });
                    }
                    (Some(literal.value), literal.mask & field_mask)
                }
                None => (None, 0),
            };
            cases.push(EnumCase {
                name: identifier(path, &case.name)?,
                description: case.description.clone(),
                value,
                mask,
                is_default: case.is_default,
            });
        }
    }
    // Read and write sets often repeat the same cases.
    cases.sort_by(|a, b| (a.is_default, a.value, &a.name).cmp(&(b.is_default, b.value, &b.name)));
    cases.dedup();
    make_unique(&mut cases, |c| (c.name.clone(), c.value), |c| &mut c.name);
    cases.sort_by(|a, b| (a.is_default, a.value, &a.name).cmp(&(b.is_default, b.value, &b.name)));
    Ok(cases)
}

//=============================================================================
// Helpers
//=============================================================================

fn identifier(path: &str, name: &str) -> Result<String> {
    sanitize_identifier(name).ok_or_else(|| ValidationError::UnrepresentableName {
        path: path.to_string(),
        name: name.to_string(),
    })
}

/// Renames colliding items. Items are visited in `key` order, so the first
/// one in that order keeps its name.
fn make_unique<T, K: Ord>(
    items: &mut [T],
    key: impl Fn(&T) -> K,
    name: impl Fn(&mut T) -> &mut String,
) {
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by_key(|&i| key(&items[i]));
    let mut names = UniqueNames::new();
    for i in order {
        let slot = name(&mut items[i]);
        let unique = names.claim(slot);
        *slot = unique;
    }
}

/// Name of array element `index` for nodes that always expand.
fn substitute(name: &str, index: &str) -> String {
    if name.contains("[%s]") {
        name.replace("[%s]", index)
    } else if name.contains("%s") {
        name.replace("%s", index)
    } else {
        format!("{name}{index}")
    }
}

fn element_offset(base: u64, index: usize, increment: u64) -> u64 {
    base.saturating_add((index as u64).saturating_mul(increment))
}

/// Expands a register or cluster array. A bare `%s` gives one node per
/// element; `[%s]` or no placeholder keeps a single node with a [`Vector`].
fn expand(name: &str, offset: u64, dim: Option<&Dimension>) -> Vec<(String, u64, Option<Vector>)> {
    match dim {
        None => vec![(name.to_string(), offset, None)],
        Some(dim) if name.contains("%s") && !name.contains("[%s]") => dim
            .indices()
            .iter()
            .enumerate()
            .map(|(i, index)| {
                (
                    name.replace("%s", index),
                    element_offset(offset, i, dim.increment),
                    None,
                )
            })
            .collect(),
        Some(dim) => vec![(
            name.replace("[%s]", "").replace("%s", ""),
            offset,
            Some(Vector {
                count: dim.dim,
                stride: dim.increment,
            }),
        )],
    }
}

/// Byte span of a register element or cluster, relative to its parent.
pub(crate) fn register_span(register: &Register) -> Range<u64> {
    span(register.address_offset, register.byte_size(), register.vector)
}

pub(crate) fn cluster_span(cluster: &Cluster) -> Range<u64> {
    let inner = extent(&cluster.registers, &cluster.clusters);
    span(cluster.address_offset, inner.end, cluster.vector)
}

fn span(offset: u64, element_size: u64, vector: Option<Vector>) -> Range<u64> {
    let last = match vector {
        Some(v) => element_offset(offset, v.count.saturating_sub(1) as usize, v.stride),
        None => offset,
    };
    offset..last.saturating_add(element_size)
}

/// Smallest range covering every register and cluster.
pub(crate) fn extent(registers: &[Register], clusters: &[Cluster]) -> Range<u64> {
    registers
        .iter()
        .map(register_span)
        .chain(clusters.iter().map(cluster_span))
        .reduce(|a, b| a.start.min(b.start)..a.end.max(b.end))
        .unwrap_or(0..0)
}

fn narrow(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use registers_svd::model::BitRange;

    fn field(name: &str, lsb: u64, msb: u64) -> svd::Field {
        svd::Field {
            name: name.to_string(),
            bit_range: Some(BitRange { lsb, msb }),
            ..Default::default()
        }
    }

    fn register(name: &str, offset: u64, fields: Vec<svd::Field>) -> svd::Register {
        svd::Register {
            name: name.to_string(),
            address_offset: Some(offset),
            fields,
            ..Default::default()
        }
    }

    fn device(children: Vec<svd::RegisterNode>) -> svd::Device {
        svd::Device {
            name: "DEV".to_string(),
            peripherals: vec![svd::Peripheral {
                name: "P".to_string(),
                base_address: Some(0x4000_0000),
                children,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let ir = build_device(&device(vec![svd::RegisterNode::Register(register(
            "CR",
            0,
            vec![field("EN", 0, 0)],
        ))]))
        .unwrap();
        let register = &ir.peripherals[0].registers[0];
        assert_eq!(register.size, 32);
        assert_eq!(register.access, Access::ReadWrite);
        assert_eq!(register.reset_value, 0);
        assert_eq!(register.reset_mask, 0xffff_ffff);
        assert_eq!(register.fields[0].access, Access::ReadWrite);
        assert_eq!(ir.width, 32);
        assert_eq!(ir.address_unit_bits, 8);
    }

    #[test]
    fn test_property_chain() {
        let mut doc = device(vec![svd::RegisterNode::Cluster(svd::Cluster {
            name: "CH".to_string(),
            address_offset: Some(0x10),
            properties: RegisterProperties {
                access: Some(Access::ReadOnly),
                ..Default::default()
            },
            children: vec![svd::RegisterNode::Register(register("DATA", 0, vec![]))],
            ..Default::default()
        })]);
        doc.properties.size = Some(16);
        doc.properties.reset_value = Some(0xff);
        let ir = build_device(&doc).unwrap();
        let data = &ir.peripherals[0].clusters[0].registers[0];
        assert_eq!(data.size, 16);
        assert_eq!(data.access, Access::ReadOnly);
        assert_eq!(data.reset_value, 0xff);
        assert_eq!(data.reset_mask, 0xffff);
    }

    #[test]
    fn test_fields_sorted_and_adjacent_ok() {
        let ir = build_device(&device(vec![svd::RegisterNode::Register(register(
            "CR",
            0,
            vec![field("HIGH", 4, 7), field("LOW", 0, 3)],
        ))]))
        .unwrap();
        let fields = &ir.peripherals[0].registers[0].fields;
        assert_eq!(fields[0].name, "LOW");
        assert_eq!(fields[0].bits, 0..4);
        assert_eq!(fields[1].bits, 4..8);
    }

    #[test]
    fn test_field_overlap() {
        let err = build_device(&device(vec![svd::RegisterNode::Register(register(
            "CR",
            0,
            vec![field("A", 0, 3), field("B", 2, 5)],
        ))]))
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::FieldOverlap {
                register: "P.CR".to_string(),
                first: "A".to_string(),
                second: "B".to_string(),
                lower: 2,
                upper: 4,
            }
        );
    }

    #[test]
    fn test_field_overlap_behind_wide_field() {
        let err = build_device(&device(vec![svd::RegisterNode::Register(register(
            "CR",
            0,
            vec![field("WIDE", 0, 15), field("A", 1, 1), field("B", 8, 8)],
        ))]))
        .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::FieldOverlap { ref first, ref second, .. }
                if first == "WIDE" && second == "A"
        ));
    }

    #[test]
    fn test_field_out_of_bounds() {
        let mut reg = register("CR", 0, vec![field("F", 6, 9)]);
        reg.properties.size = Some(8);
        let err = build_device(&device(vec![svd::RegisterNode::Register(reg)])).unwrap_err();
        assert_eq!(
            err,
            ValidationError::FieldOutOfBounds {
                register: "P.CR".to_string(),
                field: "F".to_string(),
                lower: 6,
                upper: 10,
                size: 8,
            }
        );
    }

    #[test]
    fn test_register_size_range() {
        let mut reg = register("CR", 0, vec![]);
        reg.properties.size = Some(65);
        let err = build_device(&device(vec![svd::RegisterNode::Register(reg)])).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidRegisterSize { size: 65, .. }));
    }

    #[test]
    fn test_name_collisions() {
        let ir = build_device(&device(vec![
            svd::RegisterNode::Register(register("C-R", 8, vec![])),
            svd::RegisterNode::Register(register("C_R", 4, vec![])),
            svd::RegisterNode::Register(register("C R", 0, vec![])),
        ]))
        .unwrap();
        let names: Vec<_> = ir.peripherals[0]
            .registers
            .iter()
            .map(|r| (r.name.as_str(), r.address_offset))
            .collect();
        assert_eq!(names, vec![("C_R", 0), ("C_R_1", 4), ("C_R_2", 8)]);
    }

    #[test]
    fn test_unrepresentable_name() {
        let err = build_device(&device(vec![svd::RegisterNode::Register(register(
            "%%",
            0,
            vec![],
        ))]))
        .unwrap_err();
        assert!(matches!(err, ValidationError::UnrepresentableName { .. }));
    }

    #[test]
    fn test_register_arrays() {
        let dim = Dimension {
            dim: 2,
            increment: 4,
            index: Some(vec!["A".to_string(), "B".to_string()]),
            name: None,
        };
        let mut expanded = register("CCR%s", 0x10, vec![]);
        expanded.dim = Some(dim.clone());
        let mut vector = register("DATA[%s]", 0x20, vec![]);
        vector.dim = Some(dim);
        let ir = build_device(&device(vec![
            svd::RegisterNode::Register(expanded),
            svd::RegisterNode::Register(vector),
        ]))
        .unwrap();
        let registers = &ir.peripherals[0].registers;
        assert_eq!(registers.len(), 3);
        assert_eq!(registers[0].name, "CCRA");
        assert_eq!(registers[1].name, "CCRB");
        assert_eq!(registers[1].address_offset, 0x14);
        assert_eq!(registers[2].name, "DATA");
        assert_eq!(registers[2].vector, Some(Vector { count: 2, stride: 4 }));
        assert_eq!(ir.peripherals[0].address_range, 0x10..0x28);
    }

    #[test]
    fn test_enum_cases() {
        let mut f = field("MODE", 0, 1);
        f.enumerated_values = vec![svd::EnumeratedValues {
            values: vec![
                svd::EnumeratedValue {
                    name: "Fast".to_string(),
                    description: None,
                    value: Some(registers_svd::value::EnumValueLiteral {
                        value: 2,
                        mask: u64::MAX,
                    }),
                    is_default: false,
                },
                svd::EnumeratedValue {
                    name: "Slow".to_string(),
                    description: None,
                    value: Some(registers_svd::value::EnumValueLiteral {
                        value: 1,
                        mask: u64::MAX,
                    }),
                    is_default: false,
                },
                svd::EnumeratedValue {
                    name: "Other".to_string(),
                    description: None,
                    value: None,
                    is_default: true,
                },
            ],
            ..Default::default()
        }];
        let ir = build_device(&device(vec![svd::RegisterNode::Register(register(
            "CR",
            0,
            vec![f.clone()],
        ))]))
        .unwrap();
        let cases = &ir.peripherals[0].registers[0].fields[0].enumerated_values;
        let names: Vec<_> = cases.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Slow", "Fast", "Other"]);
        assert_eq!(cases[0].mask, 0b11);

        f.enumerated_values[0].values[0].value = Some(registers_svd::value::EnumValueLiteral {
            value: 4,
            mask: u64::MAX,
        });
        let err = build_device(&device(vec![svd::RegisterNode::Register(register(
            "CR",
            0,
            vec![f],
        ))]))
        .unwrap_err();
        assert!(matches!(err, ValidationError::EnumValueOutOfRange { value: 4, width: 2, .. }));
    }

    #[test]
    fn test_peripheral_dim_and_interrupts() {
        let doc = svd::Device {
            name: "DEV".to_string(),
            peripherals: vec![svd::Peripheral {
                name: "UART%s".to_string(),
                base_address: Some(0x1000),
                dim: Some(Dimension {
                    dim: 2,
                    increment: 0x100,
                    index: None,
                    name: None,
                }),
                interrupts: vec![
                    svd::Interrupt {
                        name: "UART_TX".to_string(),
                        description: None,
                        value: 5,
                    },
                    svd::Interrupt {
                        name: "UART_RX".to_string(),
                        description: None,
                        value: 4,
                    },
                ],
                ..Default::default()
            }],
            ..Default::default()
        };
        let ir = build_device(&doc).unwrap();
        assert_eq!(ir.peripherals[0].name, "UART0");
        assert_eq!(ir.peripherals[1].name, "UART1");
        assert_eq!(ir.peripherals[1].base_address, 0x1100);
        assert_eq!(ir.peripherals[0].interrupts[0].name, "UART_RX");
    }
}
