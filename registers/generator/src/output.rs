// Licensed under the Apache-2.0 license

//! Rendering of the IR as tock-registers source.
//!
//! Every exported peripheral becomes a module:
//!
//! ```text
//! pub mod tim1 {
//!     //! Advanced timer
//!     pub const TIM1_ADDR: usize = 0x4001_0000;
//!     pub const TIM1_UP_IRQ: i32 = 25;
//!     pub mod bits {
//!         use tock_registers::register_bitfields;
//!         register_bitfields! {
//!             u16,
//!             pub Cr1 [ Cen OFFSET(0) NUMBITS(1) [], ... ],
//!         }
//!     }
//!     pub mod regs {
//!         use tock_registers::register_structs;
//!         register_structs! {
//!             pub Tim1 {
//!                 (0x0 => pub cr1: tock_registers::registers::ReadWrite<u16, super::bits::Cr1::Register>),
//!                 (0x2 => _reserved0),
//!                 (0x4 => @END),
//!             }
//!         }
//!     }
//! }
//! ```
//!
//! followed by the peripheral instances, either as free constants or as
//! members of a device type.
//!
//! Output only depends on the IR and the [`ExportConfig`], never on hash
//! order or the environment.

use crate::config::{ExportConfig, Layout};
use crate::error::ExportError;
use crate::types::{Cluster, Device, Field, Peripheral, Register};
use crate::util::{camel_case, constant_case, hex_const, sanitize_identifier, snake_case, UniqueNames};
use registers_svd::model::Access;
use std::collections::{BTreeMap, HashSet};

/// One generated source file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OutputUnit {
    /// File name, e.g. `tim1.rs`.
    pub name: String,
    pub contents: String,
}

/// Renders `device` according to `config`.
///
/// Fails if the allow-list names a peripheral that is not in the IR.
pub fn export(device: &Device, config: &ExportConfig) -> Result<Vec<OutputUnit>, ExportError> {
    let peripherals = select(device, config)?;
    let layouts: Vec<PeripheralLayout> = peripherals
        .iter()
        .map(|p| PeripheralLayout::new(p))
        .collect();
    let device_name = config
        .override_device_name
        .as_deref()
        .and_then(sanitize_identifier)
        .unwrap_or_else(|| device.name.clone());
    let vis = config.visibility();

    let units = match config.layout {
        Layout::Combined => {
            let mut w = OutputWriter::new(config);
            header(&mut w, device);
            for layout in &layouts {
                w.line("");
                w.open(format!("{vis}mod {} {{", snake_case(&layout.peripheral.name)));
                peripheral_items(&mut w, layout);
                w.close("}");
            }
            instances(&mut w, &layouts, &device_name, config);
            vec![OutputUnit {
                name: format!("{}.rs", snake_case(&device_name)),
                contents: w.finish(),
            }]
        }
        Layout::PerPeripheral => {
            let mut root = OutputWriter::new(config);
            header(&mut root, device);
            root.line("");
            for layout in &layouts {
                root.line(format!("{vis}mod {};", snake_case(&layout.peripheral.name)));
            }
            instances(&mut root, &layouts, &device_name, config);
            let mut units = vec![OutputUnit {
                name: "mod.rs".to_string(),
                contents: root.finish(),
            }];
            for layout in &layouts {
                let mut w = OutputWriter::new(config);
                header(&mut w, device);
                w.line("");
                peripheral_items(&mut w, layout);
                units.push(OutputUnit {
                    name: format!("{}.rs", snake_case(&layout.peripheral.name)),
                    contents: w.finish(),
                });
            }
            units
        }
    };
    log::debug!(
        "Exported {} peripherals of {} into {} units",
        layouts.len(),
        device.name,
        units.len()
    );
    Ok(units)
}

/// The exported peripherals, in IR order.
fn select<'a>(device: &'a Device, config: &ExportConfig) -> Result<Vec<&'a Peripheral>, ExportError> {
    for name in &config.selected_peripherals {
        if device.peripheral(name).is_none() {
            return Err(ExportError::UnknownPeripheral {
                name: name.clone(),
                valid: device.peripherals.iter().map(|p| p.name.clone()).collect(),
            });
        }
    }
    let selected: HashSet<&str> = config
        .selected_peripherals
        .iter()
        .map(String::as_str)
        .collect();
    Ok(device
        .peripherals
        .iter()
        .filter(|p| selected.is_empty() || selected.contains(p.name.as_str()))
        .collect())
}

fn header(w: &mut OutputWriter, device: &Device) {
    w.line("// Generated by xtask svd-gen");
    w.line("//");
    w.line(format!("// Device: {}", device.name));
    if let Some(vendor) = &device.vendor {
        w.line(format!("// Vendor: {vendor}"));
    }
    if let Some(version) = &device.version {
        w.line(format!("// Version: {version}"));
    }
}

//=============================================================================
// Writer
//=============================================================================

/// Line-oriented text sink that tracks indentation.
struct OutputWriter {
    text: String,
    unit: String,
    depth: usize,
}

impl OutputWriter {
    fn new(config: &ExportConfig) -> Self {
        Self {
            text: String::new(),
            unit: config.indentation.unit(),
            depth: 0,
        }
    }

    fn line(&mut self, line: impl AsRef<str>) {
        let line = line.as_ref();
        if !line.is_empty() {
            for _ in 0..self.depth {
                self.text.push_str(&self.unit);
            }
            self.text.push_str(line);
        }
        self.text.push('\n');
    }

    fn open(&mut self, line: impl AsRef<str>) {
        self.line(line);
        self.depth += 1;
    }

    fn close(&mut self, line: impl AsRef<str>) {
        self.depth = self.depth.saturating_sub(1);
        self.line(line);
    }

    fn doc(&mut self, marker: &str, text: Option<&str>) {
        for line in text.into_iter().flat_map(str::lines) {
            self.line(format!("{marker} {}", line.trim()));
        }
    }

    fn finish(self) -> String {
        self.text
    }
}

//=============================================================================
// Layout
//=============================================================================

/// Integer type backing a register.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
struct Storage(u32);

impl Storage {
    fn for_size(size: u32) -> Self {
        Storage(match size {
            0..=8 => 8,
            9..=16 => 16,
            17..=32 => 32,
            _ => 64,
        })
    }

    fn bytes(self) -> u64 {
        u64::from(self.0 / 8)
    }
}

#[derive(Clone)]
enum SlotKind {
    Register {
        readable: bool,
        writable: bool,
        storage: Storage,
        bitfield: Option<String>,
        count: Option<u64>,
    },
    Block {
        struct_name: String,
        count: Option<u64>,
    },
}

/// A member of a `register_structs!` struct.
#[derive(Clone)]
struct Slot {
    offset: u64,
    size: u64,
    name: String,
    kind: SlotKind,
}

impl Slot {
    fn type_name(&self) -> String {
        let (element, count) = match &self.kind {
            SlotKind::Register {
                readable,
                writable,
                storage,
                bitfield,
                count,
            } => {
                let register = match (readable, writable) {
                    (true, true) => "ReadWrite",
                    (true, false) => "ReadOnly",
                    _ => "WriteOnly",
                };
                let element = match bitfield {
                    Some(bitfield) => format!(
                        "tock_registers::registers::{register}<u{}, super::bits::{bitfield}::Register>",
                        storage.0
                    ),
                    None => format!("tock_registers::registers::{register}<u{}>", storage.0),
                };
                (element, count)
            }
            SlotKind::Block { struct_name, count } => (struct_name.clone(), count),
        };
        match count {
            Some(count) => format!("[{element}; {count}]"),
            None => element,
        }
    }

    /// Folds a register at the same offset into this one.
    fn absorb(&mut self, other: &Slot) -> bool {
        match (&mut self.kind, &other.kind) {
            (
                SlotKind::Register {
                    readable,
                    writable,
                    storage,
                    count: None,
                    ..
                },
                SlotKind::Register {
                    readable: other_readable,
                    writable: other_writable,
                    storage: other_storage,
                    count: None,
                    ..
                },
            ) if *storage == *other_storage => {
                *readable |= *other_readable;
                *writable |= *other_writable;
                true
            }
            _ => false,
        }
    }
}

struct Block {
    name: String,
    size: u64,
    slots: Vec<Slot>,
}

/// Type names and struct layouts of one peripheral.
struct PeripheralLayout<'a> {
    peripheral: &'a Peripheral,
    /// Registers with a bitfield type, grouped by storage.
    bitfields: BTreeMap<Storage, Vec<(String, &'a Register)>>,
    /// The peripheral's own struct comes first.
    blocks: Vec<Block>,
    type_names: UniqueNames,
    struct_names: UniqueNames,
}

impl<'a> PeripheralLayout<'a> {
    fn new(peripheral: &'a Peripheral) -> Self {
        let mut layout = Self {
            peripheral,
            bitfields: BTreeMap::new(),
            blocks: Vec::new(),
            type_names: UniqueNames::new(),
            struct_names: UniqueNames::new(),
        };
        layout.collect_block(
            &peripheral.name,
            "",
            &peripheral.registers,
            &peripheral.clusters,
            None,
        );
        layout
    }

    /// The struct holding the peripheral's registers, if it has any.
    fn struct_name(&self) -> Option<&str> {
        self.blocks.first().map(|b| b.name.as_str())
    }

    /// Adds a struct for one level and returns its name and size, or `None`
    /// if the level has no registers.
    fn collect_block(
        &mut self,
        struct_path: &str,
        type_prefix: &str,
        registers: &'a [Register],
        clusters: &'a [Cluster],
        stride: Option<u64>,
    ) -> Option<(String, u64)> {
        let index = self.blocks.len();
        let name = camel_case(&self.struct_names.claim(struct_path));
        self.blocks.push(Block {
            name: name.clone(),
            size: 0,
            slots: Vec::new(),
        });

        let mut slots = Vec::new();
        let mut members = UniqueNames::new();
        for register in registers {
            self.register_slots(register, type_prefix, &mut members, &mut slots);
        }
        for cluster in clusters {
            self.cluster_slots(cluster, struct_path, type_prefix, &mut members, &mut slots);
        }
        let end = slots
            .iter()
            .map(|s| s.offset.saturating_add(s.size))
            .max()
            .unwrap_or(0);
        if end == 0 {
            self.blocks.truncate(index);
            return None;
        }
        let size = match stride {
            Some(stride) if stride >= end => stride,
            _ => end,
        };
        self.blocks[index].size = size;
        self.blocks[index].slots = slots;
        Some((name, size))
    }

    fn register_slots(
        &mut self,
        register: &'a Register,
        type_prefix: &str,
        members: &mut UniqueNames,
        slots: &mut Vec<Slot>,
    ) {
        let storage = Storage::for_size(register.size);
        let bitfield = has_bitfield(register).then(|| {
            let name = camel_case(&self.type_names.claim(&format!("{type_prefix}{}", register.name)));
            self.bitfields
                .entry(storage)
                .or_default()
                .push((name.clone(), register));
            name
        });
        let kind = |count| SlotKind::Register {
            readable: register.access.is_readable(),
            writable: register.access.is_writable(),
            storage,
            bitfield: bitfield.clone(),
            count,
        };
        match register.vector {
            None => slots.push(Slot {
                offset: register.address_offset,
                size: storage.bytes(),
                name: members.claim(&snake_case(&register.name)),
                kind: kind(None),
            }),
            Some(v) if v.count == 0 => {}
            Some(v) if v.stride == storage.bytes() => slots.push(Slot {
                offset: register.address_offset,
                size: storage.bytes().saturating_mul(v.count),
                name: members.claim(&snake_case(&register.name)),
                kind: kind(Some(v.count)),
            }),
            Some(v) => {
                for i in 0..v.count {
                    slots.push(Slot {
                        offset: register.address_offset.saturating_add(i.saturating_mul(v.stride)),
                        size: storage.bytes(),
                        name: members.claim(&snake_case(&format!("{}_{i}", register.name))),
                        kind: kind(None),
                    });
                }
            }
        }
    }

    fn cluster_slots(
        &mut self,
        cluster: &'a Cluster,
        parent_path: &str,
        type_prefix: &str,
        members: &mut UniqueNames,
        slots: &mut Vec<Slot>,
    ) {
        let stride = cluster.vector.map(|v| v.stride);
        let Some((struct_name, size)) = self.collect_block(
            &format!("{parent_path}_{}", cluster.name),
            &format!("{type_prefix}{}_", cluster.name),
            &cluster.registers,
            &cluster.clusters,
            stride,
        ) else {
            log::debug!("Skipping empty cluster {parent_path}.{}", cluster.name);
            return;
        };
        match cluster.vector {
            None => slots.push(Slot {
                offset: cluster.address_offset,
                size,
                name: members.claim(&snake_case(&cluster.name)),
                kind: SlotKind::Block {
                    struct_name,
                    count: None,
                },
            }),
            Some(v) if v.count == 0 => {}
            Some(v) if v.stride == size => slots.push(Slot {
                offset: cluster.address_offset,
                size: size.saturating_mul(v.count),
                name: members.claim(&snake_case(&cluster.name)),
                kind: SlotKind::Block {
                    struct_name,
                    count: Some(v.count),
                },
            }),
            Some(v) => {
                for i in 0..v.count {
                    slots.push(Slot {
                        offset: cluster.address_offset.saturating_add(i.saturating_mul(v.stride)),
                        size,
                        name: members.claim(&snake_case(&format!("{}_{i}", cluster.name))),
                        kind: SlotKind::Block {
                            struct_name: struct_name.clone(),
                            count: None,
                        },
                    });
                }
            }
        }
    }
}

/// A single field covering the whole register adds nothing over the plain
/// integer.
fn has_bitfield(register: &Register) -> bool {
    match register.fields.as_slice() {
        [] => false,
        [field] => field.bits != (0..register.size) || !field.enumerated_values.is_empty(),
        _ => true,
    }
}

//=============================================================================
// Rendering
//=============================================================================

fn peripheral_items(w: &mut OutputWriter, layout: &PeripheralLayout) {
    let peripheral = layout.peripheral;
    w.doc("//!", peripheral.description.as_deref());
    w.line(format!(
        "pub const {}_ADDR: usize = {};",
        constant_case(&peripheral.name),
        hex_const(peripheral.base_address)
    ));
    for interrupt in &peripheral.interrupts {
        w.doc("///", interrupt.description.as_deref());
        w.line(format!(
            "pub const {}_IRQ: i32 = {};",
            constant_case(&interrupt.name),
            interrupt.value
        ));
    }

    if !layout.bitfields.is_empty() {
        w.open("pub mod bits {");
        w.line("//! Types that represent individual registers (bitfields).");
        w.line("use tock_registers::register_bitfields;");
        for (storage, types) in &layout.bitfields {
            w.open("register_bitfields! {");
            w.line(format!("u{},", storage.0));
            for (name, register) in types {
                bitfield(w, name, register);
            }
            w.close("}");
        }
        w.close("}");
    }

    if !layout.blocks.is_empty() {
        w.open("pub mod regs {");
        w.line("//! Types that represent registers.");
        w.line("use tock_registers::register_structs;");
        w.open("register_structs! {");
        for (i, block) in layout.blocks.iter().enumerate() {
            register_struct(w, block, i + 1 == layout.blocks.len());
        }
        w.close("}");
        w.close("}");
    }
}

fn bitfield(w: &mut OutputWriter, name: &str, register: &Register) {
    w.doc(
        "///",
        register
            .description
            .as_deref()
            .or(register.display_name.as_deref()),
    );
    w.open(format!("pub {name} ["));
    for field in &register.fields {
        bitfield_field(w, field);
    }
    w.close("],");
}

fn bitfield_field(w: &mut OutputWriter, field: &Field) {
    w.doc("///", field.description.as_deref());
    w.line(format!(
        "/// Bits [{}:{}], {}",
        field.bits.end - 1,
        field.bits.start,
        access_label(field.access)
    ));
    let head = format!(
        "{} OFFSET({}) NUMBITS({})",
        camel_case(&field.name),
        field.bits.start,
        field.width()
    );

    // Only exact values can become variants, and each value only once.
    let field_mask = crate::bits::mask(0..field.width());
    let mut seen = HashSet::new();
    let variants: Vec<_> = field
        .enumerated_values
        .iter()
        .filter_map(|case| Some((case, case.value?)))
        .filter(|(case, value)| case.mask == field_mask && seen.insert(*value))
        .collect();
    if variants.is_empty() {
        w.line(format!("{head} [],"));
        return;
    }
    w.open(format!("{head} ["));
    for (case, value) in variants {
        w.doc("///", case.description.as_deref());
        w.line(format!("{} = {},", camel_case(&case.name), hex_const(value)));
    }
    w.close("],");
}

fn register_struct(w: &mut OutputWriter, block: &Block, is_last: bool) {
    let mut slots: Vec<&Slot> = block.slots.iter().collect();
    slots.sort_by(|a, b| (a.offset, &a.name).cmp(&(b.offset, &b.name)));

    // Registers sharing an offset collapse into one member.
    let mut merged: Vec<Slot> = Vec::new();
    for slot in slots {
        if let Some(last) = merged.last_mut() {
            if last.offset == slot.offset && last.absorb(slot) {
                continue;
            }
        }
        merged.push(slot.clone());
    }

    w.open(format!("pub {} {{", block.name));
    let mut next = 0;
    let mut reserved = 0;
    for slot in &merged {
        if slot.offset < next {
            log::debug!(
                "{}: {} at {:#x} overlaps the previous member",
                block.name,
                slot.name,
                slot.offset
            );
            w.line(format!(
                "// {} at 0x{:x} overlaps the previous member",
                slot.name, slot.offset
            ));
            continue;
        }
        if slot.offset > next {
            w.line(format!("(0x{next:x} => _reserved{reserved}),"));
            reserved += 1;
        }
        w.line(format!(
            "(0x{:x} => pub {}: {}),",
            slot.offset,
            slot.name,
            slot.type_name()
        ));
        next = slot.offset.saturating_add(slot.size);
    }
    if block.size > next {
        w.line(format!("(0x{next:x} => _reserved{reserved}),"));
        next = block.size;
    }
    w.line(format!("(0x{next:x} => @END),"));
    w.close(if is_last { "}" } else { "}," });
}

fn access_label(access: Access) -> &'static str {
    match access {
        Access::ReadOnly => "read-only",
        Access::WriteOnly => "write-only",
        Access::ReadWrite => "read-write",
        Access::WriteOnce => "write-once",
        Access::ReadWriteOnce => "read-write-once",
    }
}

/// Pointers to the register blocks of the exported peripherals.
fn instances(w: &mut OutputWriter, layouts: &[PeripheralLayout], device_name: &str, config: &ExportConfig) {
    let vis = config.visibility();
    let targets: Vec<(String, String, String)> = layouts
        .iter()
        .filter_map(|layout| {
            let struct_name = layout.struct_name()?;
            let module = snake_case(&layout.peripheral.name);
            let pointer = format!("*const {module}::regs::{struct_name}");
            let value = format!(
                "{module}::{}_ADDR as {pointer}",
                constant_case(&layout.peripheral.name)
            );
            Some((layout.peripheral.name.clone(), pointer, value))
        })
        .collect();
    if targets.is_empty() {
        return;
    }
    w.line("");

    if !config.namespace_under_device {
        if config.instance_member_peripherals {
            log::debug!("instance-member-peripherals has no effect without namespace-under-device");
        }
        for (name, pointer, value) in &targets {
            w.line(format!("{vis}const {}: {pointer} = {value};", constant_case(name)));
        }
        return;
    }

    let device_type = camel_case(device_name);
    if config.instance_member_peripherals {
        w.line(format!("/// Peripheral instances of {device_name}."));
        w.open(format!("{vis}struct {device_type} {{"));
        for (name, pointer, _) in &targets {
            w.line(format!("{vis}{}: {pointer},", snake_case(name)));
        }
        w.close("}");
        w.line("");
        w.open(format!("impl {device_type} {{"));
        w.open("pub const fn new() -> Self {");
        w.open("Self {");
        for (name, _, value) in &targets {
            w.line(format!("{}: {value},", snake_case(name)));
        }
        w.close("}");
        w.close("}");
        w.close("}");
    } else {
        w.line(format!("/// Peripheral instances of {device_name}."));
        w.line(format!("{vis}struct {device_type};"));
        w.line("");
        w.open(format!("impl {device_type} {{"));
        for (name, pointer, value) in &targets {
            w.line(format!("{vis}const {}: {pointer} = {value};", constant_case(name)));
        }
        w.close("}");
    }
}
