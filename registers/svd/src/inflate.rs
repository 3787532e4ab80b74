// Licensed under the Apache-2.0 license

//! Resolves `derivedFrom` references ("inflating" the document).
//!
//! Every node is resolved at most once. Nodes currently being resolved are
//! kept on a stack so that a reference back into that stack is reported as
//! a cycle instead of recursing forever.

use crate::error::{ReferenceError, ReferenceResult};
use crate::model::*;
use std::collections::HashMap;

/// Produces a copy of `device` in which no node carries `derivedFrom`.
pub fn inflate(device: &Device) -> ReferenceResult<Device> {
    let mut resolver = Resolver::new(device);
    let peripherals = (0..device.peripherals.len())
        .map(|idx| resolver.resolve_peripheral(idx))
        .collect::<ReferenceResult<Vec<_>>>()?;
    Ok(Device {
        peripherals,
        ..device.clone()
    })
}

/// One sibling scope: the children of a peripheral or cluster.
struct Level<'d, 'p> {
    parent: Option<&'p Level<'d, 'p>>,
    /// Unique memo key for this scope.
    key: String,
    /// Dotted name path, for messages.
    path: String,
    /// Children as written in the document.
    raw: &'d [RegisterNode],
    /// Already resolved children of the node this scope derives from.
    base: Vec<RegisterNode>,
}

/// The top-level scope of peripheral `idx`.
fn peripheral_level<'d, 'p>(
    device: &'d Device,
    idx: usize,
    base: Option<&Peripheral>,
) -> Level<'d, 'p> {
    let raw = &device.peripherals[idx];
    Level {
        parent: None,
        key: format!("p{idx}"),
        path: raw.name.clone(),
        raw: &raw.children,
        base: base.map(|b| b.children.clone()).unwrap_or_default(),
    }
}

struct Resolver<'d> {
    device: &'d Device,
    peripherals: HashMap<usize, Peripheral>,
    nodes: HashMap<String, RegisterNode>,
    /// `(memo key, display name)` of every node being resolved.
    in_progress: Vec<(String, String)>,
}

impl<'d> Resolver<'d> {
    fn new(device: &'d Device) -> Self {
        Self {
            device,
            peripherals: HashMap::new(),
            nodes: HashMap::new(),
            in_progress: Vec::new(),
        }
    }

    fn enter(&mut self, kind: ItemKind, key: String, display: String) -> ReferenceResult<()> {
        if let Some(pos) = self.in_progress.iter().position(|(k, _)| *k == key) {
            let mut chain: Vec<String> = self.in_progress[pos..]
                .iter()
                .map(|(_, d)| d.clone())
                .collect();
            chain.push(display);
            return Err(ReferenceError::Cycle { kind, chain });
        }
        self.in_progress.push((key, display));
        Ok(())
    }

    fn leave(&mut self) {
        self.in_progress.pop();
    }

    fn peripheral_index(&self, name: &str) -> Option<usize> {
        self.device.peripherals.iter().position(|p| p.name == name)
    }

    fn resolve_peripheral(&mut self, idx: usize) -> ReferenceResult<Peripheral> {
        if let Some(done) = self.peripherals.get(&idx) {
            return Ok(done.clone());
        }
        let name = self.device.peripherals[idx].name.clone();
        self.enter(ItemKind::Peripheral, format!("p{idx}"), name)?;
        let resolved = self.inflate_peripheral(idx);
        self.leave();
        let resolved = resolved?;
        self.peripherals.insert(idx, resolved.clone());
        Ok(resolved)
    }

    /// The resolved peripheral that peripheral `idx` derives from.
    fn base_peripheral(&mut self, idx: usize) -> ReferenceResult<Option<Peripheral>> {
        let device = self.device;
        let raw = &device.peripherals[idx];
        let Some(target) = &raw.derived_from else {
            return Ok(None);
        };
        let Some(base_idx) = self.peripheral_index(target) else {
            return Err(ReferenceError::Unresolved {
                kind: ItemKind::Peripheral,
                node: raw.name.clone(),
                target: target.clone(),
                options: device.peripherals.iter().map(|p| p.name.clone()).collect(),
            });
        };
        log::debug!("Peripheral {} derives from {}", raw.name, target);
        self.resolve_peripheral(base_idx).map(Some)
    }

    fn inflate_peripheral(&mut self, idx: usize) -> ReferenceResult<Peripheral> {
        let device = self.device;
        let raw = &device.peripherals[idx];
        let base = self.base_peripheral(idx)?;
        let level = peripheral_level(device, idx, base.as_ref());
        let children = self.resolve_level(&level)?;

        Ok(match base {
            Some(base) => Peripheral {
                name: raw.name.clone(),
                derived_from: None,
                version: raw.version.clone().or(base.version),
                description: raw.description.clone().or(base.description),
                group_name: raw.group_name.clone().or(base.group_name),
                prepend_to_name: raw.prepend_to_name.clone().or(base.prepend_to_name),
                append_to_name: raw.append_to_name.clone().or(base.append_to_name),
                base_address: raw.base_address.or(base.base_address),
                properties: raw.properties.inherit(&base.properties),
                dim: raw.dim.clone().or(base.dim),
                address_blocks: if raw.address_blocks.is_empty() {
                    base.address_blocks
                } else {
                    raw.address_blocks.clone()
                },
                // Interrupts belong to the instance and are never inherited.
                interrupts: raw.interrupts.clone(),
                children,
            },
            None => Peripheral {
                children,
                ..raw.clone()
            },
        })
    }

    /// Resolves every child of `level`, then appends the inherited children
    /// the document does not mention.
    fn resolve_level(&mut self, level: &Level<'d, '_>) -> ReferenceResult<Vec<RegisterNode>> {
        let mut children = (0..level.raw.len())
            .map(|i| self.resolve_child(level, i))
            .collect::<ReferenceResult<Vec<_>>>()?;
        for inherited in &level.base {
            if !level.raw.iter().any(|r| r.name() == inherited.name()) {
                children.push(inherited.clone());
            }
        }
        Ok(children)
    }

    fn resolve_child(&mut self, level: &Level<'d, '_>, i: usize) -> ReferenceResult<RegisterNode> {
        let key = format!("{}/{}", level.key, i);
        if let Some(done) = self.nodes.get(&key) {
            return Ok(done.clone());
        }
        let raw: &'d [RegisterNode] = level.raw;
        let node = &raw[i];
        let path = format!("{}.{}", level.path, node.name());
        self.enter(node.kind(), key.clone(), path.clone())?;
        let resolved = self.resolve_node(level, &key, node, &path);
        self.leave();
        let resolved = resolved?;
        self.nodes.insert(key, resolved.clone());
        Ok(resolved)
    }

    /// Resolves `node` against its own referent and against the same-named
    /// child of the scope's base. The referent wins over the scope's base.
    fn resolve_node(
        &mut self,
        level: &Level<'d, '_>,
        key: &str,
        node: &'d RegisterNode,
        path: &str,
    ) -> ReferenceResult<RegisterNode> {
        let referent = match node.derived_from() {
            Some(target) => {
                let found = self.lookup(level, node, target)?;
                if found.kind() != node.kind() {
                    return Err(ReferenceError::KindMismatch {
                        kind: node.kind(),
                        node: path.to_string(),
                        target_kind: found.kind(),
                        target: target.to_string(),
                    });
                }
                log::debug!("{} {} derives from {}", node.kind(), path, target);
                Some(found)
            }
            None => None,
        };
        let counterpart = level.base.iter().find(|b| b.name() == node.name());
        let base = match (referent, counterpart) {
            (Some(referent), Some(counterpart)) => Some(merge_node(referent, counterpart, path)?),
            (Some(referent), None) => Some(referent),
            (None, Some(counterpart)) if counterpart.kind() != node.kind() => {
                return Err(ReferenceError::KindMismatch {
                    kind: node.kind(),
                    node: path.to_string(),
                    target_kind: counterpart.kind(),
                    target: counterpart.name().to_string(),
                });
            }
            (None, counterpart) => counterpart.cloned(),
        };

        match node {
            RegisterNode::Register(own) => {
                let base = match base {
                    Some(RegisterNode::Register(r)) => Some(r),
                    _ => None,
                };
                Ok(RegisterNode::Register(self.resolve_register(own, base.as_ref(), path)?))
            }
            RegisterNode::Cluster(own) => {
                let base = match base {
                    Some(RegisterNode::Cluster(c)) => Some(c),
                    _ => None,
                };
                let nested = Level {
                    parent: Some(level),
                    key: key.to_string(),
                    path: path.to_string(),
                    raw: &own.children,
                    base: base
                        .as_ref()
                        .map(|c| c.children.clone())
                        .unwrap_or_default(),
                };
                let children = self.resolve_level(&nested)?;
                let cluster = Cluster {
                    derived_from: None,
                    children,
                    ..own.clone()
                };
                Ok(RegisterNode::Cluster(match &base {
                    Some(base) => merge_cluster_attributes(cluster, base),
                    None => cluster,
                }))
            }
        }
    }

    /// Finds the referent of `node`'s `derivedFrom`, searching siblings
    /// first, then enclosing scopes, then the device root.
    fn lookup(
        &mut self,
        level: &Level<'d, '_>,
        node: &RegisterNode,
        target: &str,
    ) -> ReferenceResult<RegisterNode> {
        let mut segments = target.split('.');
        let first = segments.next().unwrap_or(target);
        let rest: Vec<&str> = segments.collect();

        let mut scope = Some(level);
        while let Some(current) = scope {
            if let Some(found) = self.find_in_level(current, first)? {
                if let Some(found) = descend(found, &rest) {
                    return Ok(found);
                }
            }
            // The outermost scope may be named explicitly, as in `TIM1.CR1`.
            if current.parent.is_none() && current.path == first && !rest.is_empty() {
                if let Some(found) = self.find_in_level(current, rest[0])? {
                    if let Some(found) = descend(found, &rest[1..]) {
                        return Ok(found);
                    }
                }
            }
            scope = current.parent;
        }

        // Another peripheral's child: only that child is resolved, so two
        // peripherals may reference each other's registers.
        if !rest.is_empty() && first != root_path(level) {
            if let Some(idx) = self.peripheral_index(first) {
                let base = self.base_peripheral(idx)?;
                let other = peripheral_level(self.device, idx, base.as_ref());
                if let Some(found) = self.find_in_level(&other, rest[0])? {
                    if let Some(found) = descend(found, &rest[1..]) {
                        return Ok(found);
                    }
                }
            }
        }

        let mut options: Vec<String> = Vec::new();
        let mut scope = Some(level);
        while let Some(current) = scope {
            for name in current
                .raw
                .iter()
                .chain(&current.base)
                .map(RegisterNode::name)
            {
                if !options.iter().any(|o| o == name) {
                    options.push(name.to_string());
                }
            }
            scope = current.parent;
        }
        Err(ReferenceError::Unresolved {
            kind: node.kind(),
            node: node.name().to_string(),
            target: target.to_string(),
            options,
        })
    }

    fn find_in_level(
        &mut self,
        level: &Level<'d, '_>,
        name: &str,
    ) -> ReferenceResult<Option<RegisterNode>> {
        if let Some(i) = level.raw.iter().position(|r| r.name() == name) {
            return self.resolve_child(level, i).map(Some);
        }
        Ok(level.base.iter().find(|b| b.name() == name).cloned())
    }

    fn resolve_register(
        &mut self,
        own: &Register,
        referent: Option<&Register>,
        path: &str,
    ) -> ReferenceResult<Register> {
        let mut fields = FieldResolver {
            raw: &own.fields,
            inherited: referent.map(|r| r.fields.as_slice()).unwrap_or_default(),
            path,
            done: HashMap::new(),
            in_progress: Vec::new(),
        }
        .resolve_all()?;

        let Some(referent) = referent else {
            return Ok(Register {
                derived_from: None,
                fields,
                ..own.clone()
            });
        };
        for inherited in &referent.fields {
            if !fields.iter().any(|f| f.name == inherited.name) {
                fields.push(inherited.clone());
            }
        }
        Ok(Register {
            derived_from: None,
            fields,
            ..merge_register_attributes(own.clone(), referent)
        })
    }
}

/// Walks cluster children by name.
fn descend(mut node: RegisterNode, rest: &[&str]) -> Option<RegisterNode> {
    for segment in rest {
        let RegisterNode::Cluster(cluster) = node else {
            return None;
        };
        node = cluster
            .children
            .into_iter()
            .find(|c| c.name() == *segment)?;
    }
    Some(node)
}

fn root_path<'a>(level: &'a Level<'_, '_>) -> &'a str {
    let mut current = level;
    while let Some(parent) = current.parent {
        current = parent;
    }
    &current.path
}

/// Resolves field-level `derivedFrom` within one register.
struct FieldResolver<'a> {
    raw: &'a [Field],
    inherited: &'a [Field],
    path: &'a str,
    done: HashMap<usize, Field>,
    in_progress: Vec<usize>,
}

impl FieldResolver<'_> {
    fn resolve_all(&mut self) -> ReferenceResult<Vec<Field>> {
        (0..self.raw.len()).map(|i| self.resolve(i)).collect()
    }

    fn resolve(&mut self, i: usize) -> ReferenceResult<Field> {
        if let Some(done) = self.done.get(&i) {
            return Ok(done.clone());
        }
        let own = &self.raw[i];
        if let Some(pos) = self.in_progress.iter().position(|p| *p == i) {
            let mut chain: Vec<String> = self.in_progress[pos..]
                .iter()
                .map(|p| format!("{}.{}", self.path, self.raw[*p].name))
                .collect();
            chain.push(format!("{}.{}", self.path, own.name));
            return Err(ReferenceError::Cycle {
                kind: ItemKind::Field,
                chain,
            });
        }
        self.in_progress.push(i);
        let resolved = self.resolve_field(own);
        self.in_progress.pop();
        let resolved = resolved?;
        self.done.insert(i, resolved.clone());
        Ok(resolved)
    }

    fn resolve_field(&mut self, own: &Field) -> ReferenceResult<Field> {
        let mut resolved = Field {
            derived_from: None,
            ..own.clone()
        };
        if let Some(target) = &own.derived_from {
            let referent = if let Some(j) = self.raw.iter().position(|f| f.name == *target) {
                self.resolve(j)?
            } else if let Some(f) = self.inherited.iter().find(|f| f.name == *target) {
                f.clone()
            } else {
                return Err(ReferenceError::Unresolved {
                    kind: ItemKind::Field,
                    node: format!("{}.{}", self.path, own.name),
                    target: target.clone(),
                    options: self
                        .raw
                        .iter()
                        .chain(self.inherited)
                        .map(|f| f.name.clone())
                        .collect(),
                });
            };
            resolved = merge_field(resolved, &referent);
        }
        if let Some(inherited) = self.inherited.iter().find(|f| f.name == own.name) {
            resolved = merge_field(resolved, inherited);
        }
        Ok(resolved)
    }
}

//=========================================================================
// Merging
//=========================================================================

/// Merges two resolved nodes of the same name; `own` wins attribute by
/// attribute and child by child.
fn merge_node(own: RegisterNode, base: &RegisterNode, path: &str) -> ReferenceResult<RegisterNode> {
    match (own, base) {
        (RegisterNode::Register(own), RegisterNode::Register(base)) => {
            let mut fields: Vec<Field> = own
                .fields
                .iter()
                .map(|field| match base.fields.iter().find(|f| f.name == field.name) {
                    Some(inherited) => merge_field(field.clone(), inherited),
                    None => field.clone(),
                })
                .collect();
            for inherited in &base.fields {
                if !fields.iter().any(|f| f.name == inherited.name) {
                    fields.push(inherited.clone());
                }
            }
            Ok(RegisterNode::Register(Register {
                fields,
                ..merge_register_attributes(own, base)
            }))
        }
        (RegisterNode::Cluster(own), RegisterNode::Cluster(base)) => {
            let mut children = Vec::with_capacity(own.children.len());
            for child in &own.children {
                let child_path = format!("{}.{}", path, child.name());
                match base.children.iter().find(|b| b.name() == child.name()) {
                    Some(inherited) => {
                        children.push(merge_node(child.clone(), inherited, &child_path)?)
                    }
                    None => children.push(child.clone()),
                }
            }
            for inherited in &base.children {
                if !own.children.iter().any(|c| c.name() == inherited.name()) {
                    children.push(inherited.clone());
                }
            }
            Ok(RegisterNode::Cluster(Cluster {
                children,
                ..merge_cluster_attributes(own, base)
            }))
        }
        (own, base) => Err(ReferenceError::KindMismatch {
            kind: own.kind(),
            node: path.to_string(),
            target_kind: base.kind(),
            target: base.name().to_string(),
        }),
    }
}

fn merge_cluster_attributes(own: Cluster, base: &Cluster) -> Cluster {
    Cluster {
        derived_from: None,
        description: own.description.or_else(|| base.description.clone()),
        header_struct_name: own
            .header_struct_name
            .or_else(|| base.header_struct_name.clone()),
        address_offset: own.address_offset.or(base.address_offset),
        properties: own.properties.inherit(&base.properties),
        dim: own.dim.or_else(|| base.dim.clone()),
        ..own
    }
}

/// Fills absent register attributes from `base`. Fields are left alone.
fn merge_register_attributes(own: Register, base: &Register) -> Register {
    Register {
        derived_from: None,
        display_name: own.display_name.or_else(|| base.display_name.clone()),
        description: own.description.or_else(|| base.description.clone()),
        alternate_group: own.alternate_group.or_else(|| base.alternate_group.clone()),
        alternate_register: own
            .alternate_register
            .or_else(|| base.alternate_register.clone()),
        address_offset: own.address_offset.or(base.address_offset),
        properties: own.properties.inherit(&base.properties),
        dim: own.dim.or_else(|| base.dim.clone()),
        modified_write_values: own.modified_write_values.or(base.modified_write_values),
        write_constraint: own
            .write_constraint
            .or_else(|| base.write_constraint.clone()),
        read_action: own.read_action.or(base.read_action),
        ..own
    }
}

fn merge_field(own: Field, base: &Field) -> Field {
    Field {
        derived_from: None,
        description: own.description.or_else(|| base.description.clone()),
        bit_range: own.bit_range.or(base.bit_range),
        access: own.access.or(base.access),
        modified_write_values: own.modified_write_values.or(base.modified_write_values),
        write_constraint: own
            .write_constraint
            .or_else(|| base.write_constraint.clone()),
        read_action: own.read_action.or(base.read_action),
        dim: own.dim.or_else(|| base.dim.clone()),
        enumerated_values: if own.enumerated_values.is_empty() {
            base.enumerated_values.clone()
        } else {
            own.enumerated_values
        },
        ..own
    }
}
