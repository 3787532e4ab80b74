// Licensed under the Apache-2.0 license

//! Builds the document model from CMSIS-SVD style XML.
//!
//! Unknown elements are skipped. The first error aborts the whole decode.

use crate::error::{DecodeError, DecodeResult, Location};
use crate::model::*;
use crate::value::{
    normalize_whitespace, parse_bit_range, parse_bool, parse_dim_index, parse_enum_value,
    parse_i64, parse_u64, InvalidLiteral, Literal,
};
use roxmltree::{Document, Node};

/// Decodes a complete device description.
pub fn decode_document(text: &str) -> DecodeResult<Device> {
    let doc = Document::parse(text).map_err(|err| DecodeError::Malformed {
        message: err.to_string(),
    })?;
    let root = doc.root_element();
    if root.tag_name().name() != "device" {
        return Err(DecodeError::UnexpectedRoot {
            found: root.tag_name().name().to_string(),
        });
    }
    let device = decode_device(&Scope {
        doc: &doc,
        node: root,
        path: "device".to_string(),
    })?;
    log::debug!(
        "Decoded device {} with {} peripherals",
        device.name,
        device.peripherals.len()
    );
    Ok(device)
}

/// An element being decoded together with its path for diagnostics.
struct Scope<'a, 'input> {
    doc: &'a Document<'input>,
    node: Node<'a, 'input>,
    path: String,
}

impl<'a, 'input> Scope<'a, 'input> {
    fn position(&self, node: Node<'_, '_>) -> Option<(u32, u32)> {
        let pos = self.doc.text_pos_at(node.range().start);
        Some((pos.row, pos.col))
    }

    /// Location of the child element `name`, or of this element when the
    /// child is missing.
    fn location_of(&self, name: &str) -> Location {
        Location {
            path: format!("{}.{}", self.path, name),
            position: self
                .element(name)
                .map_or_else(|| self.position(self.node), |n| self.position(n)),
        }
    }

    fn nested(&self, node: Node<'a, 'input>, segment: String) -> Scope<'a, 'input> {
        Scope {
            doc: self.doc,
            node,
            path: format!("{}.{}", self.path, segment),
        }
    }

    fn element(&self, name: &str) -> Option<Node<'a, 'input>> {
        self.node
            .children()
            .find(|n| n.is_element() && n.tag_name().name() == name)
    }

    fn elements<'s>(&'s self, name: &'s str) -> impl Iterator<Item = Node<'a, 'input>> + 's {
        self.node
            .children()
            .filter(move |n| n.is_element() && n.tag_name().name() == name)
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.node.attribute(name).map(|s| s.trim().to_string())
    }

    fn text(&self, name: &str) -> Option<&'a str> {
        self.element(name).map(|n| n.text().unwrap_or_default().trim())
    }

    fn string(&self, name: &str) -> Option<String> {
        self.text(name).map(str::to_string)
    }

    /// Free text with whitespace runs collapsed.
    fn prose(&self, name: &str) -> Option<String> {
        self.text(name).map(normalize_whitespace)
    }

    fn required(&self, name: &'static str) -> DecodeResult<String> {
        match self.text(name) {
            Some(text) if !text.is_empty() => Ok(text.to_string()),
            _ => Err(DecodeError::MissingElement {
                location: self.location_of(name),
                element: name,
            }),
        }
    }

    fn invalid(&self, name: &str, source: InvalidLiteral) -> DecodeError {
        DecodeError::InvalidValue {
            location: self.location_of(name),
            source,
        }
    }

    fn decode<T>(
        &self,
        name: &str,
        f: impl Fn(&str) -> Result<T, InvalidLiteral>,
    ) -> DecodeResult<Option<T>> {
        self.text(name)
            .map(|text| f(text).map_err(|err| self.invalid(name, err)))
            .transpose()
    }

    fn integer(&self, name: &str) -> DecodeResult<Option<u64>> {
        self.decode(name, parse_u64)
    }

    fn literal<T: Literal>(&self, name: &str) -> DecodeResult<Option<T>> {
        self.decode(name, T::from_literal)
    }

    fn required_integer(&self, name: &'static str) -> DecodeResult<u64> {
        self.integer(name)?.ok_or_else(|| DecodeError::MissingElement {
            location: self.location_of(name),
            element: name,
        })
    }
}

fn decode_device(scope: &Scope) -> DecodeResult<Device> {
    let mut peripherals = Vec::new();
    if let Some(container) = scope.element("peripherals") {
        let container = scope.nested(container, "peripherals".to_string());
        for (i, node) in container.elements("peripheral").enumerate() {
            let child = scope.nested(node, format!("peripherals[{i}]"));
            peripherals.push(decode_peripheral(&child)?);
        }
    }

    Ok(Device {
        name: scope.required("name")?,
        vendor: scope.string("vendor"),
        version: scope.string("version"),
        description: scope.prose("description"),
        address_unit_bits: scope.integer("addressUnitBits")?,
        width: scope.integer("width")?,
        properties: decode_properties(scope)?,
        peripherals,
    })
}

fn decode_properties(scope: &Scope) -> DecodeResult<RegisterProperties> {
    Ok(RegisterProperties {
        size: scope.integer("size")?,
        access: scope.literal("access")?,
        protection: scope.literal("protection")?,
        reset_value: scope.integer("resetValue")?,
        reset_mask: scope.integer("resetMask")?,
    })
}

fn decode_dimension(scope: &Scope) -> DecodeResult<Option<Dimension>> {
    let Some(dim) = scope.integer("dim")? else {
        return Ok(None);
    };
    let increment = scope.required_integer("dimIncrement")?;
    let index = scope.decode("dimIndex", parse_dim_index)?;
    if let Some(index) = &index {
        if index.len() as u64 != dim {
            return Err(DecodeError::DimIndexMismatch {
                location: scope.location_of("dimIndex"),
                expected: dim,
                found: index.len(),
            });
        }
    }
    Ok(Some(Dimension {
        dim,
        increment,
        index,
        name: scope.string("dimName"),
    }))
}

fn decode_peripheral(scope: &Scope) -> DecodeResult<Peripheral> {
    let derived_from = scope.attribute("derivedFrom");
    let base_address = match derived_from {
        Some(_) => scope.integer("baseAddress")?,
        None => Some(scope.required_integer("baseAddress")?),
    };

    let mut address_blocks = Vec::new();
    for (i, node) in scope.elements("addressBlock").enumerate() {
        let block = scope.nested(node, format!("addressBlock[{i}]"));
        address_blocks.push(AddressBlock {
            offset: block.required_integer("offset")?,
            size: block.required_integer("size")?,
            usage: block.literal("usage")?,
            protection: block.literal("protection")?,
        });
    }

    let mut interrupts = Vec::new();
    for (i, node) in scope.elements("interrupt").enumerate() {
        let interrupt = scope.nested(node, format!("interrupt[{i}]"));
        interrupts.push(Interrupt {
            name: interrupt.required("name")?,
            description: interrupt.prose("description"),
            value: interrupt
                .decode("value", parse_i64)?
                .ok_or_else(|| DecodeError::MissingElement {
                    location: interrupt.location_of("value"),
                    element: "value",
                })?,
        });
    }

    let children = match scope.element("registers") {
        Some(container) => decode_children(scope, container)?,
        None => Vec::new(),
    };

    Ok(Peripheral {
        name: scope.required("name")?,
        derived_from,
        version: scope.string("version"),
        description: scope.prose("description"),
        group_name: scope.string("groupName"),
        prepend_to_name: scope.string("prependToName"),
        append_to_name: scope.string("appendToName"),
        base_address,
        properties: decode_properties(scope)?,
        dim: decode_dimension(scope)?,
        address_blocks,
        interrupts,
        children,
    })
}

/// Decodes the `register` and `cluster` elements under `container` in
/// document order. Paths index them jointly, as `registers[n]`.
fn decode_children(scope: &Scope, container: Node) -> DecodeResult<Vec<RegisterNode>> {
    let mut children = Vec::new();
    for node in container.children().filter(|n| n.is_element()) {
        let segment = format!("registers[{}]", children.len());
        match node.tag_name().name() {
            "register" => children.push(RegisterNode::Register(decode_register(
                &scope.nested(node, segment),
            )?)),
            "cluster" => children.push(RegisterNode::Cluster(decode_cluster(
                &scope.nested(node, segment),
            )?)),
            _ => {}
        }
    }
    Ok(children)
}

fn decode_cluster(scope: &Scope) -> DecodeResult<Cluster> {
    let derived_from = scope.attribute("derivedFrom");
    let address_offset = match derived_from {
        Some(_) => scope.integer("addressOffset")?,
        None => Some(scope.required_integer("addressOffset")?),
    };
    Ok(Cluster {
        name: scope.required("name")?,
        derived_from,
        description: scope.prose("description"),
        header_struct_name: scope.string("headerStructName"),
        address_offset,
        properties: decode_properties(scope)?,
        dim: decode_dimension(scope)?,
        children: decode_children(scope, scope.node)?,
    })
}

fn decode_write_constraint(scope: &Scope) -> DecodeResult<Option<WriteConstraint>> {
    let Some(node) = scope.element("writeConstraint") else {
        return Ok(None);
    };
    let constraint = scope.nested(node, "writeConstraint".to_string());
    if let Some(value) = constraint.decode("writeAsRead", parse_bool)? {
        return Ok(Some(WriteConstraint::WriteAsRead(value)));
    }
    if let Some(value) = constraint.decode("useEnumeratedValues", parse_bool)? {
        return Ok(Some(WriteConstraint::UseEnumeratedValues(value)));
    }
    if let Some(node) = constraint.element("range") {
        let range = constraint.nested(node, "range".to_string());
        return Ok(Some(WriteConstraint::Range {
            minimum: range.required_integer("minimum")?,
            maximum: range.required_integer("maximum")?,
        }));
    }
    Ok(None)
}

fn decode_register(scope: &Scope) -> DecodeResult<Register> {
    let derived_from = scope.attribute("derivedFrom");
    let address_offset = match derived_from {
        Some(_) => scope.integer("addressOffset")?,
        None => Some(scope.required_integer("addressOffset")?),
    };

    let mut fields = Vec::new();
    if let Some(node) = scope.element("fields") {
        for (i, node) in node
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == "field")
            .enumerate()
        {
            fields.push(decode_field(&scope.nested(node, format!("fields[{i}]")))?);
        }
    }

    Ok(Register {
        name: scope.required("name")?,
        derived_from,
        display_name: scope.string("displayName"),
        description: scope.prose("description"),
        alternate_group: scope.string("alternateGroup"),
        alternate_register: scope.string("alternateRegister"),
        address_offset,
        properties: decode_properties(scope)?,
        dim: decode_dimension(scope)?,
        modified_write_values: scope.literal("modifiedWriteValues")?,
        write_constraint: decode_write_constraint(scope)?,
        read_action: scope.literal("readAction")?,
        fields,
    })
}

/// Accepts `bitRange`, `lsb`+`msb`, or `bitOffset`+`bitWidth`.
fn decode_bit_range(scope: &Scope) -> DecodeResult<Option<BitRange>> {
    let bit_range = scope.decode("bitRange", parse_bit_range)?;
    let (msb, lsb, element) = if let Some((msb, lsb)) = bit_range {
        (msb, lsb, "bitRange")
    } else if let Some(lsb) = scope.integer("lsb")? {
        (scope.required_integer("msb")?, lsb, "msb")
    } else if scope.element("msb").is_some() {
        return Err(DecodeError::MissingElement {
            location: scope.location_of("lsb"),
            element: "lsb",
        });
    } else if let Some(offset) = scope.integer("bitOffset")? {
        let width = scope.integer("bitWidth")?.unwrap_or(1);
        let msb = offset
            .checked_add(width)
            .and_then(|end| end.checked_sub(1))
            .filter(|_| width > 0)
            .ok_or_else(|| {
                scope.invalid(
                    "bitWidth",
                    InvalidLiteral::new("bit width", &width.to_string()),
                )
            })?;
        (msb, offset, "bitWidth")
    } else {
        return Ok(None);
    };

    if msb < lsb {
        return Err(scope.invalid(
            element,
            InvalidLiteral::new("bit range", &format!("[{msb}:{lsb}]")),
        ));
    }
    Ok(Some(BitRange { lsb, msb }))
}

fn decode_field(scope: &Scope) -> DecodeResult<Field> {
    let derived_from = scope.attribute("derivedFrom");
    let bit_range = decode_bit_range(scope)?;
    if bit_range.is_none() && derived_from.is_none() {
        return Err(DecodeError::MissingElement {
            location: scope.location_of("bitOffset"),
            element: "bitOffset",
        });
    }

    let mut enumerated_values = Vec::new();
    for (i, node) in scope.elements("enumeratedValues").enumerate() {
        let set = scope.nested(node, format!("enumeratedValues[{i}]"));
        enumerated_values.push(decode_enumerated_values(&set)?);
    }

    Ok(Field {
        name: scope.required("name")?,
        derived_from,
        description: scope.prose("description"),
        bit_range,
        access: scope.literal("access")?,
        modified_write_values: scope.literal("modifiedWriteValues")?,
        write_constraint: decode_write_constraint(scope)?,
        read_action: scope.literal("readAction")?,
        dim: decode_dimension(scope)?,
        enumerated_values,
    })
}

fn decode_enumerated_values(scope: &Scope) -> DecodeResult<EnumeratedValues> {
    let mut values = Vec::new();
    for (i, node) in scope.elements("enumeratedValue").enumerate() {
        let entry = scope.nested(node, format!("values[{i}]"));
        let is_default = entry.decode("isDefault", parse_bool)?.unwrap_or(false);
        let value = entry.decode("value", parse_enum_value)?;
        if value.is_none() && !is_default {
            return Err(DecodeError::MissingElement {
                location: entry.location_of("value"),
                element: "value",
            });
        }
        values.push(EnumeratedValue {
            name: entry.required("name")?,
            description: entry.prose("description"),
            value,
            is_default,
        });
    }
    Ok(EnumeratedValues {
        name: scope.string("name"),
        usage: scope.literal("usage")?,
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<device schemaVersion="1.3">
  <name>STM32X</name>
  <vendor>Acme</vendor>
  <size>32</size>
  <access>read-write</access>
  <resetValue>0</resetValue>
  <resetMask>0xFFFFFFFF</resetMask>
  <peripherals>
    <peripheral>
      <name>TIM1</name>
      <description>Advanced
          timer</description>
      <baseAddress>0x40010000</baseAddress>
      <addressBlock>
        <offset>0</offset>
        <size>0x400</size>
        <usage>registers</usage>
      </addressBlock>
      <interrupt>
        <name>TIM1_UP</name>
        <value>25</value>
      </interrupt>
      <registers>
        <register>
          <name>CR1</name>
          <addressOffset>0x0</addressOffset>
          <resetValue>0x0000</resetValue>
          <fields>
            <field>
              <name>CEN</name>
              <bitOffset>0</bitOffset>
              <bitWidth>1</bitWidth>
            </field>
            <field>
              <name>CMS</name>
              <bitRange>[6:5]</bitRange>
              <access>read-write</access>
              <enumeratedValues>
                <name>CMS</name>
                <enumeratedValue><name>Edge</name><value>0</value></enumeratedValue>
                <enumeratedValue><name>Center</name><value>#1x</value></enumeratedValue>
              </enumeratedValues>
            </field>
            <field>
              <name>CKD</name>
              <lsb>8</lsb>
              <msb>9</msb>
            </field>
          </fields>
        </register>
        <cluster>
          <name>CH%s</name>
          <dim>4</dim>
          <dimIncrement>8</dimIncrement>
          <addressOffset>0x20</addressOffset>
          <register>
            <name>CCR</name>
            <addressOffset>0</addressOffset>
          </register>
        </cluster>
      </registers>
    </peripheral>
    <peripheral derivedFrom="TIM1">
      <name>TIM8</name>
      <baseAddress>0x40013400</baseAddress>
    </peripheral>
  </peripherals>
</device>"#;

    #[test]
    fn test_decode_minimal() {
        let device = decode_document(MINIMAL).unwrap();
        assert_eq!(device.name, "STM32X");
        assert_eq!(device.vendor.as_deref(), Some("Acme"));
        assert_eq!(device.properties.size, Some(32));
        assert_eq!(device.properties.access, Some(Access::ReadWrite));
        assert_eq!(device.properties.reset_mask, Some(0xFFFF_FFFF));
        assert_eq!(device.peripherals.len(), 2);

        let tim1 = &device.peripherals[0];
        assert_eq!(tim1.description.as_deref(), Some("Advanced timer"));
        assert_eq!(tim1.base_address, Some(0x4001_0000));
        assert_eq!(tim1.address_blocks[0].size, 0x400);
        assert_eq!(tim1.interrupts[0].value, 25);
        assert_eq!(tim1.children.len(), 2);

        let RegisterNode::Register(cr1) = &tim1.children[0] else {
            panic!("expected register");
        };
        assert_eq!(cr1.fields.len(), 3);
        assert_eq!(cr1.fields[0].bit_range, Some(BitRange { lsb: 0, msb: 0 }));
        assert_eq!(cr1.fields[1].bit_range, Some(BitRange { lsb: 5, msb: 6 }));
        assert_eq!(cr1.fields[2].bit_range, Some(BitRange { lsb: 8, msb: 9 }));
        let values = &cr1.fields[1].enumerated_values[0].values;
        assert_eq!(values[1].value.map(|v| (v.value, v.mask)), Some((0b10, !0b01)));

        let RegisterNode::Cluster(ch) = &tim1.children[1] else {
            panic!("expected cluster");
        };
        assert_eq!(ch.dim.as_ref().map(|d| (d.dim, d.increment)), Some((4, 8)));
        assert_eq!(ch.children.len(), 1);

        let tim8 = &device.peripherals[1];
        assert_eq!(tim8.derived_from.as_deref(), Some("TIM1"));
        assert!(tim8.children.is_empty());
    }

    #[test]
    fn test_missing_required() {
        let text = MINIMAL.replace("<addressOffset>0x0</addressOffset>", "");
        let err = decode_document(&text).unwrap_err();
        match err {
            DecodeError::MissingElement { location, element } => {
                assert_eq!(element, "addressOffset");
                assert_eq!(
                    location.path,
                    "device.peripherals[0].registers[0].addressOffset"
                );
                assert!(location.position.is_some());
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_invalid_literal() {
        let text = MINIMAL.replace("<bitWidth>1</bitWidth>", "<bitWidth>1x</bitWidth>");
        let err = decode_document(&text).unwrap_err();
        let msg = err.to_string();
        assert!(
            msg.contains("device.peripherals[0].registers[0].fields[0].bitWidth"),
            "{msg}"
        );
        assert!(msg.contains("invalid integer '1x'"), "{msg}");
    }

    #[test]
    fn test_bad_access_literal() {
        let text = MINIMAL.replace(
            "<access>read-write</access>\n              <enumeratedValues>",
            "<access>sometimes</access>\n              <enumeratedValues>",
        );
        let err = decode_document(&text).unwrap_err();
        assert!(err.to_string().contains("invalid access 'sometimes'"));
    }

    #[test]
    fn test_reversed_bit_range() {
        let text = MINIMAL.replace("<bitRange>[6:5]</bitRange>", "<bitRange>[5:6]</bitRange>");
        assert!(matches!(
            decode_document(&text),
            Err(DecodeError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_dim_index_mismatch() {
        let text = MINIMAL.replace(
            "<dimIncrement>8</dimIncrement>",
            "<dimIncrement>8</dimIncrement><dimIndex>A-C</dimIndex>",
        );
        assert!(matches!(
            decode_document(&text),
            Err(DecodeError::DimIndexMismatch {
                expected: 4,
                found: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_unknown_elements_ignored() {
        let text = MINIMAL.replace(
            "<vendor>Acme</vendor>",
            "<vendor>Acme</vendor><cpu><name>CM4</name></cpu><vendorExtensions><x/></vendorExtensions>",
        );
        assert!(decode_document(&text).is_ok());
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(
            decode_document("<device><name>x</device>"),
            Err(DecodeError::Malformed { .. })
        ));
        assert!(matches!(
            decode_document("<chip/>"),
            Err(DecodeError::UnexpectedRoot { .. })
        ));
    }
}
