// Licensed under the Apache-2.0 license

//! Advisory address checks over a built IR.
//!
//! Hardware often aliases addresses on purpose, so overlaps found here are
//! returned as [`Warning`]s next to the IR instead of failing the build.

use crate::types::{Cluster, Device, Register};
use serde::Serialize;
use std::fmt;
use std::ops::Range;

/// A non-fatal finding about the address layout.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Warning {
    /// Two registers of one peripheral share bytes.
    RegisterOverlap {
        peripheral: String,
        first: String,
        second: String,
        range: Range<u64>,
    },
    /// Two peripherals of the device share bytes.
    PeripheralOverlap {
        first: String,
        second: String,
        range: Range<u64>,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::RegisterOverlap {
                peripheral,
                first,
                second,
                range,
            } => write!(
                f,
                "{peripheral}: registers '{first}' and '{second}' overlap at {:#x}..{:#x}",
                range.start, range.end
            ),
            Warning::PeripheralOverlap {
                first,
                second,
                range,
            } => write!(
                f,
                "peripherals '{first}' and '{second}' overlap at {:#x}..{:#x}",
                range.start, range.end
            ),
        }
    }
}

/// The IR together with the warnings found while validating it.
#[derive(Clone, Debug, Serialize)]
pub struct Validated {
    pub device: Device,
    pub warnings: Vec<Warning>,
}

pub(crate) fn validate(device: Device) -> Validated {
    let mut warnings = Vec::new();
    for peripheral in &device.peripherals {
        let mut spans = Vec::new();
        collect_spans(&peripheral.registers, &peripheral.clusters, 0, "", &mut spans);
        for (first, second, range) in overlaps(spans) {
            warnings.push(Warning::RegisterOverlap {
                peripheral: peripheral.name.clone(),
                first,
                second,
                range,
            });
        }
    }

    let spans = device
        .peripherals
        .iter()
        .map(|p| {
            let start = p.base_address.saturating_add(p.address_range.start);
            let end = p.base_address.saturating_add(p.address_range.end);
            (p.name.clone(), start..end)
        })
        .collect();
    for (first, second, range) in overlaps(spans) {
        warnings.push(Warning::PeripheralOverlap {
            first,
            second,
            range,
        });
    }

    for warning in &warnings {
        log::warn!("{warning}");
    }
    Validated { device, warnings }
}

/// Byte ranges of every register element, relative to the peripheral.
fn collect_spans(
    registers: &[Register],
    clusters: &[Cluster],
    base: u64,
    prefix: &str,
    spans: &mut Vec<(String, Range<u64>)>,
) {
    for register in registers {
        for (suffix, offset) in elements(register.address_offset, register.vector) {
            let start = base.saturating_add(offset);
            spans.push((
                format!("{prefix}{}{suffix}", register.name),
                start..start.saturating_add(register.byte_size()),
            ));
        }
    }
    for cluster in clusters {
        for (suffix, offset) in elements(cluster.address_offset, cluster.vector) {
            let prefix = format!("{prefix}{}{suffix}.", cluster.name);
            collect_spans(
                &cluster.registers,
                &cluster.clusters,
                base.saturating_add(offset),
                &prefix,
                spans,
            );
        }
    }
}

fn elements(offset: u64, vector: Option<crate::types::Vector>) -> Vec<(String, u64)> {
    match vector {
        None => vec![(String::new(), offset)],
        Some(v) => (0..v.count)
            .map(|i| (format!("[{i}]"), offset.saturating_add(i.saturating_mul(v.stride))))
            .collect(),
    }
}

/// Pairs of overlapping named ranges, with the shared bytes. Empty ranges
/// never overlap.
fn overlaps(mut spans: Vec<(String, Range<u64>)>) -> Vec<(String, String, Range<u64>)> {
    spans.retain(|(_, range)| !range.is_empty());
    spans.sort_by(|a, b| (a.1.start, &a.0).cmp(&(b.1.start, &b.0)));
    let mut found = Vec::new();
    let mut widest: Option<&(String, Range<u64>)> = None;
    for span in &spans {
        if let Some((name, range)) = widest {
            if span.1.start < range.end {
                found.push((
                    name.clone(),
                    span.0.clone(),
                    span.1.start..span.1.end.min(range.end),
                ));
            }
        }
        match widest {
            Some((_, range)) if range.end >= span.1.end => {}
            _ => widest = Some(span),
        }
    }
    found
}
