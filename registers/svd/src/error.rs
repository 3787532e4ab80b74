// Licensed under the Apache-2.0 license

//! Error types for decoding and inheritance resolution.

use crate::model::ItemKind;
use crate::value::InvalidLiteral;
use std::fmt;
use thiserror::Error;

/// Location of a node in the source document.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Location {
    /// Dotted path, e.g. `device.peripherals[3].registers[1].name`.
    pub path: String,
    /// 1-based line and column of the node, if it exists in the text.
    pub position: Option<(u32, u32)>,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some((line, col)) => write!(f, "{} (line {line}, column {col})", self.path),
            None => write!(f, "{}", self.path),
        }
    }
}

/// Failure to turn the raw document into the document model.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum DecodeError {
    #[error("malformed document: {message}")]
    Malformed { message: String },

    #[error("unexpected root element '{found}', expected 'device'")]
    UnexpectedRoot { found: String },

    #[error("{location}: missing required element '{element}'")]
    MissingElement {
        location: Location,
        element: &'static str,
    },

    #[error("{location}: {source}")]
    InvalidValue {
        location: Location,
        source: InvalidLiteral,
    },

    #[error("{location}: 'dimIndex' lists {found} entries but 'dim' is {expected}")]
    DimIndexMismatch {
        location: Location,
        expected: u64,
        found: usize,
    },
}

/// Failure to resolve a `derivedFrom` reference.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ReferenceError {
    #[error(
        "{kind} '{node}' derived from unknown item '{target}', valid options: {}",
        .options.join(", ")
    )]
    Unresolved {
        kind: ItemKind,
        node: String,
        target: String,
        options: Vec<String>,
    },

    #[error(
        "{kind} '{}' has a cyclic dependency on itself, cycle: {}",
        .chain.first().map(String::as_str).unwrap_or_default(),
        .chain.join(" -> ")
    )]
    Cycle { kind: ItemKind, chain: Vec<String> },

    #[error("{kind} '{node}' cannot derive from {target_kind} '{target}'")]
    KindMismatch {
        kind: ItemKind,
        node: String,
        target_kind: ItemKind,
        target: String,
    },
}

pub type DecodeResult<T> = std::result::Result<T, DecodeError>;
pub type ReferenceResult<T> = std::result::Result<T, ReferenceError>;
