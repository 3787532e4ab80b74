// Licensed under the Apache-2.0 license

use registers_svd::{DecodeError, ReferenceError};
use std::path::PathBuf;
use thiserror::Error;

/// The resolved document violates a layout or naming rule.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ValidationError {
    #[error("{path}: name '{name}' cannot be turned into an identifier")]
    UnrepresentableName { path: String, name: String },

    #[error("{path}: missing '{element}' after inheritance resolution")]
    MissingElement { path: String, element: &'static str },

    #[error("{path}: register size {size} is outside 1..=64")]
    InvalidRegisterSize { path: String, size: u64 },

    #[error("{register}: field '{field}' bits [{lower}, {upper}) exceed the register size of {size} bits")]
    FieldOutOfBounds {
        register: String,
        field: String,
        lower: u64,
        upper: u64,
        size: u32,
    },

    #[error("{register}: fields '{first}' and '{second}' overlap in bits [{lower}, {upper})")]
    FieldOverlap {
        register: String,
        first: String,
        second: String,
        lower: u32,
        upper: u32,
    },

    #[error("{field}: enumerated value '{case}' ({value:#x}) does not fit in {width} bits")]
    EnumValueOutOfRange {
        field: String,
        case: String,
        value: u64,
        width: u32,
    },

    #[error("{peripheral}: interrupt '{name}' has out of range value {value}")]
    InterruptOutOfRange {
        peripheral: String,
        name: String,
        value: i64,
    },
}

/// The export request cannot be satisfied by the IR.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ExportError {
    #[error("Unknown peripheral '{name}', valid options: {}", .valid.join(", "))]
    UnknownPeripheral { name: String, valid: Vec<String> },

    #[error("{destination} can only receive a single output unit, got {units}")]
    TooManyUnits {
        destination: String,
        units: usize,
    },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl From<registers_svd::Error> for Error {
    fn from(err: registers_svd::Error) -> Self {
        match err {
            registers_svd::Error::Decode(err) => Error::Decode(err),
            registers_svd::Error::Reference(err) => Error::Reference(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
