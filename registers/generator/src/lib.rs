// Licensed under the Apache-2.0 license

//! SVD to tock-registers Rust code generator.
//!
//! This crate turns a decoded SVD document (see `registers-svd`) into a
//! normalized register map and renders it as Rust source built on the
//! tock-registers macros.
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use registers_generator::{generate_from_file, Destination, ExportConfig};
//!
//! let config = ExportConfig::new().select_peripheral("TIM1");
//! let exported = generate_from_file(Path::new("stm32f4.svd"), &config).unwrap();
//! for warning in &exported.warnings {
//!     eprintln!("{warning}");
//! }
//! Destination::Directory("src/generated".into())
//!     .write(exported.units)
//!     .unwrap();
//! ```
//!
//! ## Module Organization
//!
//! - [`types`]: the normalized register map
//! - [`config`]: export options ([`ExportConfig`])
//! - [`output`]: rendering of the register map into output units
//! - [`writer`]: delivery of output units to stdout, files or directories
//! - [`access`]: path lookup and field-level access through a memory backend
//! - [`bits`]: bit range helpers
//! - [`util`]: identifier sanitizing and case conversion

pub mod access;
pub mod bits;
pub mod config;
pub mod error;
pub mod output;
pub mod types;
pub mod util;
pub mod writer;

mod codegen;

pub use codegen::{
    build_ir, build_ir_from_file, generate, generate_from_file, Exported, Validated, Warning,
};
pub use config::ExportConfig;
pub use error::{Error, Result};
pub use output::{export, OutputUnit};
pub use writer::Destination;
