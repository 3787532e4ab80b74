// Licensed under the Apache-2.0 license

//! The pipeline from document text to generated source.
//!
//! - decode and resolve inheritance (`registers-svd`)
//! - `build`: defaulting, array expansion, naming and field layout checks
//! - `validate`: advisory address overlap checks
//! - [`crate::output`]: rendering of the selected peripherals

mod build;
mod validate;

pub use validate::{Validated, Warning};

use crate::config::ExportConfig;
use crate::error::{Error, Result};
use crate::output::{export, OutputUnit};
use std::path::Path;

/// Decodes `text`, resolves inheritance and builds the validated IR.
pub fn build_ir(text: &str) -> Result<Validated> {
    let document = registers_svd::parse(text)?;
    let device = build::build_device(&document)?;
    Ok(validate::validate(device))
}

/// Reads the document at `path` and builds the validated IR.
pub fn build_ir_from_file(path: &Path) -> Result<Validated> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("Read {} ({} bytes)", path.display(), text.len());
    build_ir(&text)
}

/// Generated units together with the address overlap warnings found on
/// the way.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Exported {
    pub units: Vec<OutputUnit>,
    pub warnings: Vec<Warning>,
}

fn export_validated(validated: Validated, config: &ExportConfig) -> Result<Exported> {
    let units = export(&validated.device, config)?;
    Ok(Exported {
        units,
        warnings: validated.warnings,
    })
}

/// Runs the whole pipeline on `text`.
///
/// # Example
///
/// ```
/// use registers_generator::{generate, ExportConfig};
///
/// let exported = generate(
///     "<device><name>DEV</name><peripherals><peripheral>\
///        <name>UART0</name><baseAddress>0x4000</baseAddress>\
///        <registers><register><name>DR</name><addressOffset>0</addressOffset></register></registers>\
///      </peripheral></peripherals></device>",
///     &ExportConfig::new(),
/// )
/// .unwrap();
/// assert!(exported.warnings.is_empty());
/// assert_eq!(exported.units[0].name, "dev.rs");
/// assert!(exported.units[0].contents.contains("pub const UART0_ADDR: usize = 0x4000;"));
/// ```
pub fn generate(text: &str, config: &ExportConfig) -> Result<Exported> {
    export_validated(build_ir(text)?, config)
}

/// Runs the whole pipeline on the document at `path`.
pub fn generate_from_file(path: &Path, config: &ExportConfig) -> Result<Exported> {
    export_validated(build_ir_from_file(path)?, config)
}
