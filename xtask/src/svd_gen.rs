// Licensed under the Apache-2.0 license

//! Generate tock-registers sources from an SVD file.

use crate::{AccessLevelArg, SvdGenArgs};
use anyhow::{Context, Result};
use registers_generator::config::{AccessLevel, Indentation, Layout};
use registers_generator::writer::write_atomic;
use registers_generator::{build_ir, build_ir_from_file, export, Destination, ExportConfig};
use std::io::Read;
use std::path::Path;

pub(crate) fn generate(args: &SvdGenArgs) -> Result<()> {
    let config = export_config(args)?;

    let validated = if args.input == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("reading SVD from stdin")?;
        build_ir(&text)?
    } else {
        log::info!("Generating registers from: {}", args.input.display());
        build_ir_from_file(&args.input)?
    };
    if !validated.warnings.is_empty() {
        log::info!("{} address overlap warning(s)", validated.warnings.len());
    }

    if let Some(path) = &args.dump_ir {
        let json = serde_json::to_string_pretty(&validated)?;
        write_atomic(path, &json)?;
    }

    let units = export(&validated.device, &config)?;
    destination(&args.output).write(units)?;
    Ok(())
}

/// Options from `--config`, overridden by any flags given.
fn export_config(args: &SvdGenArgs) -> Result<ExportConfig> {
    let mut config = match &args.config {
        Some(path) => ExportConfig::load(path)?,
        None => ExportConfig::new(),
    };

    if args.indent_using_tabs {
        config.indentation = Indentation::Tabs;
    } else if let Some(width) = args.indentation_width {
        config.indentation = Indentation::Spaces(width);
    }
    if let Some(level) = args.access_level {
        config.access_level = match level {
            AccessLevelArg::Pub => AccessLevel::Public,
            AccessLevelArg::Crate => AccessLevel::Crate,
            AccessLevelArg::Super => AccessLevel::Super,
            AccessLevelArg::Private => AccessLevel::Private,
        };
    }
    if !args.peripherals.is_empty() {
        config.selected_peripherals = args.peripherals.clone();
    }
    config.namespace_under_device |= args.namespace_under_device;
    config.instance_member_peripherals |= args.instance_member_peripherals;
    if let Some(name) = &args.device_name {
        config.override_device_name = Some(name.clone());
    }
    if args.per_peripheral {
        config.layout = Layout::PerPeripheral;
    }
    log::debug!("Export config: {config:?}");
    Ok(config)
}

fn destination(output: &Path) -> Destination {
    if output == Path::new("-") {
        Destination::Stdout
    } else if output.extension().is_some_and(|ext| ext == "rs") {
        Destination::File(output.to_path_buf())
    } else {
        Destination::Directory(output.to_path_buf())
    }
}
