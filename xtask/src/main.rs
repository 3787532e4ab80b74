// Licensed under the Apache-2.0 license

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::path::PathBuf;

mod svd_gen;

#[derive(Parser)]
#[command(author, version, about, long_about = None, name = "cargo xtask")]
struct Xtask {
    #[command(subcommand)]
    xtask: Commands,

    /// Log debug messages
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate tock-registers sources from an SVD file
    SvdGen(SvdGenArgs),
}

#[derive(clap::Args)]
pub(crate) struct SvdGenArgs {
    /// SVD file to read, or `-` for stdin
    #[arg(long, short)]
    input: PathBuf,

    /// Output directory, `.rs` file, or `-` for stdout
    #[arg(long, short, default_value = "-")]
    output: PathBuf,

    /// Only export these peripherals
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    peripherals: Vec<String>,

    /// Visibility of generated peripheral modules and instances
    #[arg(long, value_enum)]
    access_level: Option<AccessLevelArg>,

    /// Indent with tabs instead of spaces
    #[arg(long, default_value_t = false)]
    indent_using_tabs: bool,

    /// Number of spaces per indentation level
    #[arg(long)]
    indentation_width: Option<usize>,

    /// Make peripheral instances constants of a device type
    #[arg(long, default_value_t = false)]
    namespace_under_device: bool,

    /// Make peripheral instances fields of a device value
    #[arg(long, default_value_t = false)]
    instance_member_peripherals: bool,

    /// Name of the device type and output file
    #[arg(long)]
    device_name: Option<String>,

    /// Write a `mod.rs` plus one file per peripheral
    #[arg(long, default_value_t = false)]
    per_peripheral: bool,

    /// TOML file with export options; flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also write the validated register map as JSON
    #[arg(long)]
    dump_ir: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum AccessLevelArg {
    Pub,
    Crate,
    Super,
    Private,
}

fn main() {
    let cli = Xtask::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if let Err(err) = SimpleLogger::new().with_level(level).init() {
        eprintln!("Failed to initialize logging: {err}");
    }

    let result = match &cli.xtask {
        Commands::SvdGen(args) => svd_gen::generate(args),
    };
    result.unwrap_or_else(|e| {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    });
}
