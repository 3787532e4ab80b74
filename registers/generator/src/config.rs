// Licensed under the Apache-2.0 license

//! Configuration for code export.
//!
//! [`ExportConfig`] controls what is exported and how the generated source
//! looks. It can be built in code or loaded from a TOML file:
//!
//! ```toml
//! indentation = { spaces = 2 }
//! access-level = "crate"
//! selected-peripherals = ["TIM1", "GPIOA"]
//! namespace-under-device = true
//! layout = "per-peripheral"
//! ```

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Indentation unit of the generated source.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum Indentation {
    Tabs,
    Spaces(usize),
}

impl Default for Indentation {
    fn default() -> Self {
        Indentation::Spaces(4)
    }
}

impl Indentation {
    /// One level of indentation.
    pub fn unit(&self) -> String {
        match self {
            Indentation::Tabs => "\t".to_string(),
            Indentation::Spaces(n) => " ".repeat(*n),
        }
    }
}

/// Visibility of top-level generated items: peripheral modules and
/// instances. Items inside a peripheral module are always `pub`.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum AccessLevel {
    #[default]
    Public,
    Crate,
    Super,
    Private,
}

impl AccessLevel {
    /// The visibility keyword, including the trailing space. Empty for
    /// private items.
    pub fn keyword(&self) -> &'static str {
        match self {
            AccessLevel::Public => "pub ",
            AccessLevel::Crate => "pub(crate) ",
            AccessLevel::Super => "pub(super) ",
            AccessLevel::Private => "",
        }
    }
}

/// How the output is split into units.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum Layout {
    /// A single unit containing every peripheral.
    #[default]
    Combined,
    /// A `mod.rs` plus one unit per peripheral.
    PerPeripheral,
}

/// Options consumed by the exporter.
///
/// # Example
///
/// ```
/// use registers_generator::config::{AccessLevel, ExportConfig, Indentation};
///
/// let config = ExportConfig::new()
///     .indentation(Indentation::Tabs)
///     .access_level(AccessLevel::Crate)
///     .select_peripheral("TIM1")
///     .namespace_under_device(true);
/// assert_eq!(config.selected_peripherals, vec!["TIM1".to_string()]);
/// ```
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ExportConfig {
    pub indentation: Indentation,

    /// Visibility of peripheral modules and instances.
    pub access_level: AccessLevel,

    /// Peripherals to export, by IR name. Empty exports everything.
    pub selected_peripherals: Vec<String>,

    /// Make peripheral instances associated constants of a type named
    /// after the device.
    pub namespace_under_device: bool,

    /// With `namespace_under_device`, emit instances as fields of a device
    /// value instead of associated constants.
    pub instance_member_peripherals: bool,

    /// Name used for the device type and output file instead of the IR name.
    pub override_device_name: Option<String>,

    pub layout: Layout,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            indentation: Indentation::default(),
            access_level: AccessLevel::Public,
            selected_peripherals: Vec::new(),
            namespace_under_device: false,
            instance_member_peripherals: false,
            override_device_name: None,
            layout: Layout::default(),
        }
    }
}

impl ExportConfig {
    /// Create a config with default settings: four-space indentation, public
    /// items, every peripheral, free instance constants, a single unit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML text. Missing keys keep their defaults.
    pub fn from_toml(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load a config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn indentation(mut self, indentation: Indentation) -> Self {
        self.indentation = indentation;
        self
    }

    pub fn access_level(mut self, access_level: AccessLevel) -> Self {
        self.access_level = access_level;
        self
    }

    /// Add a peripheral to the allow-list.
    pub fn select_peripheral(mut self, name: &str) -> Self {
        self.selected_peripherals.push(name.to_string());
        self
    }

    pub fn namespace_under_device(mut self, namespace: bool) -> Self {
        self.namespace_under_device = namespace;
        self
    }

    pub fn instance_member_peripherals(mut self, members: bool) -> Self {
        self.instance_member_peripherals = members;
        self
    }

    pub fn device_name(mut self, name: &str) -> Self {
        self.override_device_name = Some(name.to_string());
        self
    }

    pub fn layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    /// Visibility keyword for generated items, possibly empty.
    pub fn visibility(&self) -> &'static str {
        self.access_level.keyword()
    }
}
