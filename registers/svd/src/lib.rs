// Licensed under the Apache-2.0 license

//! Reader for CMSIS-SVD style hardware register descriptions.
//!
//! The document is decoded into a [`model::Device`] tree that mirrors the
//! source format, then [`inflate`] resolves every `derivedFrom` reference.
//!
//! ```
//! let device = registers_svd::parse(
//!     "<device><name>DEV</name><peripherals>\
//!        <peripheral><name>UART0</name><baseAddress>0x4000</baseAddress></peripheral>\
//!        <peripheral derivedFrom=\"UART0\"><name>UART1</name><baseAddress>0x5000</baseAddress></peripheral>\
//!      </peripherals></device>",
//! )
//! .unwrap();
//! assert_eq!(device.peripherals[1].derived_from, None);
//! ```

pub mod decode;
pub mod error;
pub mod inflate;
pub mod model;
pub mod value;

pub use decode::decode_document;
pub use error::{DecodeError, Location, ReferenceError};
pub use inflate::inflate;
pub use model::Device;

/// Any failure while reading a document.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Reference(#[from] ReferenceError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Decodes `text` and resolves all inheritance.
pub fn parse(text: &str) -> Result<Device> {
    let raw = decode_document(text)?;
    Ok(inflate(&raw)?)
}
