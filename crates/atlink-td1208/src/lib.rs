//! Telecom Design TD1208 Sigfox backend for atlink.
//!
//! Hayes-style command set (`ati5`, `AT&V`, `AT$SF=`). Uplinks are
//! hex-encoded frames of at most 12 bytes, validated before any I/O;
//! downlink replies arrive inside a `+RX= ... +RX END` window.

pub mod commands;
pub mod device;

pub use commands::{Td1208Information, MODEL};
pub use device::Td1208;
