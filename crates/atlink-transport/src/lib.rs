//! atlink-transport: Serial transport for AT-command modules.
//!
//! This crate provides [`SerialAtPort`], the hardware implementation of
//! the [`AtPort`](atlink_core::AtPort) trait for USB virtual COM ports
//! and physical UART connections to radio modules.

pub mod serial;

pub use serial::{available_ports, SerialAtPort, SerialConfig};
