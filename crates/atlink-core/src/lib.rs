//! atlink-core: Core traits, types, and error definitions for atlink.
//!
//! This crate defines the device-agnostic abstractions that all atlink
//! drivers build on. Applications depend on these types without pulling
//! in any specific module driver or serial backend.
//!
//! # Key types
//!
//! - [`AtPort`] -- line-oriented duplex channel to an attached module
//! - [`Error`] / [`Result`] -- error handling
//! - [`Downlink`] -- a decoded downlink frame shared by the LoRa dialects

pub mod error;
pub mod port;
pub mod types;

// Re-export key types at crate root for ergonomic `use atlink_core::*`.
pub use error::{Error, Result};
pub use port::AtPort;
pub use types::Downlink;
