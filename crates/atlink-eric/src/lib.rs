//! Driver for the ERIC Sigfox radio module.
//!
//! ERIC answers every identity probe with a single bare line, so version
//! and information are aggregated from several probes. Uplinks go out
//! with `AT$SF=<frame>,0`; appending `,1` instead opens a downlink
//! window that completes on the `rx=` line.

pub mod commands;
pub mod device;

pub use commands::{EricInformation, MODEL};
pub use device::Eric;
