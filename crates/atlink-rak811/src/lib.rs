//! RAK811 LoRa module backend for atlink.
//!
//! This crate drives RAK811 modules running the v3 AT firmware
//! (`at+...` lowercase command set). It provides:
//!
//! - **Command builders and parsers** ([`commands`]) -- construct
//!   correctly-formatted commands for version, status, configuration,
//!   join, and send operations, and parse the corresponding responses.
//! - **Device driver** ([`device`]) -- [`Rak811`] with the full typed
//!   operation surface: version/status reads, EUI and key configuration,
//!   the join/leave state machine, and confirmed/unconfirmed uplinks with
//!   optional downlink wait.
//!
//! Success is signalled by lines starting `OK`; failures arrive as
//! `Error: <code>` and map through the model's error table.

pub mod commands;
pub mod device;

pub use commands::{Rak811Information, MODEL};
pub use device::Rak811;
