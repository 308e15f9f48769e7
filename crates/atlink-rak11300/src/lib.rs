//! RAK11300 LoRa module backend for atlink.
//!
//! This crate drives RAK11300 modules running the RUI AT firmware
//! (uppercase `AT+...` command set). Compared to the RAK811 v3 firmware
//! it exposes a richer surface: ABP session keys and device address,
//! auto-join control, an explicit reset, and event-driven join and
//! downlink notifications (`+EVT:JOINED`, `+EVT:RX_...`).
//!
//! Failures arrive as `+CME ERROR:<code>` lines and map through the
//! model's error table.

pub mod commands;
pub mod device;

pub use commands::{Rak11300Information, MODEL};
pub use device::Rak11300;
