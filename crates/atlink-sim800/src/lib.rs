//! Driver for the SIM800 GSM modem.

pub mod commands;
pub mod device;

pub use commands::MODEL;
pub use device::Sim800;
