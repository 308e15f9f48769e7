//! # atlink -- Async AT-Command Drivers for Radio Modules
//!
//! `atlink` is an asynchronous Rust library for talking to LoRa, Sigfox,
//! and GSM radio modules over their AT-command serial interfaces. It is
//! built for embedded gateways and field tooling where a host application
//! drives a module on a serial line: join a LoRaWAN network, push an
//! uplink frame, collect the downlink, read out device identity.
//!
//! ## Quick Start
//!
//! Add `atlink` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! atlink = { version = "0.1", features = ["rak811"] }
//! tokio = { version = "1", features = ["full"] }
//! ```
//!
//! Join the network and send a frame:
//!
//! ```no_run
//! use atlink::rak811::Rak811;
//! use atlink::transport::SerialAtPort;
//!
//! #[tokio::main]
//! async fn main() -> atlink::Result<()> {
//!     let port = SerialAtPort::new("/dev/ttyUSB0", 115_200);
//!     let mut device = Rak811::new(port);
//!
//!     println!("firmware: {}", device.get_version().await?);
//!     device.join().await?;
//!     device.send_unconfirmed_data(1, &[0xCA, 0xFE]).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized as a workspace of focused crates:
//!
//! | Crate                 | Purpose                                         |
//! |-----------------------|-------------------------------------------------|
//! | `atlink-core`         | The [`AtPort`] trait, error taxonomy, shared types |
//! | `atlink-runner`       | [`CommandRunner`]: incremental response validation |
//! | `atlink-transport`    | Serial port implementation of [`AtPort`]        |
//! | `atlink-rak811`       | RAK811 LoRaWAN driver                           |
//! | `atlink-rak11300`     | RAK11300 LoRaWAN driver                         |
//! | `atlink-td1208`       | TD1208 Sigfox driver                            |
//! | `atlink-eric`         | ERIC Sigfox driver                              |
//! | `atlink-sim800`       | SIM800 GSM driver                               |
//! | `atlink-test-harness` | `MockPort`, the scripted port for driver tests  |
//! | **`atlink`**          | This facade crate -- re-exports everything      |
//!
//! Every driver speaks to its module through the [`AtPort`] trait, so the
//! serial transport can be swapped for a mock in tests without touching
//! driver code.
//!
//! ## Feature Flags
//!
//! Each module backend is gated behind a feature flag, all enabled by
//! default:
//!
//! | Feature    | Enables                                  |
//! |------------|------------------------------------------|
//! | `rak811`   | [`rak811`] module (RAK811 LoRaWAN)       |
//! | `rak11300` | [`rak11300`] module (RAK11300 LoRaWAN)   |
//! | `td1208`   | [`td1208`] module (TD1208 Sigfox)        |
//! | `eric`     | [`eric`] module (ERIC Sigfox)            |
//! | `sim800`   | [`sim800`] module (SIM800 GSM)           |
//!
//! ## The Command Runner
//!
//! All drivers sit on top of [`CommandRunner`], which owns the hard part
//! of an AT dialect: response lines arrive asynchronously and unframed,
//! and only a dialect-specific [`Validation`] can tell whether the answer
//! so far is complete, still partial, or an error. The runner re-validates
//! the accumulated lines after every arriving line, raises device errors
//! as soon as an error token lands, and returns a [`Error::Timeout`]
//! carrying the partial answer when the window expires.

pub use atlink_core::*;
pub use atlink_runner::{
    Command, CommandResult, CommandRunner, ExecutionOptions, ScopedFuture, Validation,
    DEFAULT_TIMEOUT,
};

/// Serial transport backend.
///
/// Provides [`SerialAtPort`](transport::SerialAtPort), the production
/// implementation of [`AtPort`] over a local serial device.
pub mod transport {
    pub use atlink_transport::*;
}

/// RAK811 LoRaWAN backend.
///
/// Provides [`Rak811`](rak811::Rak811): join and leave management,
/// confirmed and unconfirmed uplinks, downlink reception, and the parsed
/// 25-line device status dump.
#[cfg(feature = "rak811")]
pub mod rak811 {
    pub use atlink_rak811::*;
}

/// RAK11300 LoRaWAN backend.
///
/// Provides [`Rak11300`](rak11300::Rak11300) for the RUI3-style dialect:
/// `+EVT:` asynchronous events, `+cme error` codes, and the labelled
/// `AT+STATUS=?` device report.
#[cfg(feature = "rak11300")]
pub mod rak11300 {
    pub use atlink_rak11300::*;
}

/// TD1208 Sigfox backend.
///
/// Provides [`Td1208`](td1208::Td1208): `AT$SF` uplinks with an optional
/// downlink window and identity parsed from the `AT&V` register dump.
#[cfg(feature = "td1208")]
pub mod td1208 {
    pub use atlink_td1208::*;
}

/// ERIC Sigfox backend.
///
/// Provides [`Eric`](eric::Eric), which aggregates the one-line `AT$I`
/// identity probes and derives the radio region from the configured
/// frequency.
#[cfg(feature = "eric")]
pub mod eric {
    pub use atlink_eric::*;
}

/// SIM800 GSM backend.
///
/// Provides [`Sim800`](sim800::Sim800) with a network diagnostics sweep
/// covering SIM state, registration, signal quality, and GPRS attach.
#[cfg(feature = "sim800")]
pub mod sim800 {
    pub use atlink_sim800::*;
}
