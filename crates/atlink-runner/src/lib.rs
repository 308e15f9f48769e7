//! Command/response correlation engine for AT-command modules.
//!
//! This crate owns the one genuinely hard problem in the library: matching
//! an unbounded, asynchronously arriving sequence of response lines to a
//! single in-flight command, deciding when enough has arrived to call the
//! exchange complete, timing out safely, and composing several exchanges
//! into one logical operation without leaving the port half-open.
//!
//! # Architecture
//!
//! - [`command`] — [`Command`], [`ExecutionOptions`], [`CommandResult`],
//!   and the [`Validation`] strategies
//! - [`runner`] — [`CommandRunner`]: incremental validation loop plus the
//!   scoped open/run/close wrappers
//! - [`validate`] — shared token helpers used by the dialect validators
//! - [`frame`] — the hex payload guard used by the Sigfox dialects

pub mod command;
pub mod frame;
pub mod runner;
pub mod validate;

pub use command::{Command, CommandResult, ExecutionOptions, Validation, DEFAULT_TIMEOUT};
pub use runner::{CommandRunner, ScopedFuture};
