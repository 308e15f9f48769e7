//! atlink-test-harness: Test utilities for atlink.
//!
//! This crate provides [`MockPort`] for deterministic unit testing of the
//! command runner and the dialect drivers without requiring real module
//! hardware.

pub mod mock_port;

pub use mock_port::{MockPort, SentLog};
