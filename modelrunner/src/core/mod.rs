//! Deterministic, pure logic for the adapter.
//!
//! Core modules must be free of I/O side effects, apart from
//! [`params::Parameters::load`] which reads a host parameter file.

pub mod flags;
pub mod invocation;
pub mod params;
pub mod types;
