//! I/O helpers for the adapter: configuration, child processes and the R executor.

pub mod config;
pub mod executor;
pub mod process;
