//! Stable exit codes for the `modelrunner` CLI.

/// The run completed (or the command succeeded).
pub const OK: i32 = 0;
/// The run failed: invalid flags, or the model raised an error.
pub const RUN_FAILED: i32 = 1;
/// The CLI could not set up the run (unreadable parameters or config).
pub const SETUP: i32 = 2;
