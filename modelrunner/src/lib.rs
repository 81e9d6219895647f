//! Adapter that runs an external R model on behalf of a host scheduler.
//!
//! The host hands over a model path, an output path, a run id, a flags string
//! and a parameter map. The adapter turns that into one `Rscript` process and
//! reports a single success flag back. The crate is split the usual way:
//!
//! - **[`core`]**: Pure logic (flag parsing, parameter normalization,
//!   invocation building). No process or filesystem side effects.
//! - **[`io`]**: Side-effecting operations (config files, child processes,
//!   the R executor). Isolated behind [`io::executor::ModelExecutor`] so the
//!   adapter can be tested without R installed.
//!
//! [`adapter`] ties the two together and owns the success/failure contract.

pub mod adapter;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
