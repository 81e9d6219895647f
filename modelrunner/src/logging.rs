//! Logging for the adapter.
//!
//! # Separation of Concerns
//!
//! - **[`init`]**: process-wide tracing subscriber, filtered by `RUST_LOG`,
//!   output to stderr. Installed once by the binary.
//!
//! - **[`RunLogger`]**: the per-run logging collaborator the host passes in.
//!   The adapter reports banners, timing and failures through it.
//!   [`TracingLogger`] forwards those lines to tracing.

use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG` env var. Falls back to `default_filter` if unset.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=modelrunner=debug modelrunner run --model-path . ...
/// ```
pub fn init(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}

/// Per-run logging collaborator supplied by the host.
pub trait RunLogger {
    /// Informational progress line.
    fn fine(&self, message: &str);
    /// Failure report, including the full error chain.
    fn warning(&self, message: &str);
    /// Usage text shown when the flags string is rejected.
    fn usage(&self, text: &str) {
        println!("{}", text.trim_end());
    }
}

/// [`RunLogger`] that forwards to `tracing`, tagged with the run id.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    run_id: String,
}

impl TracingLogger {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
        }
    }
}

impl RunLogger for TracingLogger {
    fn fine(&self, message: &str) {
        info!(run_id = %self.run_id, "{message}");
    }

    fn warning(&self, message: &str) {
        warn!(run_id = %self.run_id, "{message}");
    }
}
