//! Shared types passed between the host boundary and the adapter.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::core::params::Parameters;

/// How a single run ended.
///
/// Only [`RunOutcome::Completed`] counts as success at the host boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The model ran (or was dry-run) without error.
    Completed,
    /// The flags string was rejected before anything was executed.
    InvalidFlags,
    /// Setup or the external process failed, or the run was aborted.
    Failed,
}

impl RunOutcome {
    pub fn is_success(self) -> bool {
        self == RunOutcome::Completed
    }
}

/// Cooperative stop request shared between the host and a running model.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Everything the host supplies for one run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Root of the model code; holds the `R/` directory and input data.
    pub model_path: PathBuf,
    /// Directory the model writes its results to.
    pub output_path: PathBuf,
    /// Opaque run identifier, used for log correlation only.
    pub run_id: String,
    /// Shell-syntax options, e.g. `--inputdir=data --dryrun`.
    pub flags: String,
    pub parameters: Parameters,
    pub stop: StopSignal,
}
