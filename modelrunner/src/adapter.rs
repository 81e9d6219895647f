//! The model adapter: turns a host run request into one R execution.
//!
//! [`ModelRunner`] is the capability the host depends on. [`RModelRunner`]
//! implements it on top of any [`ModelExecutor`]. Every failure, including a
//! panic inside the executor, is reported through the [`RunLogger`] and
//! collapsed to `false` at the boundary.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use tracing::{debug, instrument};

use crate::core::flags::{Configuration, FlagsError, usage};
use crate::core::invocation::RInvocation;
use crate::core::types::{RunOutcome, RunRequest};
use crate::io::config::AdapterConfig;
use crate::io::executor::{ModelExecutor, RscriptExecutor};
use crate::logging::RunLogger;

const BANNER_WIDTH: usize = 60;

thread_local! {
    /// Location and backtrace of the last panic on this thread.
    static PANIC_TRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static PANIC_HOOK: Once = Once::new();

/// Capability offered to the host: run one model and report success.
pub trait ModelRunner {
    /// Run the model for `request`. Never panics and never returns an error;
    /// failures are logged through `logger` and reported as `false`.
    fn run_model(&self, request: &RunRequest, logger: &dyn RunLogger) -> bool;
}

/// Adapter that resolves paths from the flags string and delegates to an executor.
pub struct RModelRunner<E> {
    executor: E,
    r_dir: String,
}

impl RModelRunner<RscriptExecutor> {
    /// Adapter backed by a real `Rscript` process.
    pub fn from_config(config: AdapterConfig) -> Self {
        let r_dir = config.r_dir.clone();
        Self {
            executor: RscriptExecutor::new(config),
            r_dir,
        }
    }
}

impl<E: ModelExecutor> RModelRunner<E> {
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            r_dir: AdapterConfig::default().r_dir,
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Run the model and report how it ended.
    #[instrument(skip_all, fields(run_id = %request.run_id))]
    pub fn run(&self, request: &RunRequest, logger: &dyn RunLogger) -> RunOutcome {
        let config = match Configuration::parse(&request.flags) {
            Ok(config) => config,
            Err(err) => {
                report_invalid_flags(&err, logger);
                return RunOutcome::InvalidFlags;
            }
        };
        debug!(?config, "parsed flags");

        install_panic_trace_hook();
        PANIC_TRACE.with(|slot| slot.borrow_mut().take());
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.execute(request, &config, logger)
        }));
        match result {
            Ok(Ok(())) => RunOutcome::Completed,
            Ok(Err(err)) => {
                logger.warning(&format!(
                    "An error occurred executing the model:\n{err:?}"
                ));
                RunOutcome::Failed
            }
            Err(payload) => {
                let trace = PANIC_TRACE
                    .with(|slot| slot.borrow_mut().take())
                    .unwrap_or_else(|| "no trace captured".to_string());
                logger.warning(&format!(
                    "Run aborted:\n{}\n{trace}",
                    panic_message(payload.as_ref())
                ));
                RunOutcome::Failed
            }
        }
    }

    fn execute(
        &self,
        request: &RunRequest,
        config: &Configuration,
        logger: &dyn RunLogger,
    ) -> Result<()> {
        if request.stop.is_stopped() {
            bail!("run {} was stopped before it started", request.run_id);
        }

        let invocation = RInvocation::build(
            config,
            &request.model_path,
            &request.output_path,
            &self.r_dir,
        );
        let start = Instant::now();

        let rule = "=".repeat(BANNER_WIDTH);
        logger.fine(&rule);
        logger.fine(&format!("Executing run: {}", request.run_id));
        logger.fine(&format!(
            "Outputting temporary files to {}",
            request.output_path.display()
        ));
        logger.fine(&rule);

        self.executor
            .execute(&invocation, &request.parameters, &request.stop)
            .with_context(|| format!("execute run {}", request.run_id))?;

        let secs = start.elapsed().as_secs();
        logger.fine(&format!(
            "Run took {} min(s) {} second(s)",
            secs / 60,
            secs % 60
        ));
        Ok(())
    }
}

impl<E: ModelExecutor> ModelRunner for RModelRunner<E> {
    fn run_model(&self, request: &RunRequest, logger: &dyn RunLogger) -> bool {
        self.run(request, logger).is_success()
    }
}

fn report_invalid_flags(err: &FlagsError, logger: &dyn RunLogger) {
    match err {
        FlagsError::MissingInputDir | FlagsError::HelpRequested => {}
        FlagsError::Quoting(_) | FlagsError::Invalid(_) | FlagsError::InputDirEscapes(_) => {
            logger.warning(&err.to_string());
        }
    }
    logger.usage(&usage());
}

/// Chain a panic hook that records where a panic happened, so a caught
/// panic can be reported with its location and backtrace.
fn install_panic_trace_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let location = info
                .location()
                .map(|location| location.to_string())
                .unwrap_or_else(|| "unknown location".to_string());
            let trace = format!("at {location}\n{}", Backtrace::force_capture());
            PANIC_TRACE.with(|slot| *slot.borrow_mut() = Some(trace));
            previous(info);
        }));
    });
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
