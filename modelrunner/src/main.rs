//! Command-line host for the R model adapter.
//!
//! Runs a single model run the way a scheduler would: parameters come from a
//! JSON file, options from a flags string, and the outcome is reported through
//! the exit code.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::warn;

use modelrunner::adapter::{ModelRunner, RModelRunner};
use modelrunner::core::flags::usage;
use modelrunner::core::params::Parameters;
use modelrunner::core::types::{RunRequest, StopSignal};
use modelrunner::exit_codes;
use modelrunner::io::config::{AdapterConfig, load_config};
use modelrunner::logging::{self, TracingLogger};

#[derive(Parser)]
#[command(
    name = "modelrunner",
    version,
    about = "Run an external R model for one scheduled run"
)]
struct Cli {
    /// Log debug output (overridden by `RUST_LOG`).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute one run; exits 0 on success, 1 on failure.
    Run(RunArgs),
    /// Print the options accepted by `run --flags`.
    Flags,
}

#[derive(Args)]
struct RunArgs {
    /// Root of the model code (contains the `R/` directory).
    #[arg(long)]
    model_path: PathBuf,

    /// Directory for the run's output files.
    #[arg(long)]
    output_path: PathBuf,

    /// Identifier used to correlate log lines.
    #[arg(long)]
    run_id: String,

    /// Shell-syntax run options, e.g. "--inputdir=data --dryrun".
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    flags: String,

    /// JSON object with the run parameters.
    #[arg(long)]
    params: Option<PathBuf>,

    /// TOML adapter configuration; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    logging::init(if cli.verbose { "debug" } else { "info" });
    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::SETUP
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Run(args) => cmd_run(args),
        Command::Flags => {
            println!("{}", usage().trim_end());
            Ok(exit_codes::OK)
        }
    }
}

fn cmd_run(args: RunArgs) -> Result<i32> {
    let config = match &args.config {
        Some(path) => load_config(path).context("load adapter config")?,
        None => AdapterConfig::default(),
    };
    let parameters = match &args.params {
        Some(path) => Parameters::load(path)?,
        None => Parameters::new(),
    };

    let stop = StopSignal::new();
    install_stop_handler(&stop);

    let request = RunRequest {
        model_path: args.model_path,
        output_path: args.output_path,
        run_id: args.run_id,
        flags: args.flags,
        parameters,
        stop,
    };
    let logger = TracingLogger::new(request.run_id.clone());
    let runner = RModelRunner::from_config(config);

    if runner.run_model(&request, &logger) {
        Ok(exit_codes::OK)
    } else {
        Ok(exit_codes::RUN_FAILED)
    }
}

/// Trip `stop` on Ctrl-C so a running R process is killed instead of orphaned.
fn install_stop_handler(stop: &StopSignal) {
    let handle = stop.clone();
    if let Err(err) = ctrlc::set_handler(move || handle.trigger()) {
        warn!(err = %err, "could not install Ctrl-C handler");
    }
}
