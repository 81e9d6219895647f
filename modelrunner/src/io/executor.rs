//! Executor abstraction for running the model's R code.
//!
//! The [`ModelExecutor`] trait decouples the adapter from the actual backend
//! (an `Rscript` process). Tests use scripted executors that record calls
//! without spawning processes.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::core::invocation::RInvocation;
use crate::core::params::Parameters;
use crate::core::types::StopSignal;
use crate::io::config::AdapterConfig;
use crate::io::process::{CommandOutput, ProcessLimits, run_command};

/// File name of the parameter document written into the output directory.
pub const PARAM_FILE_NAME: &str = "parameters.json";
/// File name of the captured interpreter output.
pub const PROCESS_LOG_NAME: &str = "rscript.log";

const STDERR_TAIL_LINES: usize = 20;

/// Abstraction over model execution backends.
pub trait ModelExecutor {
    /// Run the model described by `invocation`. Returns an error on any failure.
    fn execute(
        &self,
        invocation: &RInvocation,
        parameters: &Parameters,
        stop: &StopSignal,
    ) -> Result<()>;
}

/// Executor that spawns the R interpreter.
#[derive(Debug, Clone)]
pub struct RscriptExecutor {
    config: AdapterConfig,
}

impl RscriptExecutor {
    pub fn new(config: AdapterConfig) -> Self {
        Self { config }
    }

    /// Build the interpreter command for `invocation`.
    pub fn build_command(&self, invocation: &RInvocation, param_file: &Path) -> Result<Command> {
        let (program, leading_args) = invocation.interpreter()?;
        let script = invocation.r_dir.join(&self.config.script);

        let mut cmd = Command::new(program);
        cmd.args(leading_args)
            .arg(&script)
            .arg(path_arg("--inputpath", &invocation.input_path))
            .arg(path_arg("--outputpath", &invocation.output_path))
            .arg(path_arg("--paramfile", param_file));
        if let Some(seed) = &invocation.seed {
            cmd.arg(format!("--seed={seed}"));
        }
        cmd.current_dir(&invocation.r_dir);
        Ok(cmd)
    }

    fn limits(&self) -> ProcessLimits {
        ProcessLimits {
            timeout: self.config.timeout(),
            output_limit_bytes: self.config.output_limit_bytes,
            poll_interval: self.config.poll_interval(),
        }
    }
}

impl ModelExecutor for RscriptExecutor {
    #[instrument(skip_all, fields(dry_run = invocation.dry_run, r_dir = %invocation.r_dir.display()))]
    fn execute(
        &self,
        invocation: &RInvocation,
        parameters: &Parameters,
        stop: &StopSignal,
    ) -> Result<()> {
        fs::create_dir_all(&invocation.output_path).with_context(|| {
            format!("create output dir {}", invocation.output_path.display())
        })?;
        let param_file = write_param_file(&invocation.output_path, parameters)?;
        let cmd = self.build_command(invocation, &param_file)?;

        if invocation.dry_run {
            info!(command = %command_line(&cmd), "dry run, not executing R");
            return Ok(());
        }
        if stop.is_stopped() {
            return Err(anyhow!("stop requested before starting R"));
        }

        info!(command = %command_line(&cmd), "starting R");
        let output = run_command(cmd, &self.limits(), stop).context("run R")?;

        let log_path = invocation.output_path.join(PROCESS_LOG_NAME);
        write_process_log(&log_path, &output, self.config.output_limit_bytes)?;

        if output.stopped {
            return Err(anyhow!("R was stopped on request"));
        }
        if output.timed_out {
            warn!(timeout_secs = self.config.timeout_secs, "R timed out");
            return Err(anyhow!("R timed out after {:?}", self.config.timeout()));
        }
        if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "R failed");
            return Err(anyhow!(
                "R failed with status {:?}; stderr tail:\n{}",
                output.status.code(),
                tail_lines(&String::from_utf8_lossy(&output.stderr), STDERR_TAIL_LINES)
            ));
        }

        debug!("R completed successfully");
        Ok(())
    }
}

fn path_arg(name: &str, path: &Path) -> String {
    format!("{name}={}", path.display())
}

/// Render a command as a shell-quoted line for logging.
pub fn command_line(cmd: &Command) -> String {
    let parts: Vec<String> = std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|part| part.to_string_lossy().into_owned())
        .collect();
    shlex::try_join(parts.iter().map(String::as_str)).unwrap_or_else(|_| parts.join(" "))
}

/// Write the parameter document the R code reads.
pub fn write_param_file(output_dir: &Path, parameters: &Parameters) -> Result<PathBuf> {
    let path = output_dir.join(PARAM_FILE_NAME);
    let mut payload = serde_json::to_string_pretty(parameters).context("serialize parameters")?;
    payload.push('\n');
    fs::write(&path, payload).with_context(|| format!("write {}", path.display()))?;
    debug!(path = %path.display(), count = parameters.len(), "wrote parameter file");
    Ok(path)
}

fn write_process_log(path: &Path, output: &CommandOutput, output_limit: usize) -> Result<()> {
    let mut buf = String::new();
    buf.push_str("=== stdout ===\n");
    buf.push_str(&String::from_utf8_lossy(&output.stdout));
    buf.push_str(&output.stdout_truncated_notice("rscript"));
    buf.push_str("\n=== stderr ===\n");
    buf.push_str(&String::from_utf8_lossy(&output.stderr));
    buf.push_str(&output.stderr_truncated_notice("rscript"));
    if output.timed_out {
        buf.push_str("\n[rscript timed out]\n");
    }
    if output.stopped {
        buf.push_str("\n[rscript stopped]\n");
    }

    if buf.len() > output_limit {
        let cut = floor_char_boundary(&buf, output_limit);
        let truncated = format!("{}\n[truncated {} bytes]\n", &buf[..cut], buf.len() - cut);
        fs::write(path, truncated)
            .with_context(|| format!("write process log {}", path.display()))?;
        return Ok(());
    }

    fs::write(path, buf).with_context(|| format!("write process log {}", path.display()))
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn tail_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::flags::Configuration;

    fn invocation(root: &Path, flags: &str) -> RInvocation {
        let config = Configuration::parse(flags).expect("flags");
        RInvocation::build(&config, root, &root.join("out"), "R")
    }

    fn args_of(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    #[cfg(unix)]
    #[test]
    fn command_carries_paths_and_seed() {
        let root = Path::new("/models/m");
        let executor = RscriptExecutor::new(AdapterConfig::default());
        let cmd = executor
            .build_command(
                &invocation(root, "--inputdir=data --seed=9 --rlocation='Rscript --vanilla'"),
                Path::new("/models/m/out/parameters.json"),
            )
            .expect("command");

        assert_eq!(cmd.get_program(), "Rscript");
        assert_eq!(
            args_of(&cmd),
            vec![
                "--vanilla",
                "/models/m/R/model.R",
                "--inputpath=/models/m/data",
                "--outputpath=/models/m/out",
                "--paramfile=/models/m/out/parameters.json",
                "--seed=9",
            ]
        );
        assert_eq!(cmd.get_current_dir(), Some(Path::new("/models/m/R")));
    }

    #[test]
    fn dry_run_writes_params_without_spawning() {
        let temp = tempfile::tempdir().expect("tempdir");
        let executor = RscriptExecutor::new(AdapterConfig::default());
        let invocation = invocation(
            temp.path(),
            "--inputdir=data --dryrun --rlocation=definitely-not-a-real-program-xyz",
        );
        let mut params = Parameters::new();
        params.insert("alpha", 2_i64);

        executor
            .execute(&invocation, &params, &StopSignal::new())
            .expect("dry run succeeds");

        let written = fs::read_to_string(temp.path().join("out").join(PARAM_FILE_NAME))
            .expect("param file");
        assert!(written.contains("\"alpha\": 2"));
        assert!(!temp.path().join("out").join(PROCESS_LOG_NAME).exists());
    }

    #[test]
    fn stop_before_start_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let executor = RscriptExecutor::new(AdapterConfig::default());
        let stop = StopSignal::new();
        stop.trigger();

        let err = executor
            .execute(
                &invocation(temp.path(), "--inputdir=data"),
                &Parameters::new(),
                &stop,
            )
            .unwrap_err();
        assert!(err.to_string().contains("stop requested"));
    }

    #[cfg(unix)]
    #[test]
    fn failing_script_reports_status_and_stderr() {
        let temp = tempfile::tempdir().expect("tempdir");
        let r_dir = temp.path().join("R");
        fs::create_dir_all(&r_dir).expect("r dir");
        fs::write(r_dir.join("model.R"), "echo boom >&2\nexit 4\n").expect("script");

        let executor = RscriptExecutor::new(AdapterConfig {
            poll_interval_ms: 20,
            ..AdapterConfig::default()
        });
        let err = executor
            .execute(
                &invocation(temp.path(), "--inputdir=data --rlocation=sh"),
                &Parameters::new(),
                &StopSignal::new(),
            )
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Some(4)"), "{message}");
        assert!(message.contains("boom"), "{message}");

        let log = fs::read_to_string(temp.path().join("out").join(PROCESS_LOG_NAME))
            .expect("process log");
        assert!(log.contains("=== stderr ===\nboom"));
    }

    #[cfg(unix)]
    #[test]
    fn process_log_truncates_on_char_boundary() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(PROCESS_LOG_NAME);
        let output = fake_output("ééééé".as_bytes().to_vec());

        write_process_log(&path, &output, 18).expect("write log");
        let log = fs::read_to_string(&path).expect("read log");
        assert!(log.contains("[truncated"));
    }

    #[test]
    fn tail_keeps_last_lines() {
        assert_eq!(tail_lines("a\nb\nc\nd", 2), "c\nd");
        assert_eq!(tail_lines("a", 5), "a");
    }

    #[test]
    fn command_line_quotes_spaces() {
        let mut cmd = Command::new("Rscript");
        cmd.arg("/models/my model/R/model.R");
        let line = command_line(&cmd);
        assert_eq!(
            shlex::split(&line),
            Some(vec![
                "Rscript".to_string(),
                "/models/my model/R/model.R".to_string()
            ])
        );
    }

    #[cfg(unix)]
    fn fake_output(stdout: Vec<u8>) -> CommandOutput {
        use std::os::unix::process::ExitStatusExt;
        CommandOutput {
            status: std::process::ExitStatus::from_raw(0),
            stdout,
            stderr: Vec::new(),
            stdout_truncated: 0,
            stderr_truncated: 0,
            timed_out: false,
            stopped: false,
        }
    }
}
