//! Test-only helpers: a recording logger, a scripted executor and a
//! throwaway model directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;

use crate::core::invocation::RInvocation;
use crate::core::params::Parameters;
use crate::core::types::{RunRequest, StopSignal};
use crate::io::executor::ModelExecutor;
use crate::logging::RunLogger;

/// [`RunLogger`] that keeps every line in memory.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    fine: Mutex<Vec<String>>,
    warning: Mutex<Vec<String>>,
    usage: Mutex<Vec<String>>,
}

impl RecordingLogger {
    pub fn fines(&self) -> Vec<String> {
        snapshot(&self.fine)
    }

    pub fn warnings(&self) -> Vec<String> {
        snapshot(&self.warning)
    }

    pub fn usages(&self) -> Vec<String> {
        snapshot(&self.usage)
    }
}

impl RunLogger for RecordingLogger {
    fn fine(&self, message: &str) {
        push(&self.fine, message);
    }

    fn warning(&self, message: &str) {
        push(&self.warning, message);
    }

    fn usage(&self, text: &str) {
        push(&self.usage, text);
    }
}

fn push(lines: &Mutex<Vec<String>>, line: &str) {
    lines
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .push(line.to_string());
}

fn snapshot(lines: &Mutex<Vec<String>>) -> Vec<String> {
    lines
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

/// One recorded [`ModelExecutor::execute`] call.
#[derive(Debug, Clone)]
pub struct ExecCall {
    pub invocation: RInvocation,
    pub parameters: Parameters,
}

#[derive(Debug, Clone)]
enum Script {
    Succeed,
    Fail(String),
    Panic(String),
}

/// Executor that records calls and then behaves as scripted.
#[derive(Debug)]
pub struct ScriptedExecutor {
    script: Script,
    calls: Mutex<Vec<ExecCall>>,
}

impl ScriptedExecutor {
    fn with_script(script: Script) -> Self {
        Self {
            script,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn succeeding() -> Self {
        Self::with_script(Script::Succeed)
    }

    pub fn failing(message: &str) -> Self {
        Self::with_script(Script::Fail(message.to_string()))
    }

    pub fn panicking(message: &str) -> Self {
        Self::with_script(Script::Panic(message.to_string()))
    }

    pub fn calls(&self) -> Vec<ExecCall> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl ModelExecutor for ScriptedExecutor {
    fn execute(
        &self,
        invocation: &RInvocation,
        parameters: &Parameters,
        _stop: &StopSignal,
    ) -> Result<()> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(ExecCall {
                invocation: invocation.clone(),
                parameters: parameters.clone(),
            });
        match &self.script {
            Script::Succeed => Ok(()),
            Script::Fail(message) => Err(anyhow!("{message}")),
            Script::Panic(message) => panic!("{message}"),
        }
    }
}

/// Build a request with run id `run-1` and output under `<model_path>/out`.
pub fn request(model_path: impl Into<PathBuf>, flags: &str) -> RunRequest {
    let model_path = model_path.into();
    RunRequest {
        output_path: model_path.join("out"),
        model_path,
        run_id: "run-1".to_string(),
        flags: flags.to_string(),
        parameters: Parameters::new(),
        stop: StopSignal::new(),
    }
}

/// Temporary model directory with an `R/` code dir and an input dir.
pub struct TestModel {
    temp: TempDir,
}

impl TestModel {
    /// Create `R/` and `input_data/` under a fresh temp dir.
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir().context("create temp model dir")?;
        fs::create_dir_all(temp.path().join("R")).context("create R dir")?;
        fs::create_dir_all(temp.path().join("input_data")).context("create input dir")?;
        Ok(Self { temp })
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn output_path(&self) -> PathBuf {
        self.path().join("out")
    }

    /// Write `R/<name>` with the given contents.
    pub fn write_script(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.path().join("R").join(name);
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    pub fn request(&self, flags: &str) -> RunRequest {
        request(self.path(), flags)
    }
}
