//! Construction of the external R invocation descriptor.

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow, bail};

use crate::core::flags::Configuration;

/// Describes one external R process without running it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RInvocation {
    /// Interpreter command, possibly with extra arguments (`Rscript --vanilla`).
    pub rlocation: String,
    /// Directory holding the model's R code; also the working directory.
    pub r_dir: PathBuf,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub seed: Option<String>,
    pub dry_run: bool,
}

impl RInvocation {
    pub fn build(
        config: &Configuration,
        model_path: &Path,
        output_path: &Path,
        r_dir_name: &str,
    ) -> Self {
        Self {
            rlocation: config.rlocation.trim().to_string(),
            r_dir: model_path.join(r_dir_name),
            input_path: resolve_input_path(model_path, &config.input_dir),
            output_path: output_path.to_path_buf(),
            seed: config.trimmed_seed().map(str::to_string),
            dry_run: config.dry_run,
        }
    }

    /// Split `rlocation` into program and leading arguments.
    pub fn interpreter(&self) -> Result<(String, Vec<String>)> {
        let mut tokens = shlex::split(&self.rlocation)
            .ok_or_else(|| anyhow!("unbalanced quoting in rlocation {:?}", self.rlocation))?;
        if tokens.is_empty() {
            bail!("rlocation is empty");
        }
        let program = tokens.remove(0);
        Ok((program, tokens))
    }
}

/// Join the trimmed `input_dir` onto `model_path`.
///
/// Leading separators are dropped, so `--inputdir=/data` still lands under
/// `model_path`. Parent components are rejected earlier by
/// [`Configuration::parse`].
pub fn resolve_input_path(model_path: &Path, input_dir: &str) -> PathBuf {
    let relative = input_dir.trim().trim_start_matches(['/', '\\']);
    model_path.join(relative)
}
