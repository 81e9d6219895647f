//! Adapter configuration loaded from a TOML file.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

/// Adapter configuration (TOML).
///
/// Missing fields default to values suitable for long-running models.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AdapterConfig {
    /// Wall-clock limit for one R process, in seconds.
    pub timeout_secs: u64,

    /// Truncate captured stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,

    /// Directory under the model path that holds the R code.
    pub r_dir: String,

    /// Entry script inside `r_dir`.
    pub script: String,

    /// How often a running process is checked for stop requests.
    pub poll_interval_ms: u64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 24 * 60 * 60,
            output_limit_bytes: 1_000_000,
            r_dir: "R".to_string(),
            script: "model.R".to_string(),
            poll_interval_ms: 200,
        }
    }
}

impl AdapterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(anyhow!("timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.poll_interval_ms == 0 {
            return Err(anyhow!("poll_interval_ms must be > 0"));
        }
        if self.r_dir.trim().is_empty() {
            return Err(anyhow!("r_dir must be non-empty"));
        }
        if self.script.trim().is_empty() {
            return Err(anyhow!("script must be non-empty"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AdapterConfig::default()`.
pub fn load_config(path: &Path) -> Result<AdapterConfig> {
    if !path.exists() {
        let cfg = AdapterConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AdapterConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, AdapterConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("modelrunner.toml");
        fs::write(&path, "timeout_secs = 90\nscript = \"main.R\"\n").expect("write");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.timeout(), Duration::from_secs(90));
        assert_eq!(cfg.script, "main.R");
        assert_eq!(cfg.r_dir, "R");
        assert_eq!(cfg.output_limit_bytes, AdapterConfig::default().output_limit_bytes);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("modelrunner.toml");
        fs::write(&path, "timeout_secs = 0\n").expect("write");

        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("timeout_secs must be > 0"));
    }
}
