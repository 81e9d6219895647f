//! Parsing of the per-run flags string into a [`Configuration`].
//!
//! The host hands the adapter a single shell-syntax string (for example
//! `--inputdir=data --dryrun`). It is split with shell quoting rules and then
//! parsed by a clap parser that never sees a binary name.

use std::path::{Component, Path};

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use thiserror::Error;

/// Interpreter used when `--rlocation` is not given.
pub const DEFAULT_RLOCATION: &str = "Rscript";

#[derive(Debug, Parser)]
#[command(
    name = "flags",
    no_binary_name = true,
    disable_version_flag = true,
    about = "Per-run options for the R model adapter"
)]
struct FlagArgs {
    /// If set, R code won't be executed.
    #[arg(short = 'd', long = "dryrun")]
    dryrun: bool,

    /// Relative path for input data, resolved against the model path
    /// (conventionally `input_data`).
    #[arg(long = "inputdir", value_name = "DIR")]
    inputdir: Option<String>,

    /// Command to run Rscript. May include extra interpreter arguments.
    #[arg(long = "rlocation", value_name = "CMD", default_value = DEFAULT_RLOCATION)]
    rlocation: String,

    /// Random number seed, forwarded to the model untouched.
    #[arg(long = "seed", value_name = "SEED")]
    seed: Option<String>,
}

/// Reasons a flags string cannot become a [`Configuration`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlagsError {
    #[error("unbalanced quoting in flags {0:?}")]
    Quoting(String),
    #[error("invalid flags: {0}")]
    Invalid(String),
    #[error("help requested")]
    HelpRequested,
    #[error("--inputdir must name a non-empty directory")]
    MissingInputDir,
    #[error("--inputdir {0:?} must not contain '..'")]
    InputDirEscapes(String),
}

/// Validated per-run options.
///
/// `input_dir` and `rlocation` are kept exactly as given; callers trim them
/// when building paths and commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub dry_run: bool,
    pub input_dir: String,
    pub rlocation: String,
    pub seed: Option<String>,
}

impl Configuration {
    /// Split `flags` with shell rules and parse the options.
    pub fn parse(flags: &str) -> Result<Self, FlagsError> {
        let tokens = shlex::split(flags).ok_or_else(|| FlagsError::Quoting(flags.to_string()))?;
        let args = FlagArgs::try_parse_from(tokens).map_err(|err| match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                FlagsError::HelpRequested
            }
            _ => FlagsError::Invalid(first_line(&err.to_string())),
        })?;

        let input_dir = match args.inputdir {
            Some(dir) if !dir.trim().is_empty() => dir,
            _ => return Err(FlagsError::MissingInputDir),
        };
        if Path::new(input_dir.trim())
            .components()
            .any(|component| component == Component::ParentDir)
        {
            return Err(FlagsError::InputDirEscapes(input_dir));
        }

        Ok(Self {
            dry_run: args.dryrun,
            input_dir,
            rlocation: args.rlocation,
            seed: args.seed,
        })
    }

    /// Seed with surrounding whitespace removed; a blank seed counts as unset.
    pub fn trimmed_seed(&self) -> Option<&str> {
        self.seed
            .as_deref()
            .map(str::trim)
            .filter(|seed| !seed.is_empty())
    }
}

/// Help text describing every accepted flag.
pub fn usage() -> String {
    FlagArgs::command().render_help().to_string()
}

fn first_line(message: &str) -> String {
    message
        .lines()
        .next()
        .unwrap_or_default()
        .trim_start_matches("error: ")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_inputdir_and_dryrun() {
        let config = Configuration::parse("--inputdir=data --dryrun").expect("parse");
        assert!(config.dry_run);
        assert_eq!(config.input_dir, "data");
        assert_eq!(config.rlocation, DEFAULT_RLOCATION);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn accepts_short_dryrun_and_separate_values() {
        let config = Configuration::parse("-d --inputdir data --seed 42 --rlocation /opt/R/bin/Rscript")
            .expect("parse");
        assert!(config.dry_run);
        assert_eq!(config.input_dir, "data");
        assert_eq!(config.seed.as_deref(), Some("42"));
        assert_eq!(config.rlocation, "/opt/R/bin/Rscript");
    }

    #[test]
    fn quoted_values_keep_spaces() {
        let config = Configuration::parse(r#"--inputdir "my inputs" --rlocation 'Rscript --vanilla'"#)
            .expect("parse");
        assert_eq!(config.input_dir, "my inputs");
        assert_eq!(config.rlocation, "Rscript --vanilla");
    }

    #[test]
    fn empty_flags_are_missing_inputdir() {
        assert_eq!(
            Configuration::parse(""),
            Err(FlagsError::MissingInputDir)
        );
        assert_eq!(
            Configuration::parse("--dryrun --seed=3"),
            Err(FlagsError::MissingInputDir)
        );
    }

    #[test]
    fn blank_inputdir_is_missing() {
        assert_eq!(
            Configuration::parse("--inputdir='   '"),
            Err(FlagsError::MissingInputDir)
        );
    }

    #[test]
    fn parent_components_in_inputdir_are_rejected() {
        for flags in ["--inputdir=../x", "--inputdir=data/../../x", "--inputdir=' ..'"] {
            assert!(
                matches!(Configuration::parse(flags), Err(FlagsError::InputDirEscapes(_))),
                "flags {flags:?}"
            );
        }
        assert!(Configuration::parse("--inputdir=data..v2").is_ok());
    }

    #[test]
    fn unknown_flag_is_invalid() {
        let err = Configuration::parse("--inputdir=data --bogus").unwrap_err();
        assert!(matches!(err, FlagsError::Invalid(ref msg) if msg.contains("--bogus")));
    }

    #[test]
    fn positional_argument_is_invalid() {
        let err = Configuration::parse("--inputdir=data stray").unwrap_err();
        assert!(matches!(err, FlagsError::Invalid(_)));
    }

    #[test]
    fn unbalanced_quote_is_reported() {
        let err = Configuration::parse("--inputdir='data").unwrap_err();
        assert!(matches!(err, FlagsError::Quoting(_)));
    }

    #[test]
    fn help_flag_is_recognised() {
        assert_eq!(Configuration::parse("--help"), Err(FlagsError::HelpRequested));
    }

    #[test]
    fn blank_seed_counts_as_unset() {
        let config = Configuration::parse("--inputdir=data --seed=' '").expect("parse");
        assert_eq!(config.trimmed_seed(), None);
        let config = Configuration::parse("--inputdir=data --seed=' 7 '").expect("parse");
        assert_eq!(config.trimmed_seed(), Some("7"));
    }

    #[test]
    fn usage_lists_every_flag() {
        let text = usage();
        for flag in ["--dryrun", "--inputdir", "--rlocation", "--seed", "input_data"] {
            assert!(text.contains(flag), "usage missing {flag}: {text}");
        }
    }
}
