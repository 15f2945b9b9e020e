//! CLI argument definitions for the GMNS readiness validator.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "gmns-validate",
    version,
    about = "GMNS network readiness validator",
    long_about = "Check a GMNS network (node, link and demand CSV files) for readiness\n\
                  to run traffic assignment.\n\n\
                  Levels are cumulative: 1 structure, 2 demand and zones, 3 network\n\
                  attributes, 4 configuration, 5 ODME inputs, 6 accessibility,\n\
                  7 assignment fit, 8 post-OD assignment."
)]
pub struct Cli {
    /// Directory holding the network files.
    #[arg(value_name = "WORKING_DIR", default_value = ".")]
    pub working_dir: PathBuf,

    /// Highest readiness level to validate.
    #[arg(long = "level", default_value_t = 7, value_parser = clap::value_parser!(u8).range(1..=8))]
    pub level: u8,

    /// Node file (overrides discovery).
    #[arg(long = "node", value_name = "PATH")]
    pub node: Option<PathBuf>,

    /// Link file (overrides discovery).
    #[arg(long = "link", value_name = "PATH")]
    pub link: Option<PathBuf>,

    /// Demand file (overrides discovery).
    #[arg(long = "demand", value_name = "PATH")]
    pub demand: Option<PathBuf>,

    /// Assignment engine executable launched for level 6 and above.
    #[arg(long = "engine", value_name = "PROGRAM")]
    pub engine: Option<String>,

    /// Argument passed to the engine executable (repeatable).
    #[arg(long = "engine-arg", value_name = "ARG", requires = "engine", allow_hyphen_values = true)]
    pub engine_args: Vec<String>,

    /// Do not launch the engine for the accessibility level.
    #[arg(long = "no-accessibility")]
    pub no_accessibility: bool,

    /// Seconds to wait for engine output files.
    #[arg(long = "timeout-secs", value_name = "SECS", default_value_t = 120)]
    pub timeout_secs: u64,

    /// Milliseconds between checks for engine output files.
    #[arg(long = "poll-interval-ms", value_name = "MS", default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Where to write the JSON report (default: <WORKING_DIR>/validation_report.json).
    #[arg(long = "report", value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Skip writing diagnostic CSV exports.
    #[arg(long = "no-exports")]
    pub no_exports: bool,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(long = "log-format", value_enum, default_value = "pretty")]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["gmns-validate"]).unwrap();
        assert_eq!(cli.working_dir, PathBuf::from("."));
        assert_eq!(cli.level, 7);
        assert_eq!(cli.timeout_secs, 120);
        assert!(cli.engine.is_none());
    }

    #[test]
    fn test_level_range() {
        assert!(Cli::try_parse_from(["gmns-validate", "--level", "8"]).is_ok());
        assert!(Cli::try_parse_from(["gmns-validate", "--level", "0"]).is_err());
        assert!(Cli::try_parse_from(["gmns-validate", "--level", "9"]).is_err());
    }

    #[test]
    fn test_engine_args_repeat() {
        let cli = Cli::try_parse_from([
            "gmns-validate",
            "net",
            "--engine",
            "DTALite",
            "--engine-arg",
            "--quiet",
            "--engine-arg",
            "2",
        ])
        .unwrap();
        assert_eq!(cli.engine.as_deref(), Some("DTALite"));
        assert_eq!(cli.engine_args, vec!["--quiet", "2"]);
    }
}
