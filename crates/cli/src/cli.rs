//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// twitstream - fan a live status feed out to worker pools
#[derive(Parser, Debug)]
#[command(
    name = "twitstream",
    author,
    version,
    about = "Status stream dispatch pipeline",
    long_about = "Consumes a status feed, filters it against a subscription and fans \n\
                  every status out to writer, mirror and media download worker pools."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "TWITSTREAM_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "TWITSTREAM_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the dispatch pipeline
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "stream.toml", env = "TWITSTREAM_CONFIG")]
    pub config: PathBuf,

    /// Log the actions workers would take without performing them
    #[arg(long, env = "TWITSTREAM_DRY_RUN")]
    pub dry_run: bool,

    /// Override the pool size of every worker kind
    #[arg(long, env = "TWITSTREAM_WORKERS")]
    pub workers: Option<usize>,

    /// Replay statuses from an NDJSON file instead of the configured feed
    #[arg(long, env = "TWITSTREAM_REPLAY", conflicts_with = "stdin")]
    pub replay: Option<PathBuf>,

    /// Read statuses as NDJSON from stdin
    #[arg(long)]
    pub stdin: bool,

    /// Replace the followed user ids (comma separated)
    #[arg(long, value_delimiter = ',', env = "TWITSTREAM_FOLLOW")]
    pub follow: Option<Vec<u64>>,

    /// Replace the tracked terms (comma separated)
    #[arg(long, value_delimiter = ',', env = "TWITSTREAM_TRACK")]
    pub track: Option<Vec<String>>,

    /// Stop after this many statuses were dispatched (0 = unlimited)
    #[arg(long, env = "TWITSTREAM_MAX_STATUSES")]
    pub max_statuses: Option<u64>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "TWITSTREAM_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "stream.toml", env = "TWITSTREAM_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "stream.toml", env = "TWITSTREAM_CONFIG")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show per-pool worker settings
    #[arg(long)]
    pub workers: bool,

    /// Show each pool's validation chain
    #[arg(long)]
    pub filters: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_overrides() {
        let cli = Cli::try_parse_from([
            "twitstream",
            "-v",
            "run",
            "-c",
            "s.toml",
            "--workers",
            "3",
            "--follow",
            "1,2",
            "--track",
            "rust,tokio",
            "--dry-run",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.config, PathBuf::from("s.toml"));
        assert_eq!(args.workers, Some(3));
        assert_eq!(args.follow, Some(vec![1, 2]));
        assert_eq!(args.track, Some(vec!["rust".into(), "tokio".into()]));
        assert!(args.dry_run);
    }

    #[test]
    fn test_replay_conflicts_with_stdin() {
        let err = Cli::try_parse_from(["twitstream", "run", "--replay", "a.ndjson", "--stdin"]);
        assert!(err.is_err());
    }

    #[test]
    fn test_info_flags() {
        let cli =
            Cli::try_parse_from(["twitstream", "info", "--workers", "--filters", "--json"]).unwrap();
        let Commands::Info(args) = cli.command else {
            panic!("expected info");
        };
        assert!(args.workers && args.filters && args.json);
    }
}
