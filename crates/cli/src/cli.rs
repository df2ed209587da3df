//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// walksense - automatic walking-session recording
#[derive(Parser, Debug)]
#[command(
    name = "walksense",
    author,
    version,
    about = "Walking-session detection, chunked recording and reassembly",
    long_about = "Detects walking from activity classifications, records fused \n\
                  orientation/location samples in fixed-size chunks, and rebuilds \n\
                  recorded sessions from their chunk keys."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "WALKSENSE_VERBOSE")]
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
        env = "WALKSENSE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Drive a scripted walk through detection, recording and reassembly
    Simulate(SimulateArgs),

    /// Validate configuration file
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),

    /// Rebuild a stored session from its chunk keys
    Reassemble(ReassembleArgs),
}

/// Arguments for the `simulate` command
#[derive(Parser, Debug, Clone)]
pub struct SimulateArgs {
    /// Path to configuration file (TOML or JSON); defaults apply when absent
    #[arg(short, long, env = "WALKSENSE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Seconds of standing still before the walk
    #[arg(long, default_value = "10")]
    pub idle_before: u64,

    /// Seconds of walking
    #[arg(long, default_value = "180")]
    pub walk: u64,

    /// Seconds of standing still after the walk
    #[arg(long, default_value = "90")]
    pub idle_after: u64,

    /// Override detection dwell time (seconds)
    #[arg(long, env = "WALKSENSE_THRESHOLD_SECS")]
    pub threshold_secs: Option<u32>,

    /// Override chunk flush threshold (samples)
    #[arg(long, env = "WALKSENSE_FLUSH_THRESHOLD")]
    pub flush_threshold: Option<usize>,

    /// Write chunks and records under this directory instead of memory
    #[arg(long, env = "WALKSENSE_STORE_DIR")]
    pub store_dir: Option<PathBuf>,

    /// Walking speed (metres per second)
    #[arg(long, default_value = "1.4")]
    pub speed: f64,

    /// Start with location permission denied
    #[arg(long)]
    pub deny_location: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "WALKSENSE_METRICS_PORT")]
    pub metrics_port: u16,

    /// Print session summaries as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "walksense.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "walksense.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Print the effective configuration as TOML, defaults filled in
    #[arg(long, conflicts_with = "json")]
    pub effective: bool,
}

/// Arguments for the `reassemble` command
#[derive(Parser, Debug)]
pub struct ReassembleArgs {
    /// Directory holding `<key>.json` chunk files
    #[arg(long, env = "WALKSENSE_STORE_DIR")]
    pub store: PathBuf,

    /// Chunk keys in session order; all chunks in the store when empty
    pub keys: Vec<String>,

    /// Read chunk keys from a session record file
    #[arg(long, conflicts_with = "keys")]
    pub record: Option<PathBuf>,

    /// Per-chunk fetch timeout (milliseconds)
    #[arg(long, default_value = "15000")]
    pub timeout_ms: u64,

    /// Nominal sample rate used for distance sampling (Hz)
    #[arg(long, default_value = "50")]
    pub sample_rate: f64,

    /// Output summary as JSON
    #[arg(long)]
    pub json: bool,
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
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simulate_defaults() {
        let cli = Cli::try_parse_from(["walksense", "simulate"]).unwrap();
        let Commands::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.walk, 180);
        assert_eq!(args.idle_after, 90);
        assert!(args.config.is_none());
        assert_eq!(args.metrics_port, 0);
    }

    #[test]
    fn test_parse_reassemble_keys() {
        let cli =
            Cli::try_parse_from(["walksense", "reassemble", "--store", "/tmp/s", "a", "b"]).unwrap();
        let Commands::Reassemble(args) = cli.command else {
            panic!("expected reassemble");
        };
        assert_eq!(args.keys, vec!["a", "b"]);
        assert_eq!(args.timeout_ms, 15_000);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["walksense", "-q", "-v", "info"]).is_err());
    }
}
