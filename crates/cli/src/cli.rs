//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Log Replayer - step through planning-log analysis results on a timeline
#[derive(Parser, Debug)]
#[command(
    name = "log-replayer",
    author,
    version,
    about = "Replay planning-log analysis results on a synchronized timeline",
    long_about = "Uploads a planning log to the analysis service, loads the returned KPIs,\n\
                  issues and derived time series, and replays them on one timeline.\n\n\
                  Every cursor change resolves a scene (position, obstacles, latency,\n\
                  speed, curvature) that is dispatched to the configured sinks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "LOG_REPLAYER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "LOG_REPLAYER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload a log and replay its analysis result
    Replay(ReplayArgs),

    /// Print KPIs and issues for a log
    Inspect(InspectArgs),

    /// Fetch the textual report for a log
    Report(ReportArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),
}

/// Where analysis results come from
#[derive(Args, Debug, Clone, Default)]
pub struct ServiceArgs {
    /// Path to configuration file (TOML or JSON); `replayer.toml` is used if present
    #[arg(short, long, env = "LOG_REPLAYER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the analysis service base URL
    #[arg(long, env = "LOG_REPLAYER_SERVICE_URL")]
    pub service_url: Option<String>,

    /// Override the analysis service request timeout (seconds)
    #[arg(long, env = "LOG_REPLAYER_SERVICE_TIMEOUT")]
    pub service_timeout: Option<u64>,

    /// Serve a pre-computed result JSON instead of calling the service
    #[arg(long, value_name = "RESULT_JSON", conflicts_with = "service_url")]
    pub fixture: Option<PathBuf>,

    /// Report text served alongside `--fixture`
    #[arg(long, value_name = "REPORT_MD", requires = "fixture")]
    pub fixture_report: Option<PathBuf>,
}

/// Arguments for the `replay` command
#[derive(Parser, Debug, Clone)]
pub struct ReplayArgs {
    /// Planning log to upload (.json or .csv)
    pub log: PathBuf,

    #[command(flatten)]
    pub service: ServiceArgs,

    /// Play from the start to the end of range without prompting
    #[arg(long)]
    pub autoplay: bool,

    /// Seek here before playing (seconds)
    #[arg(long, allow_negative_numbers = true)]
    pub start: Option<f64>,

    /// Override cursor advance per tick (seconds)
    #[arg(long)]
    pub step: Option<f64>,

    /// Override tick period (milliseconds)
    #[arg(long)]
    pub tick_ms: Option<u64>,

    /// Override series snap tolerance (seconds)
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Override how the per-tick step is derived
    #[arg(long, value_enum)]
    pub mode: Option<PlaybackModeArg>,

    /// Timeline seconds per wall-clock second (wall-clock mode)
    #[arg(long)]
    pub rate: Option<f64>,

    /// Replay timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "LOG_REPLAYER_TIMEOUT")]
    pub timeout: u64,

    /// Channel buffer size for scene queues
    #[arg(long, default_value = "256", env = "LOG_REPLAYER_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "LOG_REPLAYER_METRICS_PORT")]
    pub metrics_port: u16,

    /// Skip the statistics summary at exit
    #[arg(long)]
    pub no_summary: bool,
}

/// Arguments for the `inspect` command
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Planning log to analyze (.json or .csv)
    pub log: PathBuf,

    #[command(flatten)]
    pub service: ServiceArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `report` command
#[derive(Parser, Debug)]
pub struct ReportArgs {
    /// Planning log to report on (.json or .csv)
    pub log: PathBuf,

    #[command(flatten)]
    pub service: ServiceArgs,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "replayer.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
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

/// Playback step policy
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum PlaybackModeArg {
    /// Constant step per tick
    FixedStep,
    /// Step scaled by elapsed wall-clock time
    WallClock,
}

impl From<PlaybackModeArg> for contracts::PlaybackMode {
    fn from(mode: PlaybackModeArg) -> Self {
        match mode {
            PlaybackModeArg::FixedStep => Self::FixedStep,
            PlaybackModeArg::WallClock => Self::WallClock,
        }
    }
}
