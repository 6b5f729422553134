//! CLI argument parsing for irqmon

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// How per-line activity is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportMode {
    /// Elapsed time and average time between events (default)
    Interval,
    /// Events per second
    Rate,
}

/// Output format for activity reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// One JSON object per sampling cycle for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "irqmon")]
#[command(version)]
#[command(about = "Interactive interrupt activity sampler", long_about = None)]
pub struct Cli {
    /// Interrupt counter table to sample
    #[arg(
        short = 'f',
        long = "file",
        value_name = "PATH",
        default_value = "/proc/interrupts"
    )]
    pub file: PathBuf,

    /// Polling interval in milliseconds (must be >= 1)
    #[arg(long = "interval-ms", value_name = "MS", default_value_t = 100)]
    pub interval_ms: u64,

    /// Report mode (avg interval between events, or event rate)
    #[arg(short = 'm', long = "mode", value_enum, default_value = "interval")]
    pub mode: ReportMode,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Stamp every line at read time for per-line elapsed measurement
    #[arg(long = "per-line-timing")]
    pub per_line_timing: bool,

    /// Enable debug logging to stderr
    #[arg(long)]
    pub debug: bool,
}
