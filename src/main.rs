use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use irqmon::cli::{Cli, OutputFormat};
use irqmon::clock::{Clock, CycleClock};
use irqmon::render::Reporter;
use irqmon::session::{Session, StdinCommands};
use irqmon::signal;
use irqmon::snapshot::SnapshotReader;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();

    if args.interval_ms == 0 {
        anyhow::bail!("Invalid value for --interval-ms: 0 (must be >= 1)");
    }

    init_tracing(args.debug);

    let terminate = signal::install_termination_flag()?;
    let clock = CycleClock::new();
    let reader = SnapshotReader::new(&args.file).with_per_line_timing(args.per_line_timing);

    if matches!(args.format, OutputFormat::Text) {
        println!("Interrupt activity monitor: {}", args.file.display());
        println!("Press 'i'+Enter to sample now, 'r' to reset baseline, 'q' to quit.\n");
    }

    let reporter = Reporter::new(
        args.mode,
        args.format,
        clock.cycles_per_usec(),
        std::io::stdout(),
    );

    let mut session = Session::new(
        reader,
        clock,
        StdinCommands::new(),
        reporter,
        terminate,
        Duration::from_millis(args.interval_ms),
    );
    session.run()?;

    println!("\nInterrupt monitoring stopped.");

    Ok(())
}
