//! Interactive sampling session
//!
//! Drives repeated snapshot capture at a bounded cadence, keeps the rolling
//! baseline, and reacts to three commands: `i` (sample now), `r` (reset
//! baseline), `q` (quit). A SIGINT-set termination flag is polled once per
//! iteration, so the loop never blocks longer than one interval.

use std::io::BufRead;
use std::os::fd::AsFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};

use crate::clock::Clock;
use crate::delta::compute_deltas;
use crate::render::Reporter;
use crate::snapshot::{Snapshot, SnapshotSource};

/// A single-character command read from the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Trigger a sampling cycle immediately.
    Refresh,
    /// Discard the baseline and start over from a fresh snapshot.
    Reset,
    /// End the session.
    Quit,
}

impl Command {
    /// Map an input line to a command. Unrecognized input is ignored.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim_start().chars().next()? {
            'i' => Some(Self::Refresh),
            'r' => Some(Self::Reset),
            'q' => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Source of interactive commands with a bounded wait.
pub trait CommandSource {
    /// Wait up to `timeout` for a command. `Ok(None)` means the interval
    /// elapsed (or the input was unrecognized) and the loop should tick.
    fn next_command(&mut self, timeout: Duration) -> Result<Option<Command>>;
}

/// Stdin-backed command source using a bounded poll, so asynchronous
/// termination is observed even when no input ever arrives.
#[derive(Debug, Default)]
pub struct StdinCommands {
    eof: bool,
}

impl StdinCommands {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CommandSource for StdinCommands {
    fn next_command(&mut self, timeout: Duration) -> Result<Option<Command>> {
        if self.eof {
            // Closed stdin: degrade to a pure timer tick.
            std::thread::sleep(timeout);
            return Ok(None);
        }

        let stdin = std::io::stdin();
        let mut fds = [PollFd::new(stdin.as_fd(), PollFlags::POLLIN)];
        let millis = timeout.as_millis().min(u128::from(u16::MAX)) as u16;
        let ready = match poll(&mut fds, PollTimeout::from(millis)) {
            Ok(n) => n,
            // Interrupted by a signal; the caller re-checks the flag.
            Err(nix::errno::Errno::EINTR) => return Ok(None),
            Err(e) => return Err(anyhow::Error::new(e).context("poll on stdin failed")),
        };
        if ready == 0 {
            return Ok(None);
        }

        let mut line = String::new();
        let n = stdin
            .lock()
            .read_line(&mut line)
            .context("failed to read command from stdin")?;
        if n == 0 {
            self.eof = true;
            return Ok(None);
        }
        Ok(Command::parse(&line))
    }
}

/// The sampling session state machine.
///
/// Owns the baseline snapshot and the previous check time; collaborators
/// (snapshot source, clock, command source, termination flag) are injected.
pub struct Session<'a, P, C, S, W>
where
    P: SnapshotSource,
    C: Clock,
    S: CommandSource,
    W: std::io::Write,
{
    source: P,
    clock: C,
    commands: S,
    reporter: Reporter<W>,
    terminate: &'a AtomicBool,
    interval: Duration,
}

impl<'a, P, C, S, W> Session<'a, P, C, S, W>
where
    P: SnapshotSource,
    C: Clock,
    S: CommandSource,
    W: std::io::Write,
{
    pub fn new(
        source: P,
        clock: C,
        commands: S,
        reporter: Reporter<W>,
        terminate: &'a AtomicBool,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            clock,
            commands,
            reporter,
            terminate,
            interval,
        }
    }

    pub fn reporter(&self) -> &Reporter<W> {
        &self.reporter
    }

    /// Run until a quit command arrives or the termination flag is set.
    /// A failed snapshot capture is fatal: a monitor with no data source
    /// has no degraded mode.
    pub fn run(&mut self) -> Result<()> {
        let mut baseline = self.capture().context("failed to capture baseline")?;
        let mut previous_check = self.clock.now_cycles();
        tracing::debug!(lines = baseline.len(), "baseline captured");

        while !self.terminate.load(Ordering::Relaxed) {
            match self.commands.next_command(self.interval)? {
                Some(Command::Quit) => break,
                Some(Command::Reset) => {
                    self.reporter.clear_screen()?;
                    self.reporter.announce("Resetting interrupt baseline...")?;
                    baseline = self.capture().context("failed to recapture baseline")?;
                    previous_check = self.clock.now_cycles();
                    tracing::debug!("baseline reset");
                    continue;
                }
                Some(Command::Refresh) | None => {}
            }

            let now = self.clock.now_cycles();
            let current = self.capture().context("failed to capture snapshot")?;
            let elapsed = now.saturating_sub(previous_check);

            let records = compute_deltas(&baseline, &current, elapsed);
            tracing::trace!(active = records.len(), elapsed, "sampling cycle");
            self.reporter.report_cycle(&records, elapsed)?;

            baseline = current;
            previous_check = now;
        }

        tracing::debug!("session terminating");
        Ok(())
    }

    fn capture(&mut self) -> Result<Snapshot> {
        let snapshot = self.source.capture(&self.clock)?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{OutputFormat, ReportMode};
    use crate::snapshot::{InterruptLine, SnapshotError};
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    fn line(irq: u32, label: &str, count: u64) -> InterruptLine {
        InterruptLine {
            irq,
            label: label.to_string(),
            count,
            sampled_at: None,
        }
    }

    fn snap(lines: Vec<InterruptLine>) -> Snapshot {
        Snapshot { lines }
    }

    /// Replays a fixed sequence of snapshots, repeating the last one.
    struct ScriptedSource {
        snapshots: VecDeque<Snapshot>,
        last: Snapshot,
    }

    impl ScriptedSource {
        fn new(snapshots: Vec<Snapshot>) -> Self {
            Self {
                snapshots: snapshots.into(),
                last: Snapshot::default(),
            }
        }
    }

    impl SnapshotSource for ScriptedSource {
        fn capture(&mut self, _clock: &dyn Clock) -> Result<Snapshot, SnapshotError> {
            if let Some(next) = self.snapshots.pop_front() {
                self.last = next;
            }
            Ok(self.last.clone())
        }
    }

    /// Clock that advances by a fixed step on every reading.
    struct SteppingClock {
        now: std::cell::Cell<u64>,
        step: u64,
    }

    impl SteppingClock {
        fn new(step: u64) -> Self {
            Self {
                now: std::cell::Cell::new(0),
                step,
            }
        }
    }

    impl Clock for SteppingClock {
        fn now_cycles(&self) -> u64 {
            let t = self.now.get();
            self.now.set(t + self.step);
            t
        }

        fn cycles_per_usec(&self) -> f64 {
            1000.0
        }
    }

    /// Replays a fixed command script, then quits.
    struct ScriptedCommands {
        script: VecDeque<Option<Command>>,
        sleep_on_tick: bool,
    }

    impl ScriptedCommands {
        fn new(script: Vec<Option<Command>>) -> Self {
            Self {
                script: script.into(),
                sleep_on_tick: false,
            }
        }
    }

    impl CommandSource for ScriptedCommands {
        fn next_command(&mut self, timeout: Duration) -> Result<Option<Command>> {
            if self.sleep_on_tick {
                std::thread::sleep(timeout);
            }
            Ok(self.script.pop_front().unwrap_or(Some(Command::Quit)))
        }
    }

    fn reporter() -> Reporter<Vec<u8>> {
        Reporter::new(ReportMode::Interval, OutputFormat::Text, 1000.0, Vec::new())
    }

    fn output<P, C, S>(session: &Session<'_, P, C, S, Vec<u8>>) -> String
    where
        P: SnapshotSource,
        C: Clock,
        S: CommandSource,
    {
        String::from_utf8(session.reporter().writer().clone()).unwrap()
    }

    #[test]
    fn test_command_parse() {
        assert_eq!(Command::parse("i\n"), Some(Command::Refresh));
        assert_eq!(Command::parse("r\n"), Some(Command::Reset));
        assert_eq!(Command::parse("q\n"), Some(Command::Quit));
        assert_eq!(Command::parse("  q\n"), Some(Command::Quit));
        assert_eq!(Command::parse("x\n"), None);
        assert_eq!(Command::parse(""), None);
    }

    #[test]
    fn test_quit_command_ends_session() {
        let term = AtomicBool::new(false);
        let mut session = Session::new(
            ScriptedSource::new(vec![snap(vec![line(1, "kbd", 10)])]),
            SteppingClock::new(1_000_000),
            ScriptedCommands::new(vec![Some(Command::Quit)]),
            reporter(),
            &term,
            Duration::from_millis(10),
        );
        session.run().unwrap();
        assert!(output(&session).is_empty());
    }

    #[test]
    fn test_tick_reports_delta_and_rolls_baseline() {
        let term = AtomicBool::new(false);
        let snapshots = vec![
            snap(vec![line(7, "timer", 100)]),
            snap(vec![line(7, "timer", 150)]),
            snap(vec![line(7, "timer", 150)]),
        ];
        let mut session = Session::new(
            ScriptedSource::new(snapshots),
            SteppingClock::new(2_000_000),
            ScriptedCommands::new(vec![None, None]),
            reporter(),
            &term,
            Duration::from_millis(10),
        );
        session.run().unwrap();

        let out = output(&session);
        // First tick: 150 - 100 = 50. Second tick: no change, no output.
        assert!(out.contains("IRQ 7"));
        assert!(out.contains("Count: 50"));
        assert_eq!(out.lines().count(), 1);
    }

    #[test]
    fn test_refresh_command_samples_like_a_tick() {
        let term = AtomicBool::new(false);
        let snapshots = vec![
            snap(vec![line(3, "serial", 5)]),
            snap(vec![line(3, "serial", 9)]),
        ];
        let mut session = Session::new(
            ScriptedSource::new(snapshots),
            SteppingClock::new(1_000_000),
            ScriptedCommands::new(vec![Some(Command::Refresh)]),
            reporter(),
            &term,
            Duration::from_millis(10),
        );
        session.run().unwrap();
        assert!(output(&session).contains("Count: 4"));
    }

    #[test]
    fn test_reset_discards_accumulated_deltas() {
        let term = AtomicBool::new(false);
        // Baseline 100, reset rebaselines at 500, next tick reads 510:
        // the report must show 10, not 410.
        let snapshots = vec![
            snap(vec![line(7, "timer", 100)]),
            snap(vec![line(7, "timer", 500)]),
            snap(vec![line(7, "timer", 510)]),
        ];
        let mut session = Session::new(
            ScriptedSource::new(snapshots),
            SteppingClock::new(1_000_000),
            ScriptedCommands::new(vec![Some(Command::Reset), None]),
            reporter(),
            &term,
            Duration::from_millis(10),
        );
        session.run().unwrap();

        let out = output(&session);
        assert!(out.contains("Resetting interrupt baseline..."));
        assert!(out.contains("Count: 10"));
        assert!(!out.contains("Count: 410"));
    }

    #[test]
    fn test_reset_tick_computes_no_delta() {
        let term = AtomicBool::new(false);
        let snapshots = vec![
            snap(vec![line(7, "timer", 100)]),
            snap(vec![line(7, "timer", 500)]),
        ];
        let mut session = Session::new(
            ScriptedSource::new(snapshots),
            SteppingClock::new(1_000_000),
            ScriptedCommands::new(vec![Some(Command::Reset)]),
            reporter(),
            &term,
            Duration::from_millis(10),
        );
        session.run().unwrap();
        assert!(!output(&session).contains("IRQ 7"));
    }

    #[test]
    fn test_termination_flag_checked_before_first_tick() {
        let term = AtomicBool::new(true);
        let mut session = Session::new(
            ScriptedSource::new(vec![snap(vec![line(1, "kbd", 10)])]),
            SteppingClock::new(1_000_000),
            ScriptedCommands::new(vec![None, None, None]),
            reporter(),
            &term,
            Duration::from_millis(10),
        );
        session.run().unwrap();
        assert!(output(&session).is_empty());
    }

    #[test]
    fn test_termination_flag_observed_within_interval() {
        let term = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&term);
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            flag.store(true, Ordering::Relaxed);
        });

        let mut commands = ScriptedCommands::new(vec![None; 100]);
        commands.sleep_on_tick = true;

        let start = std::time::Instant::now();
        let mut session = Session::new(
            ScriptedSource::new(vec![snap(vec![line(1, "kbd", 10)])]),
            SteppingClock::new(1_000_000),
            commands,
            reporter(),
            &term,
            Duration::from_millis(50),
        );
        session.run().unwrap();
        handle.join().unwrap();

        // One interval (50ms) plus scheduling slack, never the full script.
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn test_counter_regression_reported_unavailable() {
        let term = AtomicBool::new(false);
        let snapshots = vec![
            snap(vec![line(5, "rtc", 900)]),
            snap(vec![line(5, "rtc", 100)]),
        ];
        let mut session = Session::new(
            ScriptedSource::new(snapshots),
            SteppingClock::new(1_000_000),
            ScriptedCommands::new(vec![None]),
            reporter(),
            &term,
            Duration::from_millis(10),
        );
        session.run().unwrap();
        assert!(output(&session).contains("Count: n/a (counter reset)"));
    }
}
