//! Snapshot reader for the interrupt counter table
//!
//! Parses the `/proc/interrupts` format: one header line naming the per-CPU
//! columns, then one line per interrupt source:
//!
//! ```text
//!  24:   1942744    2093882   IO-APIC   24-fasteoi   eth0
//! ```
//!
//! The per-CPU columns are partial counts of the same cumulative total, so
//! a line's count is the sum of its per-CPU columns plus any purely numeric
//! tokens after the label. Lines that do not carry a numeric id (`ERR:`,
//! `MIS:`) or have no label are skipped. At most [`MAX_LINES`] entries are
//! kept per snapshot; the rest of the table is dropped in order.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::clock::Clock;

/// Maximum interrupt lines retained per snapshot.
pub const MAX_LINES: usize = 256;

/// Maximum accepted length of a single table line, in bytes.
pub const MAX_LINE_LEN: usize = 255;

/// Labels longer than this are truncated.
pub const MAX_LABEL_LEN: usize = 63;

/// Errors while capturing a snapshot
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("cannot open interrupt table {path}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("read error on interrupt table: {0}")]
    ReadFailed(#[from] std::io::Error),

    #[error("line {line} exceeds {MAX_LINE_LEN} bytes")]
    LineTooLong { line: usize },
}

pub type Result<T> = std::result::Result<T, SnapshotError>;

/// One interrupt source as read from the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterruptLine {
    /// Kernel-assigned interrupt number.
    pub irq: u32,
    /// Source label, truncated to [`MAX_LABEL_LEN`] characters.
    pub label: String,
    /// Cumulative interrupt count (sum over all CPU columns).
    pub count: u64,
    /// Cycle-counter reading taken while this line was parsed. Present only
    /// when per-line timing is enabled.
    pub sampled_at: Option<u64>,
}

/// A point-in-time view of all interrupt lines, in table order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub lines: Vec<InterruptLine>,
}

impl Snapshot {
    /// Linear lookup by irq id. Snapshots hold at most 256 entries, so no
    /// index is built.
    pub fn find(&self, irq: u32) -> Option<&InterruptLine> {
        self.lines.iter().find(|l| l.irq == irq)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Anything the session loop can capture snapshots from. The production
/// implementation reads a procfs table; tests script the sequence.
pub trait SnapshotSource {
    fn capture(&mut self, clock: &dyn Clock) -> Result<Snapshot>;
}

/// Reads snapshots from a fixed table path.
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    path: PathBuf,
    per_line_timing: bool,
}

impl SnapshotReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            per_line_timing: false,
        }
    }

    /// Enable stamping each parsed line with the clock (mixed-granularity
    /// sampling support).
    pub fn with_per_line_timing(mut self, enabled: bool) -> Self {
        self.per_line_timing = enabled;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Capture a snapshot of the table. Fatal if the source cannot be
    /// opened or a line exceeds the length bound; malformed lines are
    /// skipped.
    pub fn read(&self, clock: &dyn Clock) -> Result<Snapshot> {
        let file = File::open(&self.path).map_err(|source| SnapshotError::SourceUnavailable {
            path: self.path.clone(),
            source,
        })?;
        let stamp = self.per_line_timing.then_some(clock);
        parse_table(BufReader::new(file), stamp)
    }
}

impl SnapshotSource for SnapshotReader {
    fn capture(&mut self, clock: &dyn Clock) -> Result<Snapshot> {
        self.read(clock)
    }
}

/// Parse a full interrupt table from a reader. The first line is the header;
/// its token count bounds the per-CPU column scan on every data line.
pub fn parse_table<R: Read>(reader: BufReader<R>, clock: Option<&dyn Clock>) -> Result<Snapshot> {
    let mut lines = reader.lines();

    let cpu_columns = match lines.next() {
        Some(header) => header?.split_whitespace().count(),
        None => return Ok(Snapshot::default()),
    };

    let mut snapshot = Snapshot::default();
    for (idx, line) in lines.enumerate() {
        if snapshot.lines.len() >= MAX_LINES {
            tracing::debug!("interrupt table exceeds {MAX_LINES} lines, truncating");
            break;
        }
        let line = line?;
        if line.len() > MAX_LINE_LEN {
            return Err(SnapshotError::LineTooLong { line: idx + 2 });
        }
        match parse_line(&line, cpu_columns) {
            Some(mut parsed) => {
                parsed.sampled_at = clock.map(|c| c.now_cycles());
                snapshot.lines.push(parsed);
            }
            None => {
                tracing::debug!(line = %line, "skipping malformed interrupt line");
            }
        }
    }
    Ok(snapshot)
}

/// Parse one data line. Returns `None` for malformed lines (non-numeric id,
/// missing label).
///
/// `cpu_columns` bounds how many leading numeric tokens are taken as per-CPU
/// counts, which keeps an all-digits label after the counts from being
/// swallowed by the column scan. With a zero bound the scan falls back to
/// consuming numeric tokens until the first non-numeric one.
fn parse_line(line: &str, cpu_columns: usize) -> Option<InterruptLine> {
    let mut tokens = line.split_whitespace().peekable();

    let irq = tokens.next()?.strip_suffix(':')?.parse::<u32>().ok()?;

    let mut count: u64 = 0;
    let mut consumed = 0;
    while let Some(tok) = tokens.peek() {
        if cpu_columns > 0 && consumed >= cpu_columns {
            break;
        }
        match parse_count(tok) {
            Some(n) => {
                count = count.saturating_add(n);
                consumed += 1;
                tokens.next();
            }
            None => break,
        }
    }

    let label_token = tokens.next()?;
    let label: String = label_token.chars().take(MAX_LABEL_LEN).collect();

    // Trailing purely-numeric tokens count toward the cumulative total;
    // anything else (e.g. "2-edge", device names) is free text.
    for tok in tokens {
        if let Some(n) = parse_count(tok) {
            count = count.saturating_add(n);
        }
    }

    Some(InterruptLine {
        irq,
        label,
        count,
        sampled_at: None,
    })
}

fn parse_count(token: &str) -> Option<u64> {
    if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
        token.parse().ok()
    } else {
        None
    }
}
