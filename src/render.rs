//! Console and JSON presentation of activity records
//!
//! Two report modes over the same derived quantity: average interval between
//! events (elapsed / delta) or event rate (delta / elapsed seconds). JSON
//! output emits one object per sampling cycle for machine consumption.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::cli::{OutputFormat, ReportMode};
use crate::delta::{Activity, LineActivity};

/// One sampling cycle, as serialized with `--format json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonCycle {
    /// Wall time covered by this cycle, in milliseconds.
    pub elapsed_ms: f64,
    pub lines: Vec<JsonLine>,
}

/// A single active interrupt line within a cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonLine {
    pub irq: u32,
    pub label: String,
    /// Count increment, absent when the counter regressed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_interval_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_hz: Option<f64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unavailable: bool,
}

/// Events per second, `None` when the elapsed window is empty (a zero-cycle
/// window cannot yield a finite rate).
fn rate_hz(delta: u64, elapsed_ms: f64) -> Option<f64> {
    (elapsed_ms > 0.0).then(|| delta as f64 / (elapsed_ms / 1000.0))
}

/// Renders activity records to a writer.
pub struct Reporter<W: Write> {
    mode: ReportMode,
    format: OutputFormat,
    cycles_per_usec: f64,
    out: W,
}

impl<W: Write> Reporter<W> {
    pub fn new(mode: ReportMode, format: OutputFormat, cycles_per_usec: f64, out: W) -> Self {
        Self {
            mode,
            format,
            cycles_per_usec,
            out,
        }
    }

    /// Borrow the underlying writer (test inspection).
    pub fn writer(&self) -> &W {
        &self.out
    }

    fn cycles_to_ms(&self, cycles: u64) -> f64 {
        cycles as f64 / self.cycles_per_usec / 1000.0
    }

    /// Render one sampling cycle. Cycles with no records produce no output,
    /// keeping the report proportional to activity.
    pub fn report_cycle(
        &mut self,
        records: &[LineActivity],
        elapsed_cycles: u64,
    ) -> std::io::Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        match self.format {
            OutputFormat::Text => self.report_text(records),
            OutputFormat::Json => self.report_json(records, elapsed_cycles),
        }
    }

    fn report_text(&mut self, records: &[LineActivity]) -> std::io::Result<()> {
        for record in records {
            match record.activity {
                Activity::Observed {
                    delta,
                    elapsed_cycles,
                } => {
                    let elapsed_ms = self.cycles_to_ms(elapsed_cycles);
                    match self.mode {
                        ReportMode::Interval => {
                            let avg_ms = elapsed_ms / delta as f64;
                            writeln!(
                                self.out,
                                "Interrupt: IRQ {}, Name: {:<20}, Count: {:<5}, Elapsed Time: {:.3} ms, Avg Time Between: {:.3} ms",
                                record.irq, record.label, delta, elapsed_ms, avg_ms
                            )?;
                        }
                        ReportMode::Rate => {
                            let rate = rate_hz(delta, elapsed_ms).unwrap_or(0.0);
                            writeln!(
                                self.out,
                                "Interrupt: IRQ {}, Name: {:<20}, Count: {:<5}, Rate: {:.2}/s",
                                record.irq, record.label, delta, rate
                            )?;
                        }
                    }
                }
                Activity::Unavailable => {
                    writeln!(
                        self.out,
                        "Interrupt: IRQ {}, Name: {:<20}, Count: n/a (counter reset)",
                        record.irq, record.label
                    )?;
                }
            }
        }
        self.out.flush()
    }

    fn report_json(
        &mut self,
        records: &[LineActivity],
        elapsed_cycles: u64,
    ) -> std::io::Result<()> {
        let lines = records
            .iter()
            .map(|record| match record.activity {
                Activity::Observed {
                    delta,
                    elapsed_cycles,
                } => {
                    let elapsed_ms = self.cycles_to_ms(elapsed_cycles);
                    JsonLine {
                        irq: record.irq,
                        label: record.label.clone(),
                        delta: Some(delta),
                        avg_interval_ms: Some(elapsed_ms / delta as f64),
                        rate_hz: rate_hz(delta, elapsed_ms),
                        unavailable: false,
                    }
                }
                Activity::Unavailable => JsonLine {
                    irq: record.irq,
                    label: record.label.clone(),
                    delta: None,
                    avg_interval_ms: None,
                    rate_hz: None,
                    unavailable: true,
                },
            })
            .collect();

        let cycle = JsonCycle {
            elapsed_ms: self.cycles_to_ms(elapsed_cycles),
            lines,
        };
        serde_json::to_writer(&mut self.out, &cycle)
            .map_err(std::io::Error::other)?;
        writeln!(self.out)?;
        self.out.flush()
    }

    /// ANSI clear and cursor home, used on baseline reset.
    pub fn clear_screen(&mut self) -> std::io::Result<()> {
        write!(self.out, "\x1b[2J\x1b[H")?;
        self.out.flush()
    }

    /// Print a status line outside the per-cycle report.
    pub fn announce(&mut self, message: &str) -> std::io::Result<()> {
        writeln!(self.out, "{message}")?;
        self.out.flush()
    }
}
