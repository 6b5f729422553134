//! Delta engine: per-line activity between two snapshots
//!
//! Pure computation over a previous and current snapshot plus the elapsed
//! cycle count between them. A line must appear in both snapshots to
//! produce a record; silent lines produce nothing, and a counter that went
//! backwards (reset or wraparound) is reported as unavailable rather than
//! underflowed.

use crate::snapshot::Snapshot;

/// Observed activity for one interrupt line over one sampling cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineActivity {
    pub irq: u32,
    pub label: String,
    pub activity: Activity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activity {
    /// The counter advanced by `delta` over `elapsed_cycles`.
    Observed { delta: u64, elapsed_cycles: u64 },
    /// The counter decreased since the previous snapshot.
    Unavailable,
}

impl LineActivity {
    /// Average cycles between events, when observed.
    pub fn avg_interval_cycles(&self) -> Option<u64> {
        match self.activity {
            Activity::Observed {
                delta,
                elapsed_cycles,
            } if delta > 0 => Some(elapsed_cycles / delta),
            _ => None,
        }
    }
}

/// Compute activity records for every line of `current` that also appears
/// in `previous`, in `current`'s order.
///
/// When both readings of a line carry per-line timestamps, the elapsed time
/// for that line is the difference of its own stamps; otherwise the global
/// `elapsed_cycles` applies.
pub fn compute_deltas(
    previous: &Snapshot,
    current: &Snapshot,
    elapsed_cycles: u64,
) -> Vec<LineActivity> {
    let mut records = Vec::new();

    for line in &current.lines {
        let Some(prev) = previous.find(line.irq) else {
            // Newly observed line: needs two consecutive snapshots.
            continue;
        };

        if line.count < prev.count {
            tracing::debug!(irq = line.irq, "counter regression, marking unavailable");
            records.push(LineActivity {
                irq: line.irq,
                label: line.label.clone(),
                activity: Activity::Unavailable,
            });
            continue;
        }

        let delta = line.count - prev.count;
        if delta == 0 {
            continue;
        }

        let elapsed = match (prev.sampled_at, line.sampled_at) {
            (Some(earlier), Some(later)) => later.saturating_sub(earlier),
            _ => elapsed_cycles,
        };

        records.push(LineActivity {
            irq: line.irq,
            label: line.label.clone(),
            activity: Activity::Observed {
                delta,
                elapsed_cycles: elapsed,
            },
        });
    }

    records
}
