//! Progress snapshot emitted during an attack run

use serde::{Deserialize, Serialize};

/// Immutable progress report pushed to the status callback.
///
/// `total` is the best-effort estimate summed over the registered strategies,
/// so `percent` can drift past reality when estimates are approximate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Candidates checked so far
    pub tried: u64,
    /// Estimated total candidates across all strategies
    pub total: u64,
    /// Completion percentage (0.0 when the total is unknown)
    pub percent: f64,
    /// Seconds since the run started
    pub elapsed_secs: f64,
    /// Checked candidates per second
    pub rate: f64,
    /// Estimated seconds remaining at the current rate
    pub eta_secs: f64,
    /// True on the final snapshot of a run
    pub finished: bool,
}

impl StatusSnapshot {
    /// Build a snapshot from raw counters.
    pub fn compute(tried: u64, total: u64, elapsed_secs: f64, finished: bool) -> Self {
        let rate = tried as f64 / elapsed_secs.max(0.1);
        let percent = if total > 0 {
            tried as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        let remaining = total.saturating_sub(tried);
        let eta_secs = if rate > 0.0 {
            remaining as f64 / rate
        } else {
            0.0
        };

        Self {
            tried,
            total,
            percent,
            elapsed_secs,
            rate,
            eta_secs,
            finished,
        }
    }
}
