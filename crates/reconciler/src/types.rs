//! Reports produced by the reconciler and the loop.

use std::fmt;

use annotator_core::Error;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// What reconciling one resource did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Recorded and live status already agree.
    InSync,
    /// A patch set the recorded status to the live one.
    Patched {
        /// Status recorded before the patch.
        from: String,
        /// Status the patch wrote.
        to: String,
        /// Release revision the new status was read from, if known.
        revision: Option<u64>,
    },
}

/// Counters for one sweep over all scopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// When the sweep started.
    pub started_at: DateTime<Utc>,
    /// Scopes enumerated.
    pub scopes: usize,
    /// Resources listed across all scopes.
    pub resources: usize,
    /// Resources whose status was patched.
    pub patched: usize,
    /// Resources already in sync.
    pub in_sync: usize,
    /// Resources skipped because the release lookup failed.
    pub lookup_failures: usize,
    /// Resources skipped because the patch failed.
    pub patch_failures: usize,
}

impl CycleReport {
    /// Create an empty report stamped with the current time.
    #[must_use]
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            scopes: 0,
            resources: 0,
            patched: 0,
            in_sync: 0,
            lookup_failures: 0,
            patch_failures: 0,
        }
    }

    /// Count the outcome of one reconcile call.
    pub fn record(&mut self, outcome: &Result<ReconcileOutcome, Error>) {
        match outcome {
            Ok(ReconcileOutcome::InSync) => self.in_sync = self.in_sync.saturating_add(1),
            Ok(ReconcileOutcome::Patched { .. }) => self.patched = self.patched.saturating_add(1),
            Err(_) => self.patch_failures = self.patch_failures.saturating_add(1),
        }
    }

    /// Count a failed release lookup.
    pub fn record_lookup_failure(&mut self) {
        self.lookup_failures = self.lookup_failures.saturating_add(1);
    }

    /// Whether the sweep found nothing to correct and nothing failed.
    #[must_use]
    pub const fn converged(&self) -> bool {
        self.patched == 0 && self.lookup_failures == 0 && self.patch_failures == 0
    }
}

/// Counters accumulated over the life of the loop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleTotals {
    /// Completed sweeps.
    pub cycles: u64,
    /// Resources listed.
    pub resources: usize,
    /// Patches applied.
    pub patched: usize,
    /// Resources found in sync.
    pub in_sync: usize,
    /// Failed release lookups.
    pub lookup_failures: usize,
    /// Failed patches.
    pub patch_failures: usize,
}

impl CycleTotals {
    /// Add a completed sweep.
    pub fn absorb(&mut self, report: &CycleReport) {
        self.cycles = self.cycles.saturating_add(1);
        self.resources = self.resources.saturating_add(report.resources);
        self.patched = self.patched.saturating_add(report.patched);
        self.in_sync = self.in_sync.saturating_add(report.in_sync);
        self.lookup_failures = self.lookup_failures.saturating_add(report.lookup_failures);
        self.patch_failures = self.patch_failures.saturating_add(report.patch_failures);
    }
}

/// Lifecycle of the loop controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Cycles may still start.
    Running,
    /// Terminal; no further work happens.
    Stopped,
}

/// Why the loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The stop signal was observed at the top of a cycle.
    Requested,
    /// A loop-fatal failure occurred.
    Failed(Error),
}

impl StopReason {
    /// The triggering failure, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&Error> {
        match self {
            Self::Requested => None,
            Self::Failed(err) => Some(err),
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requested => write!(f, "stop requested"),
            Self::Failed(err) => write!(f, "{err}"),
        }
    }
}

/// Result of running the loop to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopOutcome {
    /// Why the loop stopped.
    pub reason: StopReason,
    /// Counters over all completed cycles.
    pub totals: CycleTotals,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts_outcomes() {
        let mut report = CycleReport::start();
        report.record(&Ok(ReconcileOutcome::InSync));
        report.record(&Ok(ReconcileOutcome::Patched {
            from: "PENDING".to_string(),
            to: "DEPLOYED".to_string(),
            revision: Some(2),
        }));
        report.record(&Err(Error::patch_failed("ns-a", "r3", "conflict")));
        report.record_lookup_failure();

        assert_eq!(report.in_sync, 1);
        assert_eq!(report.patched, 1);
        assert_eq!(report.patch_failures, 1);
        assert_eq!(report.lookup_failures, 1);
        assert!(!report.converged());
    }

    #[test]
    fn test_totals_absorb_reports() {
        let mut report = CycleReport::start();
        report.resources = 2;
        report.in_sync = 2;

        let mut totals = CycleTotals::default();
        totals.absorb(&report);
        totals.absorb(&report);

        assert_eq!(totals.cycles, 2);
        assert_eq!(totals.resources, 4);
        assert_eq!(totals.in_sync, 4);
    }

    #[test]
    fn test_stop_reason_display() {
        assert_eq!(StopReason::Requested.to_string(), "stop requested");
        let reason = StopReason::Failed(Error::scope_list_failed("connection refused"));
        assert!(reason.to_string().contains("connection refused"));
        assert!(reason.error().is_some());
    }
}
