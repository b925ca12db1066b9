use serde::Serialize;

use crate::ItemOutcome;

/// Saved/skipped/failed counters of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RunSummary {
    pub saved: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Saved => self.saved += 1,
            ItemOutcome::Skipped => self.skipped += 1,
            ItemOutcome::Failed => self.failed += 1,
        }
    }

    /// Folds another worker's counters into this one.
    pub fn merge(&mut self, other: RunSummary) {
        self.saved += other.saved;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }

    pub fn total(&self) -> usize {
        self.saved + self.skipped + self.failed
    }
}
