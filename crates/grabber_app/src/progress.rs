//! Progress bar fed by engine events.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use grabber_core::ItemOutcome;
use grabber_engine::{EngineEvent, ProgressSink};
use indicatif::{ProgressBar, ProgressStyle};

pub struct ProgressReporter {
    bar: ProgressBar,
    saved: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
}

impl ProgressReporter {
    /// A bar over `total` items, or an invisible one when `visible` is false.
    pub fn new(total: usize, visible: bool) -> Self {
        let bar = if visible {
            let bar = ProgressBar::new(total as u64);
            bar.set_style(
                ProgressStyle::with_template(
                    "{elapsed_precise} [{bar:40}] {pos}/{len} ({per_sec}, eta {eta}) {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
            );
            bar.enable_steady_tick(Duration::from_millis(200));
            bar
        } else {
            ProgressBar::hidden()
        };
        Self {
            bar,
            saved: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    fn counter(&self, outcome: ItemOutcome) -> &AtomicUsize {
        match outcome {
            ItemOutcome::Saved => &self.saved,
            ItemOutcome::Skipped => &self.skipped,
            ItemOutcome::Failed => &self.failed,
        }
    }

    fn message(&self) -> String {
        format!(
            "saved {} skipped {} failed {}",
            self.saved.load(Ordering::Relaxed),
            self.skipped.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed)
        )
    }
}

impl ProgressSink for ProgressReporter {
    fn emit(&self, event: EngineEvent) {
        if let EngineEvent::ItemFinished(report) = event {
            self.counter(report.outcome).fetch_add(1, Ordering::Relaxed);
            self.bar.set_message(self.message());
            self.bar.inc(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::ProgressReporter;
    use grabber_core::{ItemOutcome, ItemStage};
    use grabber_engine::{EngineEvent, ItemProgress, ItemReport, ProgressSink};

    fn finished(outcome: ItemOutcome) -> EngineEvent {
        EngineEvent::ItemFinished(ItemReport {
            item_id: 0,
            url: "http://x/a.jpg".to_string(),
            target: PathBuf::from("out/a_1.jpg"),
            outcome,
            reason: None,
        })
    }

    #[test]
    fn finished_items_are_counted_by_outcome() {
        let reporter = ProgressReporter::new(3, false);
        reporter.emit(finished(ItemOutcome::Saved));
        reporter.emit(finished(ItemOutcome::Failed));
        reporter.emit(finished(ItemOutcome::Saved));
        assert_eq!(reporter.message(), "saved 2 skipped 0 failed 1");
    }

    #[test]
    fn stage_progress_does_not_advance_the_bar() {
        let reporter = ProgressReporter::new(1, false);
        reporter.emit(EngineEvent::Progress(ItemProgress {
            item_id: 0,
            stage: ItemStage::Fetching,
            bytes: Some(10),
        }));
        assert_eq!(reporter.message(), "saved 0 skipped 0 failed 0");
    }
}
