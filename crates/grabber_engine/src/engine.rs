use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;

use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use grabber_core::{
    slugify, target_file_name, FailedItem, ItemOutcome, ItemStage, RunSummary, SlugIndexer,
    WorkItem,
};
use thiserror::Error;

use crate::fetch::{FetchSettings, Fetcher, ProgressSink, ReqwestFetcher};
use crate::normalize::{JpegNormalizer, NormalizeError, NormalizeSettings, Normalizer};
use crate::persist::{
    ensure_output_dir, remove_stale_parts, AtomicFileWriter, CommitOutcome, PersistError,
};
use crate::{EngineEvent, FetchError, ItemId, ItemProgress, ItemReport};

pub const DEFAULT_WORKERS: usize = 16;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub output_dir: PathBuf,
    pub workers: usize,
    pub fetch: FetchSettings,
    pub normalize: NormalizeSettings,
}

impl EngineConfig {
    pub fn default_with_output(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            workers: DEFAULT_WORKERS,
            fetch: FetchSettings::default(),
            normalize: NormalizeSettings::default(),
        }
    }
}

/// Errors that stop a run before any item is processed.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("worker count must be at least 1")]
    NoWorkers,
    #[error("output directory: {0}")]
    Output(#[from] PersistError),
    #[error("worker {worker} setup failed: {message}")]
    WorkerSetup { worker: usize, message: String },
}

/// Why a single item failed. Never escapes the item boundary.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("fetch failed for {url}: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: FetchError,
    },
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error("write failed for {path:?}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: PersistError,
    },
}

impl ItemError {
    /// Stage the item was in when this error happened.
    pub fn stage(&self) -> ItemStage {
        match self {
            ItemError::FetchFailed { .. } => ItemStage::Fetching,
            ItemError::Normalize(_) => ItemStage::Normalizing,
            ItemError::WriteFailed { .. } => ItemStage::Writing,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub summary: RunSummary,
    pub failures: Vec<FailedItem>,
}

impl RunReport {
    fn merge(&mut self, other: RunReport) {
        self.summary.merge(other.summary);
        self.failures.extend(other.failures);
    }
}

#[derive(Debug)]
pub struct ProcessedItem {
    pub target: PathBuf,
    /// `Ok` is either `Saved` or `Skipped`.
    pub result: Result<ItemOutcome, ItemError>,
}

/// Per-run state shared by every worker. The indexer is the only part that
/// is mutated.
#[derive(Clone, Copy)]
pub struct Pipeline<'a> {
    pub indexer: &'a SlugIndexer,
    pub normalizer: &'a dyn Normalizer,
    pub writer: &'a AtomicFileWriter,
    pub sink: &'a dyn ProgressSink,
}

impl Pipeline<'_> {
    /// Reserve a name for `item`, then fetch, normalize and commit it unless
    /// the target already exists.
    pub async fn process(
        &self,
        fetcher: &dyn Fetcher,
        item_id: ItemId,
        item: &WorkItem,
    ) -> ProcessedItem {
        let slug = slugify(&item.label);
        let index = self.indexer.next_index(&slug);
        let target = self.writer.dir().join(target_file_name(&slug, index));

        if target.is_file() {
            return ProcessedItem {
                target,
                result: Ok(ItemOutcome::Skipped),
            };
        }

        let result = self.fetch_normalize_write(fetcher, item_id, item, &target).await;
        ProcessedItem { target, result }
    }

    async fn fetch_normalize_write(
        &self,
        fetcher: &dyn Fetcher,
        item_id: ItemId,
        item: &WorkItem,
        target: &std::path::Path,
    ) -> Result<ItemOutcome, ItemError> {
        self.stage(item_id, ItemStage::Fetching);
        let fetched = fetcher
            .fetch(item_id, &item.url, self.sink)
            .await
            .map_err(|source| ItemError::FetchFailed {
                url: item.url.clone(),
                source,
            })?;
        self.stage(item_id, ItemStage::Fetched);
        if fetched.metadata.candidate_url != item.url {
            engine_debug!("{} answered as {}", item.url, fetched.metadata.candidate_url);
        }

        self.stage(item_id, ItemStage::Normalizing);
        let encoded = self.normalizer.normalize(&fetched.bytes)?;
        self.stage(item_id, ItemStage::Normalized);

        self.stage(item_id, ItemStage::Writing);
        match self.writer.commit(&encoded, target) {
            Ok(CommitOutcome::Saved(_)) => Ok(ItemOutcome::Saved),
            Ok(CommitOutcome::Skipped(_)) => Ok(ItemOutcome::Skipped),
            Err(source) => Err(ItemError::WriteFailed {
                path: target.to_path_buf(),
                source,
            }),
        }
    }

    fn stage(&self, item_id: ItemId, stage: ItemStage) {
        self.sink.emit(EngineEvent::Progress(ItemProgress {
            item_id,
            stage,
            bytes: None,
        }));
    }
}

/// Forwards events and remembers the last stage the current item reached.
struct StageTracker<'a> {
    inner: &'a dyn ProgressSink,
    last: Mutex<ItemStage>,
}

impl<'a> StageTracker<'a> {
    fn new(inner: &'a dyn ProgressSink) -> Self {
        Self {
            inner,
            last: Mutex::new(ItemStage::Pending),
        }
    }

    fn last(&self) -> ItemStage {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reset(&self) {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = ItemStage::Pending;
    }
}

impl ProgressSink for StageTracker<'_> {
    fn emit(&self, event: EngineEvent) {
        if let EngineEvent::Progress(progress) = &event {
            *self.last.lock().unwrap_or_else(PoisonError::into_inner) = progress.stage;
        }
        self.inner.emit(event);
    }
}

/// Resources owned by exactly one worker for the whole run.
struct Worker {
    id: usize,
    runtime: tokio::runtime::Runtime,
    fetcher: ReqwestFetcher,
}

impl Worker {
    fn acquire(id: usize, settings: &FetchSettings) -> Result<Self, EngineError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| EngineError::WorkerSetup {
                worker: id,
                message: err.to_string(),
            })?;
        let fetcher =
            ReqwestFetcher::new(settings.clone()).map_err(|err| EngineError::WorkerSetup {
                worker: id,
                message: err.to_string(),
            })?;
        Ok(Self {
            id,
            runtime,
            fetcher,
        })
    }

    /// Claim items off `cursor` until the input is exhausted.
    fn run(self, items: &[WorkItem], cursor: &AtomicUsize, pipeline: &Pipeline<'_>) -> RunReport {
        engine_logging::set_worker_id(self.id);
        let mut report = RunReport::default();
        let tracker = StageTracker::new(pipeline.sink);
        let pipeline = Pipeline {
            sink: &tracker,
            ..*pipeline
        };

        loop {
            let item_id = cursor.fetch_add(1, Ordering::Relaxed);
            let Some(item) = items.get(item_id) else {
                break;
            };

            tracker.reset();
            let processed = panic::catch_unwind(AssertUnwindSafe(|| {
                self.runtime
                    .block_on(pipeline.process(&self.fetcher, item_id, item))
            }));
            let finished = match processed {
                Ok(processed) => finish(item_id, item, processed, &mut report),
                Err(_) => {
                    let stage = tracker.last();
                    let reason = format!("panic (last stage: {stage})");
                    engine_error!("processing {} panicked at {}", item.url, stage);
                    report.summary.record(ItemOutcome::Failed);
                    report.failures.push(FailedItem {
                        url: item.url.clone(),
                        label: item.label.clone(),
                        stage,
                        reason: reason.clone(),
                    });
                    ItemReport {
                        item_id,
                        url: item.url.clone(),
                        target: PathBuf::new(),
                        outcome: ItemOutcome::Failed,
                        reason: Some(reason),
                    }
                }
            };
            tracker.inner.emit(EngineEvent::ItemFinished(finished));
        }

        engine_debug!("worker done: {:?}", report.summary);
        engine_logging::clear_worker_id();
        report
    }
}

fn finish(
    item_id: ItemId,
    item: &WorkItem,
    processed: ProcessedItem,
    report: &mut RunReport,
) -> ItemReport {
    let (outcome, reason) = match processed.result {
        Ok(outcome) => {
            engine_debug!("{:?} {} -> {:?}", outcome, item.url, processed.target);
            (outcome, None)
        }
        Err(err) => {
            engine_warn!("{} ({}) failed at {}: {}", item.url, item.label, err.stage(), err);
            report.failures.push(FailedItem {
                url: item.url.clone(),
                label: item.label.clone(),
                stage: err.stage(),
                reason: err.to_string(),
            });
            (ItemOutcome::Failed, Some(err.to_string()))
        }
    };
    report.summary.record(outcome);

    ItemReport {
        item_id,
        url: item.url.clone(),
        target: processed.target,
        outcome,
        reason,
    }
}

/// Process `items` on a pool of `config.workers` threads and return the
/// aggregated report once every worker has finished.
///
/// Setup problems (unusable output directory, worker resources) are returned
/// before any item is touched; per-item failures only show up in the report.
pub fn run(
    items: &[WorkItem],
    config: &EngineConfig,
    sink: &dyn ProgressSink,
) -> Result<RunReport, EngineError> {
    if config.workers == 0 {
        return Err(EngineError::NoWorkers);
    }
    ensure_output_dir(&config.output_dir)?;
    let stale = remove_stale_parts(&config.output_dir)?;
    if stale > 0 {
        engine_info!("Removed {} stale temp files from {:?}", stale, config.output_dir);
    }

    let worker_count = config.workers.min(items.len());
    let workers = (0..worker_count)
        .map(|id| Worker::acquire(id, &config.fetch))
        .collect::<Result<Vec<_>, _>>()?;
    engine_info!(
        "Processing {} items with {} workers into {:?}",
        items.len(),
        worker_count,
        config.output_dir
    );

    let indexer = SlugIndexer::new();
    let normalizer = JpegNormalizer::new(config.normalize);
    let writer = AtomicFileWriter::new(config.output_dir.clone());
    let pipeline = Pipeline {
        indexer: &indexer,
        normalizer: &normalizer,
        writer: &writer,
        sink,
    };
    let cursor = AtomicUsize::new(0);

    let mut report = RunReport::default();
    thread::scope(|scope| {
        let handles: Vec<_> = workers
            .into_iter()
            .map(|worker| {
                let pipeline = &pipeline;
                let cursor = &cursor;
                scope.spawn(move || worker.run(items, cursor, pipeline))
            })
            .collect();
        for handle in handles {
            match handle.join() {
                Ok(worker_report) => report.merge(worker_report),
                Err(_) => engine_error!("a worker thread panicked outside item processing"),
            }
        }
    });

    engine_info!(
        "Run finished: saved={} skipped={} failed={} across {} labels",
        report.summary.saved,
        report.summary.skipped,
        report.summary.failed,
        indexer.slug_count()
    );
    Ok(report)
}
