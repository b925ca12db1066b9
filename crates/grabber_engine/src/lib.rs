//! Grabber engine: fetch, normalize and persist images on a worker pool.
mod engine;
mod fetch;
mod normalize;
mod persist;
mod retry;
mod types;

pub use engine::{
    run, EngineConfig, EngineError, ItemError, Pipeline, ProcessedItem, RunReport,
    DEFAULT_WORKERS,
};
pub use fetch::{candidate_urls, FetchSettings, Fetcher, ProgressSink, ReqwestFetcher};
pub use normalize::{JpegNormalizer, NormalizeError, NormalizeSettings, Normalizer};
pub use persist::{
    ensure_output_dir, remove_stale_parts, AtomicFileWriter, CommitOutcome, PersistError,
    PART_SUFFIX,
};
pub use retry::{classify, RetryClass, RetryDecision, RetryPolicy};
pub use types::{
    EngineEvent, FailureKind, FetchError, FetchMetadata, FetchOutput, ItemId, ItemProgress,
    ItemReport,
};
