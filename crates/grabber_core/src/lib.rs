//! Grabber core: pure data model, naming and run accounting.
mod indexer;
mod input;
mod slug;
mod state;
mod summary;

pub use indexer::{SlugIndexer, FIRST_INDEX};
pub use input::{parse_work_items, WorkItem};
pub use slug::{slugify, target_file_name, CANONICAL_EXTENSION, FALLBACK_SLUG};
pub use state::{FailedItem, ItemOutcome, ItemStage};
pub use summary::RunSummary;
