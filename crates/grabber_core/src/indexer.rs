use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Index handed out for the first item of every slug.
pub const FIRST_INDEX: u64 = 1;

/// Per-slug sequence counter shared by all workers of a run.
///
/// The map is only touched under its mutex, for the duration of one
/// read-increment-write, so two callers never receive the same index for the
/// same slug.
#[derive(Debug, Default)]
pub struct SlugIndexer {
    counts: Mutex<HashMap<String, u64>>,
}

impl SlugIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the next index for `slug`.
    pub fn next_index(&self, slug: &str) -> u64 {
        // A panicking worker cannot leave the map half-updated, so a poisoned
        // lock is still consistent.
        let mut counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
        let next = counts.entry(slug.to_string()).or_insert(FIRST_INDEX);
        let index = *next;
        *next += 1;
        index
    }

    /// Number of distinct slugs seen so far.
    pub fn slug_count(&self) -> usize {
        self.counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
