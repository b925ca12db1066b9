use std::fmt;
use std::path::PathBuf;

use grabber_core::{ItemOutcome, ItemStage};

/// Position of an item in the run's input list.
pub type ItemId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemProgress {
    pub item_id: ItemId,
    pub stage: ItemStage,
    pub bytes: Option<u64>,
}

/// Terminal report for one item, emitted in completion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    pub item_id: ItemId,
    pub url: String,
    pub target: PathBuf,
    pub outcome: ItemOutcome,
    /// Failure reason when `outcome` is `Failed`.
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Progress(ItemProgress),
    ItemFinished(ItemReport),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub bytes: Vec<u8>,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub original_url: String,
    /// Candidate url that answered, before redirects.
    pub candidate_url: String,
    pub final_url: String,
    pub content_type: Option<String>,
    /// Attempts spent on the successful candidate, 1 when the first try worked.
    pub attempts: u32,
    pub byte_len: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
