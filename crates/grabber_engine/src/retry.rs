//! Bounded retry with exponential backoff for single HTTP attempts.

use std::time::Duration;

use crate::FailureKind;

/// Retry class of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Connect or read timed out.
    Timeout,
    /// Server asked us to slow down (429).
    Throttled,
    /// Connection reset, DNS failure and the like.
    Connection,
    /// 5xx answer.
    ServerError(u16),
    /// Anything else: 4xx, invalid url, oversized body. Never retried.
    Terminal,
}

/// Map a fetch failure onto its retry class.
pub fn classify(kind: &FailureKind) -> RetryClass {
    match kind {
        FailureKind::Timeout => RetryClass::Timeout,
        FailureKind::Network => RetryClass::Connection,
        FailureKind::HttpStatus(429) => RetryClass::Throttled,
        FailureKind::HttpStatus(code @ 500..=599) => RetryClass::ServerError(*code),
        FailureKind::HttpStatus(_)
        | FailureKind::InvalidUrl
        | FailureKind::RedirectLimitExceeded
        | FailureKind::TooLarge { .. } => RetryClass::Terminal,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    GiveUp,
    RetryAfter(Duration),
}

/// Exponential backoff: `base_delay * 2^(attempt-1)`, capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts per url, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Policy that performs exactly one attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Decide what to do after `attempt` (1-based) failed with `class`.
    pub fn decide(&self, attempt: u32, class: RetryClass) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::GiveUp;
        }
        match class {
            RetryClass::Terminal => RetryDecision::GiveUp,
            RetryClass::Timeout
            | RetryClass::Throttled
            | RetryClass::Connection
            | RetryClass::ServerError(_) => {
                let exp = 1u32 << attempt.saturating_sub(1).min(8);
                let delay = self.base_delay.saturating_mul(exp).min(self.max_delay);
                RetryDecision::RetryAfter(delay)
            }
        }
    }
}
