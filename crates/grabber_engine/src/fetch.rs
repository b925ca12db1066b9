use std::time::Duration;

use engine_logging::{engine_debug, engine_trace};
use futures_util::StreamExt;
use grabber_core::ItemStage;
use reqwest::header::{CONTENT_TYPE, REFERER};
use url::Url;

use crate::retry::{classify, RetryDecision, RetryPolicy};
use crate::{
    EngineEvent, FailureKind, FetchError, FetchMetadata, FetchOutput, ItemId, ItemProgress,
};

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:129.0) Gecko/20100101 Firefox/129.0";

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub user_agent: String,
    pub referer: Option<String>,
    /// Extensions tried, in order, after the verbatim url.
    pub extensions: Vec<String>,
    pub retry: RetryPolicy,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(10),
            redirect_limit: 5,
            max_bytes: 50 * 1024 * 1024,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            referer: None,
            extensions: ["jpeg", "jpg", "png", "webp"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            retry: RetryPolicy::default(),
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the bytes behind `url`, trying extension candidates in order.
    /// On failure the error is the one returned by the last candidate.
    async fn fetch(
        &self,
        item_id: ItemId,
        url: &str,
        sink: &dyn ProgressSink,
    ) -> Result<FetchOutput, FetchError>;
}

/// Urls to try for `url`: the url itself, then one variant per extension with
/// the last path segment's extension replaced (or appended). Duplicates are
/// dropped, the query string is kept.
pub fn candidate_urls(url: &str, extensions: &[String]) -> Result<Vec<String>, FetchError> {
    let parsed =
        Url::parse(url).map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;

    let mut candidates = vec![url.to_string()];
    for ext in extensions {
        let Some(path) = with_extension(parsed.path(), ext) else {
            break;
        };
        let mut variant = parsed.clone();
        variant.set_path(&path);
        let variant = variant.to_string();
        if variant != parsed.as_str() && !candidates.contains(&variant) {
            candidates.push(variant);
        }
    }
    Ok(candidates)
}

fn with_extension(path: &str, ext: &str) -> Option<String> {
    let (dir, last) = match path.rfind('/') {
        Some(pos) => path.split_at(pos + 1),
        None => ("", path),
    };
    if last.is_empty() {
        return None;
    }
    let stem = match last.rfind('.') {
        Some(pos) if pos > 0 => &last[..pos],
        _ => last,
    };
    Some(format!("{dir}{stem}.{ext}"))
}

/// HTTP fetcher owning one connection pool. Build one per worker.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    settings: FetchSettings,
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    async fn fetch_with_retry(
        &self,
        item_id: ItemId,
        original_url: &str,
        candidate: &str,
        sink: &dyn ProgressSink,
    ) -> Result<FetchOutput, FetchError> {
        let mut attempt = 1u32;
        loop {
            match self.fetch_once(item_id, original_url, candidate, sink).await {
                Ok(mut output) => {
                    output.metadata.attempts = attempt;
                    return Ok(output);
                }
                Err(err) => match self.settings.retry.decide(attempt, classify(&err.kind)) {
                    RetryDecision::GiveUp => return Err(err),
                    RetryDecision::RetryAfter(delay) => {
                        engine_debug!(
                            "attempt {} for {} failed ({}), retrying in {:?}",
                            attempt,
                            candidate,
                            err,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                },
            }
        }
    }

    async fn fetch_once(
        &self,
        item_id: ItemId,
        original_url: &str,
        candidate: &str,
        sink: &dyn ProgressSink,
    ) -> Result<FetchOutput, FetchError> {
        let mut request = self.client.get(candidate);
        if let Some(referer) = &self.settings.referer {
            request = request.header(REFERER, referer);
        }
        let response = request.send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        sink.emit(EngineEvent::Progress(ItemProgress {
            item_id,
            stage: ItemStage::Fetching,
            bytes: Some(0),
        }));

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
            sink.emit(EngineEvent::Progress(ItemProgress {
                item_id,
                stage: ItemStage::Fetching,
                bytes: Some(bytes.len() as u64),
            }));
        }

        let metadata = FetchMetadata {
            original_url: original_url.to_string(),
            candidate_url: candidate.to_string(),
            final_url,
            content_type,
            attempts: 1,
            byte_len: bytes.len() as u64,
        };

        Ok(FetchOutput { bytes, metadata })
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(
        &self,
        item_id: ItemId,
        url: &str,
        sink: &dyn ProgressSink,
    ) -> Result<FetchOutput, FetchError> {
        let candidates = candidate_urls(url, &self.settings.extensions)?;

        let mut last_error = None;
        for candidate in &candidates {
            match self.fetch_with_retry(item_id, url, candidate, sink).await {
                Ok(output) => return Ok(output),
                Err(err) => {
                    engine_trace!("candidate {} failed: {}", candidate, err);
                    last_error = Some(err);
                }
            }
        }
        Err(last_error
            .unwrap_or_else(|| FetchError::new(FailureKind::InvalidUrl, "no candidate urls")))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
