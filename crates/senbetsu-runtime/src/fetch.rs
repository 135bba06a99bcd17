use std::future::Future;
use std::time::Duration;

use senbetsu_core::models::Source;

/// A failed fetch. `retry_after` carries a server-requested delay, which
/// becomes the minimum quarantine for the source.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct FetchError {
    pub message: String,
    pub retry_after: Option<Duration>,
}

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }
}

/// Transport for feed documents. The network layer lives outside this
/// crate; anything that can produce the raw bytes of a source's feed fits.
pub trait FeedFetcher: Send + Sync {
    fn fetch(&self, source: &Source) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}
