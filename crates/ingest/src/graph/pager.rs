//! Retry-aware cursor pagination
//!
//! Every Graph collection endpoint returns `{"value": [...],
//! "@odata.nextLink": "..."}`. [`PagedFetcher`] walks those links lazily, one
//! request per page, and absorbs throttling responses with a bounded backoff.

use log::{debug, warn};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use super::api::CollectionPage;
use super::http::{HttpResponse, HttpTransport};
use crate::error::{IngestError, Result};

/// Backoff settings for throttled requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay used when the server gives no numeric `Retry-After`
    pub default_delay: Duration,
    /// Upper bound on any single delay, including server-requested ones
    pub max_delay: Duration,
    /// Total attempts per request, including the first
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// Statuses that mean "slow down", not "failed"
    const THROTTLE_STATUSES: [u16; 3] = [429, 503, 504];

    pub fn is_throttled(status: u16) -> bool {
        Self::THROTTLE_STATUSES.contains(&status)
    }

    /// Delay before retrying, honouring a numeric `Retry-After` in seconds
    /// up to `max_delay`
    pub fn delay_for(&self, retry_after: Option<&str>) -> Duration {
        retry_after
            .map(str::trim)
            .filter(|v| !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(self.default_delay)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            default_delay: Duration::from_secs(3),
            max_delay: Duration::from_secs(120),
            max_attempts: 8,
        }
    }
}

/// Blocking sleep seam so backoff can be observed in tests
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the calling thread
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// One decoded page and the link to the next one
#[derive(Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_link: Option<String>,
}

/// Authenticated GET with throttling backoff and pagination.
///
/// Holds the bearer token acquired for the current run.
pub struct PagedFetcher {
    transport: Arc<dyn HttpTransport>,
    sleeper: Arc<dyn Sleeper>,
    token: String,
    policy: RetryPolicy,
}

impl PagedFetcher {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        sleeper: Arc<dyn Sleeper>,
        token: String,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            sleeper,
            token,
            policy,
        }
    }

    /// GET `url`, retrying the identical request while throttled.
    ///
    /// Returns the first non-throttled 2xx response. Any other status of 400
    /// or above is a [`IngestError::RemoteApi`].
    pub fn get(&self, url: &str) -> Result<HttpResponse> {
        let mut attempt = 0;

        loop {
            attempt += 1;
            let response = self.transport.get(url, &self.token)?;

            if RetryPolicy::is_throttled(response.status) {
                if attempt >= self.policy.max_attempts {
                    return Err(IngestError::RetryExhausted {
                        url: url.to_string(),
                        attempts: attempt,
                        last_status: response.status,
                    });
                }

                let delay = self.policy.delay_for(response.retry_after.as_deref());
                warn!(
                    "Throttled with HTTP {} (attempt {}/{}), retrying in {:?}",
                    response.status, attempt, self.policy.max_attempts, delay
                );
                self.sleeper.sleep(delay);
                continue;
            }

            if !response.is_success() {
                return Err(IngestError::RemoteApi {
                    status: response.status,
                    body: response.text(),
                });
            }

            return Ok(response);
        }
    }

    /// Fetch and decode a single page
    pub fn fetch_page<T: DeserializeOwned>(&self, url: &str) -> Result<Page<T>> {
        let response = self.get(url)?;
        let page: CollectionPage<T> = serde_json::from_slice(&response.body)
            .map_err(|e| IngestError::Decode(format!("{}: {}", url, e)))?;

        debug!(
            "Fetched page with {} items (more: {})",
            page.value.len(),
            page.next_link.is_some()
        );

        Ok(Page {
            items: page.value,
            next_link: page.next_link,
        })
    }

    /// Lazily walk every page starting at `url`
    pub fn pages<T: DeserializeOwned>(&self, url: impl Into<String>) -> Pages<'_, T> {
        Pages {
            fetcher: self,
            next_url: Some(url.into()),
            _marker: PhantomData,
        }
    }
}

/// Forward-only sequence of pages; yields nothing after the first error
pub struct Pages<'f, T> {
    fetcher: &'f PagedFetcher,
    next_url: Option<String>,
    _marker: PhantomData<T>,
}

impl<'f, T: DeserializeOwned> Pages<'f, T> {
    /// Flatten pages into individual items, in page order
    pub fn items(self) -> Items<'f, T> {
        Items {
            pages: self,
            buffer: Vec::new().into_iter(),
        }
    }
}

impl<T: DeserializeOwned> Iterator for Pages<'_, T> {
    type Item = Result<Page<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        let url = self.next_url.take()?;
        match self.fetcher.fetch_page(&url) {
            Ok(page) => {
                self.next_url = page.next_link.clone();
                Some(Ok(page))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// Item-level view over [`Pages`]
pub struct Items<'f, T> {
    pages: Pages<'f, T>,
    buffer: std::vec::IntoIter<T>,
}

impl<T: DeserializeOwned> Iterator for Items<'_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.next() {
                return Some(Ok(item));
            }
            match self.pages.next()? {
                Ok(page) => self.buffer = page.items.into_iter(),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
