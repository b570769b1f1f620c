//! The ingest run itself

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::Arc;

use super::SingleFlight;
use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::graph::{
    HttpTransport, PagedFetcher, Sleeper, ThreadSleeper, TokenProvider, extract, list_messages,
};
use crate::models::IngestResult;
use crate::storage::{ObjectStore, StorageSink};
use crate::window::{TimeWindow, compute_window};

/// Runs ingest cycles for one mailbox.
///
/// Each [`run`](Self::run) is a single blocking pass: compute the window,
/// list messages, extract PDFs and upload them. Nothing is carried over
/// between runs.
///
/// Storage failures abort the run; attachments already uploaded stay
/// uploaded. Per-attachment decode failures are counted and skipped.
pub struct IngestCoordinator {
    config: IngestConfig,
    zone: Tz,
    transport: Arc<dyn HttpTransport>,
    tokens: Arc<dyn TokenProvider>,
    sink: StorageSink,
    sleeper: Arc<dyn Sleeper>,
    flights: Arc<SingleFlight>,
}

impl IngestCoordinator {
    /// Create a coordinator, rejecting invalid configuration up front
    pub fn new(
        config: IngestConfig,
        transport: Arc<dyn HttpTransport>,
        tokens: Arc<dyn TokenProvider>,
        store: Arc<dyn ObjectStore>,
    ) -> Result<Self> {
        config.validate()?;
        let zone = config.zone()?;
        let sink = StorageSink::new(store, config.download_dir.clone());

        Ok(Self {
            config,
            zone,
            transport,
            tokens,
            sink,
            sleeper: Arc::new(ThreadSleeper),
            flights: Arc::new(SingleFlight::new()),
        })
    }

    /// Replace the backoff sleeper
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Share a single-flight registry with other coordinators
    pub fn with_single_flight(mut self, flights: Arc<SingleFlight>) -> Self {
        self.flights = flights;
        self
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    pub fn storage_location(&self) -> String {
        self.sink.store_location()
    }

    /// Verify the storage destination once, before any run
    pub fn preflight(&self) -> Result<()> {
        self.sink.check_access()
    }

    /// Window a run at `now` would cover
    pub fn window_at(&self, now: DateTime<Utc>) -> Result<TimeWindow> {
        compute_window(now, self.zone, self.config.cutoff_hour)
    }

    /// Run one cycle for the current time
    pub fn run_now(&self) -> Result<IngestResult> {
        self.run(Utc::now())
    }

    /// Run one cycle as if the clock read `now`
    pub fn run(&self, now: DateTime<Utc>) -> Result<IngestResult> {
        let mailbox = self.config.mailbox.as_str();
        let _flight = self
            .flights
            .try_acquire(mailbox)
            .ok_or_else(|| IngestError::AlreadyRunning(mailbox.to_string()))?;

        let start = std::time::Instant::now();
        let window = self.window_at(now)?;
        info!(
            "Window ({}): {} -> {} (now={})",
            self.zone.name(),
            window.start().with_timezone(&self.zone),
            window.end().with_timezone(&self.zone),
            now.with_timezone(&self.zone)
        );
        info!("Window (UTC): {} -> {}", window.start(), window.end());

        let token = self.tokens.get_token()?;
        let fetcher = PagedFetcher::new(
            self.transport.clone(),
            self.sleeper.clone(),
            token,
            self.config.retry,
        );
        let base = self.config.graph_base.as_str();

        let mut result = IngestResult::empty(window);
        let mut seen_keys = HashSet::new();

        for message in list_messages(&fetcher, base, mailbox, window)? {
            let message = message?;
            result.messages_scanned += 1;
            debug!(
                "Message {} received {} (attachments: {})",
                message.id.as_str(),
                message.received_at,
                message.has_attachments
            );

            let extraction = extract(&fetcher, base, mailbox, &message)?;
            result.attachments_failed += extraction.failed;

            for artifact in extraction.artifacts {
                if !seen_keys.insert(artifact.key.clone()) {
                    warn!(
                        "Key {} produced twice in this run; the later upload replaces the earlier",
                        artifact.key
                    );
                }

                let outcome = self.sink.store(&artifact)?;
                if self.sink.cache_dir().is_some() && !outcome.cached {
                    result.cache_failures += 1;
                }
                result.attachments_saved += 1;
                result.artifacts.push(artifact);
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        info!("Messages scanned: {}", result.messages_scanned);
        info!("PDF attachments saved: {}", result.attachments_saved);
        if result.attachments_failed > 0 {
            warn!("Attachments skipped after errors: {}", result.attachments_failed);
        }

        Ok(result)
    }
}
