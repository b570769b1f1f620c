//! Ingest crate - windowed mailbox PDF ingestion
//!
//! This crate provides:
//! - Daily window arithmetic across time zones
//! - Microsoft Graph message and attachment paging with bounded backoff
//! - Deterministic artifact naming for PDF attachments
//! - Object storage backends and an optional local cache
//! - A single-pass coordinator that ties the stages together
//!
//! All I/O is blocking. External services sit behind small traits
//! ([`TokenProvider`], [`HttpTransport`], [`ObjectStore`]) so the pipeline can
//! be exercised with the in-memory fakes behind the `testing` feature.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod graph;
pub mod models;
pub mod storage;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod window;

pub use config::{GraphCredentials, IngestConfig};
pub use coordinator::{IngestCoordinator, SingleFlight};
pub use error::{IngestError, Result};
pub use graph::{
    ClientCredentialsAuth, HttpResponse, HttpTransport, MetadataServerToken, PagedFetcher,
    RetryPolicy, Sleeper, StaticToken, ThreadSleeper, TokenProvider, UreqTransport,
};
pub use models::{
    AttachmentRecord, IngestResult, IngestSummary, MessageId, MessageSummary, OutputArtifact,
};
#[cfg(any(test, feature = "testing"))]
pub use storage::InMemoryObjectStore;
pub use storage::{FileObjectStore, GcsObjectStore, ObjectStore, StorageSink, StoreOutcome};
pub use window::{TimeWindow, compute_window, compute_window_with, parse_zone};
