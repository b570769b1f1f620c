//! Object storage for extracted artifacts
//!
//! The pipeline only needs `put(key, bytes, content_type)` plus a one-time
//! access check. Backends:
//! - [`GcsObjectStore`] for Cloud Storage buckets
//! - [`FileObjectStore`] for a directory acting as a bucket
//! - `InMemoryObjectStore` for tests (`testing` feature)

mod file;
mod gcs;
#[cfg(any(test, feature = "testing"))]
mod memory;
mod sink;
mod traits;

pub use file::FileObjectStore;
pub use gcs::GcsObjectStore;
#[cfg(any(test, feature = "testing"))]
pub use memory::{InMemoryObjectStore, StoredObject};
pub use sink::{StorageSink, StoreOutcome};
pub use traits::ObjectStore;
