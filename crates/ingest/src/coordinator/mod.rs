//! Ingest run orchestration
//!
//! Computes the window, walks the mailbox and stores every PDF found.
//! One run per mailbox at a time.

mod run;
mod single_flight;

pub use run::IngestCoordinator;
pub use single_flight::{FlightGuard, SingleFlight};
