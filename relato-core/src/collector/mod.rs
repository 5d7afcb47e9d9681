//! Report delivery to the remote collector
//!
//! The collector is deliberately opaque: one configured URL that accepts a
//! POSTed report document and acknowledges it with a 2xx response. Nothing
//! here assumes anything else about the service behind it.
//!
//! ## Architecture
//!
//! Delivery follows a "queue-first" principle:
//! - Reports are always appended to the local durable queue first
//! - The sync engine hands queued records to a [`ReportTransport`] one at
//!   a time, in submission order
//! - Network failures never lose data; the record simply stays queued
//!
//! ## Usage
//!
//! Configure the collector in `~/.config/relato/config.toml`:
//!
//! ```toml
//! [collector]
//! endpoint_url = "https://reports.example.org/ingest"
//! timeout_secs = 30
//! ```

mod client;

pub use client::CollectorClient;

use crate::error::Result;
use crate::types::ReportRecord;
use async_trait::async_trait;

/// Transport seam between the sync engine and the collector.
///
/// Implementations must settle within a bounded time: a hung request holds
/// up the whole drain, so the production client carries an HTTP timeout
/// and surfaces its expiry as a transmission failure.
#[async_trait]
pub trait ReportTransport: Send + Sync {
    /// Deliver one record. `Ok(())` means the collector acknowledged it.
    async fn deliver(&self, record: &ReportRecord) -> Result<()>;
}
