//! # relato-core
//!
//! Core library for relato - an offline-first municipal incident reporter.
//!
//! This library provides:
//! - Domain types for reports, drafts, and submission outcomes
//! - A restart-surviving queue of pending reports over SQLite
//! - A sequential, fail-stop sync engine draining the queue to a collector
//! - Photo transcoding (downscale + JPEG + base64) ahead of queueing
//! - Configuration, logging, and the location catalog
//!
//! ## Architecture
//!
//! A report flows through four stages:
//! - **Draft:** raw form input, validated but not yet owned by the system
//! - **Transcode:** the photo is normalized before anything is persisted
//! - **Queue:** the record is appended to the durable queue; from here on
//!   it survives restarts and cannot be lost by a network failure
//! - **Drain:** queued records go to the collector one at a time, in
//!   order, each removed only after the collector acknowledges it
//!
//! Connectivity and GPS state reach the pipeline through watch-channel
//! subscriptions; the core never polls the outside world.
//!
//! ## Example
//!
//! ```rust,no_run
//! use relato_core::{Config, QueueStore};
//!
//! // Load configuration
//! let config = Config::load().expect("failed to load config");
//!
//! // Open the durable queue
//! let store = QueueStore::open(&Config::queue_path()).expect("failed to open queue");
//! println!("{} report(s) pending", store.len().expect("failed to read queue"));
//! ```

// Re-export commonly used items at the crate root
pub use catalog::LocationCatalog;
pub use collector::{CollectorClient, ReportTransport};
pub use config::Config;
pub use error::{Error, Result};
pub use signals::{ConnectivitySignal, PositionFeed};
pub use store::QueueStore;
pub use submit::SubmissionCoordinator;
pub use sync::{drain_on_reconnect, SyncEngine};
pub use transcode::ImageTranscoder;
pub use types::*;

// Public modules
pub mod catalog;
pub mod collector;
pub mod config;
pub mod error;
pub mod logging;
pub mod signals;
pub mod store;
pub mod submit;
pub mod sync;
pub mod transcode;
pub mod types;
