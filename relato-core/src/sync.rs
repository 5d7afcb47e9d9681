//! Queue synchronization with the collector
//!
//! ## Drain semantics
//!
//! A drain takes a point-in-time snapshot of the queue and walks it in
//! submission order, delivering one record at a time. A record is removed
//! only after the collector acknowledges it, so a crash mid-drain at worst
//! re-sends an already-acknowledged record; it never loses one. The first
//! delivery failure stops the pass immediately: the failed record and
//! everything after it stay queued, untouched and in order, for the next
//! trigger. There is no per-record retry, no backoff, and no skipping.
//!
//! Transmission failures are an expected condition, not an error: they are
//! logged and folded into the returned [`SyncOutcome`]. Storage failures do
//! propagate.
//!
//! Drains never interleave. Overlapping calls queue behind an async gate
//! and each pass operates on the queue state it finds when its turn comes.
//! Records appended while a drain is suspended on the network simply wait
//! for the next pass.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use crate::collector::ReportTransport;
use crate::error::Result;
use crate::store::QueueStore;
use crate::types::SyncOutcome;

/// Drains the durable queue through a [`ReportTransport`]
pub struct SyncEngine {
    store: Arc<QueueStore>,
    transport: Box<dyn ReportTransport>,
    drain_gate: Mutex<()>,
}

impl SyncEngine {
    /// Build an engine over a queue store and a transport
    pub fn new(store: Arc<QueueStore>, transport: Box<dyn ReportTransport>) -> Self {
        Self {
            store,
            transport,
            drain_gate: Mutex::new(()),
        }
    }

    /// Drain queued reports in submission order, stopping at the first
    /// delivery failure.
    ///
    /// Callers decide when to drain (connectivity regained, a submission
    /// while online, a manual sync); the engine itself never schedules
    /// work or checks reachability first.
    pub async fn drain(&self) -> Result<SyncOutcome> {
        let _gate = self.drain_gate.lock().await;

        let snapshot = self.store.list()?;
        if snapshot.is_empty() {
            tracing::debug!("queue is empty, nothing to drain");
            return Ok(SyncOutcome::Empty);
        }

        let total = snapshot.len();
        let mut delivered = 0;

        for record in &snapshot {
            match self.transport.deliver(record).await {
                Ok(()) => {
                    self.store.remove(&record.id)?;
                    delivered += 1;
                    tracing::info!(id = %record.id, "report delivered");
                }
                Err(e) => {
                    tracing::warn!(
                        id = %record.id,
                        error = %e,
                        delivered,
                        "delivery failed, stopping drain"
                    );
                    return Ok(SyncOutcome::Stopped {
                        delivered,
                        remaining: total - delivered,
                    });
                }
            }
        }

        tracing::info!(delivered, "queue fully drained");
        Ok(SyncOutcome::Drained { delivered })
    }
}

/// Drain whenever connectivity comes back.
///
/// Watches a connectivity subscription and runs one drain per
/// offline-to-online transition. Staying online does not re-trigger, and
/// going offline never interrupts a pass already underway. Returns when
/// the signal side of the channel is dropped.
pub async fn drain_on_reconnect(engine: Arc<SyncEngine>, mut connectivity: watch::Receiver<bool>) {
    let mut was_online = *connectivity.borrow_and_update();

    while connectivity.changed().await.is_ok() {
        let online = *connectivity.borrow_and_update();

        if online && !was_online {
            tracing::info!("connectivity regained, draining queue");
            match engine.drain().await {
                Ok(outcome) => tracing::info!(
                    delivered = outcome.delivered(),
                    complete = outcome.is_complete(),
                    "reconnect drain finished"
                ),
                Err(e) => tracing::error!(error = %e, "reconnect drain failed"),
            }
        }

        was_online = online;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::{ReportDraft, ReportRecord};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn make_record(street: &str) -> ReportRecord {
        let draft = ReportDraft {
            user_date: "2024-05-10".to_string(),
            user_time: "09:15".to_string(),
            region: "Zona Sul".to_string(),
            neighborhood: "Vila Nova".to_string(),
            street: street.to_string(),
            ..Default::default()
        };
        ReportRecord::from_draft(&draft, None, None)
    }

    fn queue_with(records: &[ReportRecord]) -> Arc<QueueStore> {
        let store = Arc::new(QueueStore::open_in_memory().unwrap());
        for record in records {
            store.append(record).unwrap();
        }
        store
    }

    /// Delivers successfully until `fail_from` calls have happened, then
    /// fails every later call. Records delivered ids in order.
    struct ScriptedTransport {
        fail_from: Option<usize>,
        calls: AtomicUsize,
        delivered: std::sync::Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn reliable() -> Self {
            Self {
                fail_from: None,
                calls: AtomicUsize::new(0),
                delivered: std::sync::Mutex::new(Vec::new()),
            }
        }

        fn failing_from(call: usize) -> Self {
            Self {
                fail_from: Some(call),
                ..Self::reliable()
            }
        }

        fn delivered_ids(&self) -> Vec<String> {
            self.delivered.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ReportTransport for ScriptedTransport {
        async fn deliver(&self, record: &ReportRecord) -> Result<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_from.is_some_and(|from| call >= from) {
                return Err(Error::Transmission("connection refused".to_string()));
            }
            self.delivered.lock().unwrap().push(record.id.clone());
            Ok(())
        }
    }

    /// Shares one transport between the engine and the test's assertions.
    struct ArcTransport<T: ReportTransport>(Arc<T>);

    #[async_trait]
    impl<T: ReportTransport> ReportTransport for ArcTransport<T> {
        async fn deliver(&self, record: &ReportRecord) -> Result<()> {
            self.0.deliver(record).await
        }
    }

    #[tokio::test]
    async fn drain_of_empty_queue_reports_empty() {
        let store = queue_with(&[]);
        let engine = SyncEngine::new(store, Box::new(ScriptedTransport::reliable()));
        assert_eq!(engine.drain().await.unwrap(), SyncOutcome::Empty);
    }

    #[tokio::test]
    async fn drain_delivers_in_submission_order_and_empties_queue() {
        let records: Vec<ReportRecord> =
            (0..3).map(|i| make_record(&format!("Rua {i}"))).collect();
        let store = queue_with(&records);

        let transport = Arc::new(ScriptedTransport::reliable());
        let engine = SyncEngine::new(store.clone(), Box::new(ArcTransport(transport.clone())));

        let outcome = engine.drain().await.unwrap();
        assert_eq!(outcome, SyncOutcome::Drained { delivered: 3 });

        let expected: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
        assert_eq!(transport.delivered_ids(), expected);
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn drain_stops_at_first_failure_and_keeps_the_tail() {
        let records: Vec<ReportRecord> =
            (0..5).map(|i| make_record(&format!("Rua {i}"))).collect();
        let store = queue_with(&records);

        // Third delivery fails
        let transport = Arc::new(ScriptedTransport::failing_from(2));
        let engine = SyncEngine::new(store.clone(), Box::new(ArcTransport(transport.clone())));

        let outcome = engine.drain().await.unwrap();
        assert_eq!(
            outcome,
            SyncOutcome::Stopped {
                delivered: 2,
                remaining: 3
            }
        );

        let expected_delivered: Vec<String> =
            records[..2].iter().map(|r| r.id.clone()).collect();
        assert_eq!(transport.delivered_ids(), expected_delivered);

        let expected_left: Vec<String> = records[2..].iter().map(|r| r.id.clone()).collect();
        let left: Vec<String> = store.list().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(left, expected_left);
    }

    #[tokio::test]
    async fn failed_drain_leaves_queue_ready_for_retry() {
        let records: Vec<ReportRecord> =
            (0..2).map(|i| make_record(&format!("Rua {i}"))).collect();
        let store = queue_with(&records);

        // First pass fails on its very first delivery
        let engine = SyncEngine::new(store.clone(), Box::new(ScriptedTransport::failing_from(0)));
        let first = engine.drain().await.unwrap();
        assert_eq!(
            first,
            SyncOutcome::Stopped {
                delivered: 0,
                remaining: 2
            }
        );
        assert_eq!(store.len().unwrap(), 2);

        // Endpoint comes back; the untouched queue drains in full
        let engine = SyncEngine::new(store.clone(), Box::new(ScriptedTransport::reliable()));
        assert_eq!(
            engine.drain().await.unwrap(),
            SyncOutcome::Drained { delivered: 2 }
        );
        assert!(store.is_empty().unwrap());
    }

    /// Counts concurrently in-flight deliveries to prove drains never
    /// interleave.
    struct SlowTransport {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl SlowTransport {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ReportTransport for SlowTransport {
        async fn deliver(&self, _record: &ReportRecord) -> Result<()> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn overlapping_drains_never_interleave() {
        let records: Vec<ReportRecord> =
            (0..4).map(|i| make_record(&format!("Rua {i}"))).collect();
        let store = queue_with(&records);

        let transport = Arc::new(SlowTransport::new());
        let engine = Arc::new(SyncEngine::new(
            store.clone(),
            Box::new(ArcTransport(transport.clone())),
        ));

        let (first, second) = tokio::join!(engine.drain(), engine.drain());

        // One pass drained everything; the one that queued behind it found
        // nothing left.
        assert_eq!(first.unwrap(), SyncOutcome::Drained { delivered: 4 });
        assert_eq!(second.unwrap(), SyncOutcome::Empty);
        assert_eq!(transport.max_in_flight.load(Ordering::SeqCst), 1);
        assert!(store.is_empty().unwrap());
    }
}
