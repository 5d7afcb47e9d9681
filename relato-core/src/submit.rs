//! Submission orchestration
//!
//! [`SubmissionCoordinator::submit`] is the single entry point for new
//! reports: validate the form input, transcode the photo, append to the
//! durable queue, then opportunistically drain. The append happens for
//! every accepted report whether or not the device is online; the queue is
//! the only delivery path, so there is no direct-send shortcut to race
//! against it.
//!
//! `Err` from `submit` always means nothing was queued. Once the append
//! succeeds the submission cannot fail anymore, only come back as
//! [`SubmissionOutcome::Pending`] instead of delivered.

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::store::QueueStore;
use crate::sync::SyncEngine;
use crate::transcode::ImageTranscoder;
use crate::types::{GpsFix, ReportDraft, ReportRecord, SubmissionOutcome};

/// Turns validated form input into queued (and, connectivity permitting,
/// delivered) reports.
///
/// The coordinator holds subscriptions to the connectivity signal and the
/// position feed; dropping it releases both. With no sync engine configured
/// it still accepts reports, which then wait for a manual sync.
pub struct SubmissionCoordinator {
    store: Arc<QueueStore>,
    engine: Option<Arc<SyncEngine>>,
    transcoder: ImageTranscoder,
    connectivity: watch::Receiver<bool>,
    position: watch::Receiver<Option<GpsFix>>,
}

impl SubmissionCoordinator {
    /// Build a coordinator from its collaborators.
    ///
    /// `connectivity` and `position` are subscriptions, typically from
    /// [`ConnectivitySignal::subscribe`](crate::signals::ConnectivitySignal::subscribe)
    /// and [`PositionFeed::subscribe`](crate::signals::PositionFeed::subscribe).
    pub fn new(
        store: Arc<QueueStore>,
        engine: Option<Arc<SyncEngine>>,
        transcoder: ImageTranscoder,
        connectivity: watch::Receiver<bool>,
        position: watch::Receiver<Option<GpsFix>>,
    ) -> Self {
        Self {
            store,
            engine,
            transcoder,
            connectivity,
            position,
        }
    }

    /// Submit one report.
    ///
    /// Steps, in order:
    /// 1. validate that region, neighborhood and street are non-empty;
    /// 2. transcode the photo, if the draft carries one;
    /// 3. mint a [`ReportRecord`] (fresh id, enqueue timestamp, latest
    ///    position fix) and append it to the queue;
    /// 4. when online and a collector is configured, drain immediately.
    ///
    /// Returns [`SubmissionOutcome::Delivered`] only when the immediate
    /// drain confirmed the record reached the collector; any other accepted
    /// submission is [`SubmissionOutcome::Pending`]. Validation, transcode
    /// and storage failures abort before anything is queued.
    pub async fn submit(&self, mut draft: ReportDraft) -> Result<SubmissionOutcome> {
        validate_draft(&draft)?;

        let image_data = match draft.photo.take() {
            Some(bytes) => Some(self.transcoder.transcode(bytes).await?),
            None => None,
        };

        let location = *self.position.borrow();
        let record = ReportRecord::from_draft(&draft, location, image_data);
        let id = record.id.clone();

        self.store.append(&record)?;
        tracing::info!(id = %id, street = %record.street, "report queued");

        let Some(engine) = &self.engine else {
            tracing::debug!(id = %id, "no collector configured, report stays queued");
            return Ok(SubmissionOutcome::Pending { id });
        };

        if !*self.connectivity.borrow() {
            tracing::debug!(id = %id, "device offline, report stays queued");
            return Ok(SubmissionOutcome::Pending { id });
        }

        match engine.drain().await {
            // A complete pass means this record, appended last, went out too
            Ok(outcome) if outcome.is_complete() => Ok(SubmissionOutcome::Delivered { id }),
            Ok(_) => Ok(SubmissionOutcome::Pending { id }),
            Err(e) => {
                tracing::error!(id = %id, error = %e, "drain after submit failed");
                Ok(SubmissionOutcome::Pending { id })
            }
        }
    }

    /// Number of reports waiting for delivery
    pub fn pending_count(&self) -> Result<usize> {
        self.store.len()
    }
}

/// Region, neighborhood and street must be non-empty after trimming
fn validate_draft(draft: &ReportDraft) -> Result<()> {
    let mut missing = Vec::new();
    if draft.region.trim().is_empty() {
        missing.push("region");
    }
    if draft.neighborhood.trim().is_empty() {
        missing.push("neighborhood");
    }
    if draft.street.trim().is_empty() {
        missing.push("street");
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "missing required fields: {}",
            missing.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::ReportTransport;
    use async_trait::async_trait;
    use std::io::Cursor;

    /// Always succeeds or always fails, nothing in between
    struct StaticTransport {
        succeed: bool,
    }

    #[async_trait]
    impl ReportTransport for StaticTransport {
        async fn deliver(&self, _record: &ReportRecord) -> Result<()> {
            if self.succeed {
                Ok(())
            } else {
                Err(Error::Transmission("endpoint unreachable".to_string()))
            }
        }
    }

    struct TestRig {
        store: Arc<QueueStore>,
        coordinator: SubmissionCoordinator,
        connectivity_tx: watch::Sender<bool>,
        position_tx: watch::Sender<Option<GpsFix>>,
    }

    fn rig(online: bool, transport: Option<StaticTransport>) -> TestRig {
        let store = Arc::new(QueueStore::open_in_memory().unwrap());
        let engine = transport.map(|t| {
            let boxed: Box<dyn ReportTransport> = Box::new(t);
            Arc::new(SyncEngine::new(store.clone(), boxed))
        });

        let (connectivity_tx, connectivity_rx) = watch::channel(online);
        let (position_tx, position_rx) = watch::channel(None);

        let coordinator = SubmissionCoordinator::new(
            store.clone(),
            engine,
            ImageTranscoder::default(),
            connectivity_rx,
            position_rx,
        );

        TestRig {
            store,
            coordinator,
            connectivity_tx,
            position_tx,
        }
    }

    fn make_draft() -> ReportDraft {
        ReportDraft {
            user_date: "2024-05-10".to_string(),
            user_time: "18:45".to_string(),
            region: "Zona Norte".to_string(),
            neighborhood: "Jardim América".to_string(),
            street: "Av. Brasil".to_string(),
            reference: Some("in front of no. 51".to_string()),
            note: Some("fallen tree".to_string()),
            photo: None,
        }
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(width, height));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[tokio::test]
    async fn empty_street_is_rejected_without_touching_the_queue() {
        let rig = rig(true, Some(StaticTransport { succeed: true }));
        let mut draft = make_draft();
        draft.street = String::new();

        let err = rig.coordinator.submit(draft).await.unwrap_err();
        assert!(matches!(err, Error::Validation(ref msg) if msg.contains("street")));
        assert!(rig.store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn whitespace_only_fields_are_rejected() {
        let rig = rig(false, None);
        let mut draft = make_draft();
        draft.region = "   ".to_string();
        draft.neighborhood = "\t".to_string();

        let err = rig.coordinator.submit(draft).await.unwrap_err();
        match err {
            Error::Validation(msg) => {
                assert!(msg.contains("region"));
                assert!(msg.contains("neighborhood"));
                assert!(!msg.contains("street"));
            }
            other => panic!("expected Validation, got {:?}", other),
        }
        assert!(rig.store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn offline_submission_queues_and_reports_pending() {
        let rig = rig(false, Some(StaticTransport { succeed: true }));

        let outcome = rig.coordinator.submit(make_draft()).await.unwrap();
        assert!(!outcome.is_delivered());
        assert_eq!(rig.coordinator.pending_count().unwrap(), 1);

        let queued = rig.store.list().unwrap();
        assert_eq!(queued[0].id, outcome.id());
    }

    #[tokio::test]
    async fn two_offline_submissions_queue_two_distinct_records() {
        let rig = rig(false, None);

        let first = rig.coordinator.submit(make_draft()).await.unwrap();
        let second = rig.coordinator.submit(make_draft()).await.unwrap();

        assert_ne!(first.id(), second.id());

        let ids: Vec<String> = rig.store.list().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![first.id().to_string(), second.id().to_string()]);
    }

    #[tokio::test]
    async fn online_submission_drains_and_reports_delivered() {
        let rig = rig(true, Some(StaticTransport { succeed: true }));

        let outcome = rig.coordinator.submit(make_draft()).await.unwrap();
        assert!(outcome.is_delivered());
        assert!(rig.store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn failed_delivery_keeps_the_record_queued() {
        let rig = rig(true, Some(StaticTransport { succeed: false }));

        let outcome = rig.coordinator.submit(make_draft()).await.unwrap();
        assert!(!outcome.is_delivered());
        assert_eq!(rig.store.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn online_without_collector_stays_pending() {
        let rig = rig(true, None);

        let outcome = rig.coordinator.submit(make_draft()).await.unwrap();
        assert!(!outcome.is_delivered());
        assert_eq!(rig.store.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn connectivity_transition_is_respected_per_submission() {
        let rig = rig(false, Some(StaticTransport { succeed: true }));

        let offline = rig.coordinator.submit(make_draft()).await.unwrap();
        assert!(!offline.is_delivered());

        rig.connectivity_tx.send_replace(true);
        let online = rig.coordinator.submit(make_draft()).await.unwrap();
        // The drain triggered by the second submission flushes both records
        assert!(online.is_delivered());
        assert!(rig.store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn undecodable_photo_aborts_without_queueing() {
        let rig = rig(true, Some(StaticTransport { succeed: true }));
        let mut draft = make_draft();
        draft.photo = Some(b"not an image at all".to_vec());

        let err = rig.coordinator.submit(draft).await.unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
        assert!(rig.store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn photo_is_transcoded_into_the_queued_record() {
        let rig = rig(false, None);
        let mut draft = make_draft();
        draft.photo = Some(png_bytes(64, 48));

        rig.coordinator.submit(draft).await.unwrap();

        let queued = rig.store.list().unwrap();
        let payload = queued[0].image_data.as_ref().expect("image payload");
        assert!(!payload.starts_with("data:"));
        assert!(!payload.is_empty());
    }

    #[tokio::test]
    async fn latest_position_fix_is_attached() {
        let rig = rig(false, None);

        let without_fix = rig.coordinator.submit(make_draft()).await.unwrap();

        let fix = GpsFix {
            latitude: -23.5505,
            longitude: -46.6333,
        };
        rig.position_tx.send_replace(Some(fix));
        let with_fix = rig.coordinator.submit(make_draft()).await.unwrap();

        let queued = rig.store.list().unwrap();
        let first = queued.iter().find(|r| r.id == without_fix.id()).unwrap();
        let second = queued.iter().find(|r| r.id == with_fix.id()).unwrap();
        assert_eq!(first.location, None);
        assert_eq!(second.location, Some(fix));
    }
}
