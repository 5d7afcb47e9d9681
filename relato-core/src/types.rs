//! Core domain types for relato
//!
//! These types represent the canonical data model for incident reports as
//! they move from form input through the durable queue to the collector.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **ReportDraft** | Raw form input as captured from the field user, before validation |
//! | **ReportRecord** | An immutable, fully-assembled report awaiting (or having completed) delivery |
//! | **GpsFix** | A latitude/longitude pair from the device position source |
//! | **Drain** | One ordered pass over the queued records, delivering each in turn |
//! | **SyncOutcome** | What a drain accomplished: nothing to do, fully drained, or stopped early |
//! | **SubmissionOutcome** | What a submission accomplished: delivered now, or safely queued |
//!
//! ### Record vs Draft
//!
//! A [`ReportDraft`] is mutable user input and carries no identity. A
//! [`ReportRecord`] is minted exactly once from a draft (id, creation
//! timestamp, transcoded photo, position fix) and never changes afterwards;
//! the only thing the system ever does to an existing record is remove it
//! from the queue after the collector acknowledges it.
//!
//! Records serialize with camelCase keys. That shape is the collector wire
//! contract and the persisted queue format, so both stay stable together.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================
// Position
// ============================================

/// A device position fix.
///
/// Latitude and longitude always travel together; a report either has a
/// complete fix or none at all.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsFix {
    /// Degrees north of the equator
    pub latitude: f64,
    /// Degrees east of the prime meridian
    pub longitude: f64,
}

// ============================================
// Drafts
// ============================================

/// Raw form input for one incident report.
///
/// `user_date` and `user_time` are free-form strings declared by the user
/// for when the incident occurred; they are never validated against the
/// enqueue timestamp.
#[derive(Debug, Clone, Default)]
pub struct ReportDraft {
    /// User-declared occurrence date
    pub user_date: String,
    /// User-declared occurrence time
    pub user_time: String,
    /// Region name (required)
    pub region: String,
    /// Neighborhood name (required)
    pub neighborhood: String,
    /// Street name (required)
    pub street: String,
    /// Free-text reference point near the incident
    pub reference: Option<String>,
    /// Free-text description
    pub note: Option<String>,
    /// Raw photo bytes in any common raster format
    pub photo: Option<Vec<u8>>,
}

// ============================================
// Records
// ============================================

/// An immutable incident report, as queued and as sent to the collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRecord {
    /// Unique identifier (UUID v4), assigned at creation
    pub id: String,
    /// When the record was created and enqueued
    pub created_at: DateTime<Utc>,
    /// User-declared occurrence date
    pub user_date: String,
    /// User-declared occurrence time
    pub user_time: String,
    /// Region name
    pub region: String,
    /// Neighborhood name
    pub neighborhood: String,
    /// Street name
    pub street: String,
    /// Free-text reference point
    pub reference: Option<String>,
    /// Free-text description
    pub note: Option<String>,
    /// Device position at submission time, if one was available
    pub location: Option<GpsFix>,
    /// Transcoded photo as a bare base64 JPEG payload (no data-URI prefix)
    pub image_data: Option<String>,
}

impl ReportRecord {
    /// Mint a record from validated form input.
    ///
    /// Assigns a fresh UUID and the current UTC timestamp. The photo must
    /// already be transcoded; the draft's raw bytes are not carried over.
    pub fn from_draft(
        draft: &ReportDraft,
        location: Option<GpsFix>,
        image_data: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            user_date: draft.user_date.clone(),
            user_time: draft.user_time.clone(),
            region: draft.region.trim().to_string(),
            neighborhood: draft.neighborhood.trim().to_string(),
            street: draft.street.trim().to_string(),
            reference: draft.reference.clone(),
            note: draft.note.clone(),
            location,
            image_data,
        }
    }
}

// ============================================
// Outcomes
// ============================================

/// Result of one drain pass over the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The queue snapshot was empty; nothing was transmitted
    Empty,
    /// Every snapshotted record was delivered and removed
    Drained {
        /// Number of records delivered
        delivered: usize,
    },
    /// Delivery failed partway; later records were left untouched
    Stopped {
        /// Records delivered and removed before the failure
        delivered: usize,
        /// Snapshotted records still queued, the failed one included
        remaining: usize,
    },
}

impl SyncOutcome {
    /// Number of records delivered during this pass
    pub fn delivered(&self) -> usize {
        match self {
            SyncOutcome::Empty => 0,
            SyncOutcome::Drained { delivered } => *delivered,
            SyncOutcome::Stopped { delivered, .. } => *delivered,
        }
    }

    /// True when the pass left nothing from its snapshot behind
    pub fn is_complete(&self) -> bool {
        !matches!(self, SyncOutcome::Stopped { .. })
    }
}

/// Result of one submission.
///
/// Rejection (validation, transcode, or storage failure) is the `Err` arm
/// of [`submit`](crate::submit::SubmissionCoordinator::submit); any variant
/// here means the report is safely in the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Queued and confirmed delivered by the immediate drain
    Delivered {
        /// Id of the new record
        id: String,
    },
    /// Queued; delivery waits for connectivity or a manual sync
    Pending {
        /// Id of the new record
        id: String,
    },
}

impl SubmissionOutcome {
    /// Id of the record this submission created
    pub fn id(&self) -> &str {
        match self {
            SubmissionOutcome::Delivered { id } => id,
            SubmissionOutcome::Pending { id } => id,
        }
    }

    /// True when the report reached the collector during submission
    pub fn is_delivered(&self) -> bool {
        matches!(self, SubmissionOutcome::Delivered { .. })
    }
}
