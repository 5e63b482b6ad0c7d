//! Outcome model: what happened to one artifact event.
//!
//! Outcomes are for observability only; nothing is persisted from them.

use serde::{Deserialize, Serialize};

/// The result of handling one `ArtifactEvent`.
///
/// Serialized as SCREAMING_SNAKE_CASE tags so summaries read like
/// `{"outcome":"UPLOADED"}` / `{"outcome":"FAILED","reason":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UploadOutcome {
    /// The key was already confirmed present earlier in this process.
    AlreadyCachedLocally,

    /// The existence check found the object (another producer wrote it).
    AlreadyExistsRemotely,

    /// This call wrote the object.
    Uploaded,

    /// The event failed; the key stays unknown and a later event retries.
    Failed(String),
}

impl UploadOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        UploadOutcome::Failed(reason.into())
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, UploadOutcome::Failed(_))
    }
}

/// Tallies of outcomes over a batch of records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub cached_locally: usize,
    pub exists_remotely: usize,
    pub uploaded: usize,
    pub failed: usize,
    /// Records with an event id this uploader does not handle.
    pub ignored: usize,
    /// Records that could not be decoded.
    pub malformed: usize,
}

impl OutcomeCounts {
    pub fn record(&mut self, outcome: &UploadOutcome) {
        match outcome {
            UploadOutcome::AlreadyCachedLocally => self.cached_locally += 1,
            UploadOutcome::AlreadyExistsRemotely => self.exists_remotely += 1,
            UploadOutcome::Uploaded => self.uploaded += 1,
            UploadOutcome::Failed(_) => self.failed += 1,
        }
    }

    /// Total number of handled (non-ignored, non-malformed) outcomes.
    pub fn handled(&self) -> usize {
        self.cached_locally + self.exists_remotely + self.uploaded + self.failed
    }
}
