//! Artifact events and the inbound record contract.
//!
//! The event source hands us loosely-typed records; this module is the
//! filtering boundary that turns the ones we care about into `ArtifactEvent`.
//! Records with an unknown `eventid` are not errors, they are simply not ours.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::key::{Category, RemoteKey};

pub const FILE_DOWNLOAD_EVENT: &str = "cowrie.session.file_download";
pub const FILE_UPLOAD_EVENT: &str = "cowrie.session.file_upload";
pub const SESSION_CLOSED_EVENT: &str = "cowrie.log.closed";

/// The kinds of artifact this uploader handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    DownloadFile,
    UploadFile,
    SessionClosed,
}

impl ArtifactKind {
    /// Map an inbound `eventid` to a kind. Unknown ids yield `None`.
    pub fn from_event_id(event_id: &str) -> Option<Self> {
        match event_id {
            FILE_DOWNLOAD_EVENT => Some(ArtifactKind::DownloadFile),
            FILE_UPLOAD_EVENT => Some(ArtifactKind::UploadFile),
            SESSION_CLOSED_EVENT => Some(ArtifactKind::SessionClosed),
            _ => None,
        }
    }

    pub fn category(&self) -> Category {
        match self {
            ArtifactKind::DownloadFile | ArtifactKind::UploadFile => Category::Downloads,
            ArtifactKind::SessionClosed => Category::Tty,
        }
    }

    /// Name of the record field carrying the local file path for this kind.
    pub fn path_field(&self) -> &'static str {
        match self {
            ArtifactKind::DownloadFile | ArtifactKind::UploadFile => "outfile",
            ArtifactKind::SessionClosed => "ttylog",
        }
    }
}

/// Raw inbound record, as produced by the event source.
///
/// Only the fields the uploader reads are modelled; anything else in the
/// JSON object is ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(alias = "eventId")]
    pub eventid: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shasum: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outfile: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttylog: Option<String>,
}

impl EventRecord {
    pub fn new(eventid: impl Into<String>) -> Self {
        Self {
            eventid: eventid.into(),
            ..Self::default()
        }
    }

    pub fn with_shasum(mut self, shasum: impl Into<String>) -> Self {
        self.shasum = Some(shasum.into());
        self
    }

    pub fn with_outfile(mut self, outfile: impl Into<String>) -> Self {
        self.outfile = Some(outfile.into());
        self
    }

    pub fn with_ttylog(mut self, ttylog: impl Into<String>) -> Self {
        self.ttylog = Some(ttylog.into());
        self
    }
}

/// EventError は「自分宛て」の record が壊れていたときのエラー
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EventError {
    #[error("event {eventid} is missing required field `{field}`")]
    MissingField {
        eventid: String,
        field: &'static str,
    },

    #[error("event {eventid} has an empty shasum")]
    EmptyHash { eventid: String },
}

/// One observed artifact instance. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactEvent {
    pub kind: ArtifactKind,
    pub content_hash: String,
    pub local_path: PathBuf,
}

impl ArtifactEvent {
    pub fn new(kind: ArtifactKind, content_hash: impl Into<String>, local_path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            content_hash: content_hash.into(),
            local_path: local_path.into(),
        }
    }

    /// Decode a raw record.
    ///
    /// - `Ok(None)`: the record is not an artifact event (ignored)
    /// - `Err(_)`: a recognized event id with missing or empty fields
    pub fn from_record(record: &EventRecord) -> Result<Option<Self>, EventError> {
        let Some(kind) = ArtifactKind::from_event_id(&record.eventid) else {
            return Ok(None);
        };

        let content_hash = record.shasum.as_deref().ok_or_else(|| EventError::MissingField {
            eventid: record.eventid.clone(),
            field: "shasum",
        })?;
        if content_hash.is_empty() {
            return Err(EventError::EmptyHash {
                eventid: record.eventid.clone(),
            });
        }

        let path = match kind {
            ArtifactKind::DownloadFile | ArtifactKind::UploadFile => record.outfile.as_deref(),
            ArtifactKind::SessionClosed => record.ttylog.as_deref(),
        };
        let local_path = path.ok_or_else(|| EventError::MissingField {
            eventid: record.eventid.clone(),
            field: kind.path_field(),
        })?;

        Ok(Some(Self::new(kind, content_hash, local_path)))
    }

    pub fn category(&self) -> Category {
        self.kind.category()
    }

    pub fn remote_key(&self) -> RemoteKey {
        RemoteKey::new(self.category(), &self.content_hash)
    }
}
