//! Domain model (events, remote keys, outcomes, errors).
//!
//! I/O を一切含まない層。key の導出規則と event の解釈はここで完結させる。

pub mod errors;
pub mod event;
pub mod key;
pub mod outcome;

pub use self::errors::UploadError;
pub use self::event::{ArtifactEvent, ArtifactKind, EventError, EventRecord};
pub use self::key::{Category, RemoteKey};
pub use self::outcome::{OutcomeCounts, UploadOutcome};
