//! Errors - 1 event の処理失敗
//!
//! どの variant もその event 限りで致命的。プロセスは止めず、
//! cache も変更しない（同じ key の次の event が最初からやり直す）。

use std::path::PathBuf;

use super::key::RemoteKey;
use crate::ports::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The existence check returned neither a clean "found" nor "not found".
    #[error("existence check for {key} failed: {source}")]
    ExistenceCheck {
        key: RemoteKey,
        #[source]
        source: StoreError,
    },

    #[error("failed to read artifact {}: {source}", path.display())]
    ReadArtifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("upload of {key} failed: {source}")]
    Write {
        key: RemoteKey,
        #[source]
        source: StoreError,
    },
}

impl UploadError {
    pub fn key(&self) -> Option<&RemoteKey> {
        match self {
            UploadError::ExistenceCheck { key, .. } | UploadError::Write { key, .. } => Some(key),
            UploadError::ReadArtifact { .. } => None,
        }
    }
}
