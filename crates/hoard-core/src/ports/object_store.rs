//! ObjectStore port - リモート object store（S3 / S3 互換 / InMemory）
//!
//! coordinator が必要とするのは 2 つの操作だけ:
//! - head: metadata のみの存在確認
//! - put: 本体の書き込み
//!
//! 認証・HTTP リトライ・TLS・timeout は実装側の責務。

use async_trait::async_trait;

use crate::domain::RemoteKey;

/// Content type used for every artifact body.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Result of a successful existence check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Found,
    NotFound,
}

/// Anything the store reports other than a clean found / not-found.
///
/// Implementations must map the store's canonical not-found signal
/// (HTTP 404, `NotFound`) to `Ok(Presence::NotFound)`, never to an error.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{operation} timed out")]
    Timeout { operation: &'static str },

    #[error("store rejected request (status={status:?}): {message}")]
    Service { status: Option<u16>, message: String },

    #[error("transport error: {0}")]
    Transport(String),
}

/// ObjectStore はバケット 1 つ分の存在確認と書き込み
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Bucket this store writes into (for logging).
    fn bucket(&self) -> &str;

    async fn head(&self, key: &RemoteKey) -> Result<Presence, StoreError>;

    async fn put(&self, key: &RemoteKey, body: Vec<u8>, content_type: &str) -> Result<(), StoreError>;
}
