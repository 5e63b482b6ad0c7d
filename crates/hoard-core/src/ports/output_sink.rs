//! OutputSink port - artifact event の出力先
//!
//! Dispatcher から見た唯一のインターフェース。uploader 以外の出力先も
//! 同じ trait を実装すれば同じ経路で event を受け取れる。

use async_trait::async_trait;

use crate::domain::{ArtifactEvent, UploadOutcome};

/// A destination for artifact events.
///
/// `handle` never returns an error: failures are reported as
/// `UploadOutcome::Failed` so one bad event cannot stop the dispatcher.
#[async_trait]
pub trait OutputSink: Send + Sync {
    /// Unique name used for registration and log fields.
    fn name(&self) -> &str;

    async fn handle(&self, event: &ArtifactEvent) -> UploadOutcome;
}
