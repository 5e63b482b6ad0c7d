//! UploadCoordinator - dedup protocol
//!
//! # フロー
//! 1. event から RemoteKey を導出
//! 2. DedupCache に key があれば何もしない（network 0 回）
//! 3. ObjectStore::head() で存在確認
//!    - Found: 他の producer が書き込み済み → cache に記録して終了
//!    - NotFound: 4 へ
//!    - それ以外のエラー: この event は失敗（cache も put も触らない）
//! 4. local file を読み、ObjectStore::put() で書き込み
//! 5. 成功したら cache に記録
//!
//! cache は常に完全な RemoteKey（`category/hash`）で引く。

use std::sync::Arc;

use async_trait::async_trait;

use crate::cache::{DedupCache, KeyLocks};
use crate::config::UploaderConfig;
use crate::domain::{ArtifactEvent, RemoteKey, UploadError, UploadOutcome};
use crate::ports::{OCTET_STREAM, ObjectStore, OutputSink, Presence};

/// Ensures each unique artifact reaches the store once.
///
/// Owns its `DedupCache`; nothing else reads or writes it. Several
/// coordinators with different stores can live in one process.
pub struct UploadCoordinator {
    name: String,
    store: Arc<dyn ObjectStore>,
    cache: DedupCache,
    locks: Option<KeyLocks>,
}

impl UploadCoordinator {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self::with_cache(store, DedupCache::new(), &UploaderConfig::default())
    }

    pub fn with_config(store: Arc<dyn ObjectStore>, config: &UploaderConfig) -> Self {
        Self::with_cache(store, DedupCache::new(), config)
    }

    pub fn with_cache(store: Arc<dyn ObjectStore>, cache: DedupCache, config: &UploaderConfig) -> Self {
        let name = format!("s3:{}", store.bucket());
        Self {
            name,
            store,
            cache,
            locks: config.single_flight.then(KeyLocks::new),
        }
    }

    /// Override the sink name (defaults to `s3:<bucket>`).
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn cache(&self) -> &DedupCache {
        &self.cache
    }

    /// Run the dedup protocol for one event.
    pub async fn upload(&self, event: &ArtifactEvent) -> Result<UploadOutcome, UploadError> {
        let key = event.remote_key();

        if self.cache.contains(&key) {
            tracing::debug!(%key, "Already uploaded file {key}, skipping");
            return Ok(UploadOutcome::AlreadyCachedLocally);
        }

        // single-flight: 同じ key の並行呼び出しはここで直列化される
        let _guard = match &self.locks {
            Some(locks) => {
                let guard = locks.lock(&key).await;
                // 待っている間に先行の呼び出しが完了していれば network 不要
                if self.cache.contains(&key) {
                    tracing::debug!(%key, "File {key} was uploaded while waiting, skipping");
                    return Ok(UploadOutcome::AlreadyCachedLocally);
                }
                Some(guard)
            }
            None => None,
        };

        self.check_then_write(&key, event).await
    }

    async fn check_then_write(
        &self,
        key: &RemoteKey,
        event: &ArtifactEvent,
    ) -> Result<UploadOutcome, UploadError> {
        let presence = self
            .store
            .head(key)
            .await
            .map_err(|source| UploadError::ExistenceCheck {
                key: key.clone(),
                source,
            })?;

        if presence == Presence::Found {
            tracing::info!(%key, bucket = self.store.bucket(), "Somebody else already uploaded file {key}");
            self.cache.mark_known(key);
            return Ok(UploadOutcome::AlreadyExistsRemotely);
        }

        tracing::info!(
            %key,
            path = %event.local_path.display(),
            bucket = self.store.bucket(),
            "Uploading file {key} ({})",
            event.local_path.display()
        );
        let body = tokio::fs::read(&event.local_path)
            .await
            .map_err(|source| UploadError::ReadArtifact {
                path: event.local_path.clone(),
                source,
            })?;

        self.store
            .put(key, body, OCTET_STREAM)
            .await
            .map_err(|source| UploadError::Write {
                key: key.clone(),
                source,
            })?;

        self.cache.mark_known(key);
        Ok(UploadOutcome::Uploaded)
    }
}

#[async_trait]
impl OutputSink for UploadCoordinator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: &ArtifactEvent) -> UploadOutcome {
        match self.upload(event).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(sink = %self.name, key = ?err.key(), error = %err, "Upload failed");
                UploadOutcome::failed(err.to_string())
            }
        }
    }
}
