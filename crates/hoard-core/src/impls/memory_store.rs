//! InMemoryObjectStore - 開発用・テスト用の object store
//!
//! # 学習ポイント
//! - AtomicUsize による呼び出し回数の記録（テストで「何回 head / put したか」を検証）
//! - 失敗の注入（head / put それぞれに StoreError を仕込める）
//! - 人工的な遅延（並行実行のレースをテストで再現するため）

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::RemoteKey;
use crate::ports::{ObjectStore, Presence, StoreError};

/// A stored object: body plus content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Default)]
struct Faults {
    head: Option<StoreError>,
    put: Option<StoreError>,
}

/// Object store kept in a `HashMap`, with call counters and fault injection.
#[derive(Debug)]
pub struct InMemoryObjectStore {
    bucket: String,
    objects: Mutex<HashMap<RemoteKey, StoredObject>>,
    faults: Mutex<Faults>,
    latency: Option<Duration>,
    heads: AtomicUsize,
    puts: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl InMemoryObjectStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: Mutex::new(HashMap::new()),
            faults: Mutex::new(Faults::default()),
            latency: None,
            heads: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
        }
    }

    /// Delay every head / put by `latency` (simulates a slow network).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Pre-populate an object, as if another producer had written it.
    pub fn insert(&self, key: RemoteKey, body: impl Into<Vec<u8>>) {
        lock(&self.objects).insert(
            key,
            StoredObject {
                body: body.into(),
                content_type: crate::ports::OCTET_STREAM.to_string(),
            },
        );
    }

    /// Make every subsequent head fail with `error` (None clears it).
    pub fn fail_head(&self, error: Option<StoreError>) {
        lock(&self.faults).head = error;
    }

    /// Make every subsequent put fail with `error` (None clears it).
    pub fn fail_put(&self, error: Option<StoreError>) {
        lock(&self.faults).put = error;
    }

    pub fn get(&self, key: &RemoteKey) -> Option<StoredObject> {
        lock(&self.objects).get(key).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.objects).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.objects).is_empty()
    }

    pub fn head_calls(&self) -> usize {
        self.heads.load(Ordering::SeqCst)
    }

    pub fn put_calls(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn head(&self, key: &RemoteKey) -> Result<Presence, StoreError> {
        self.heads.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if let Some(err) = lock(&self.faults).head.clone() {
            return Err(err);
        }
        if lock(&self.objects).contains_key(key) {
            Ok(Presence::Found)
        } else {
            Ok(Presence::NotFound)
        }
    }

    async fn put(&self, key: &RemoteKey, body: Vec<u8>, content_type: &str) -> Result<(), StoreError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if let Some(err) = lock(&self.faults).put.clone() {
            return Err(err);
        }
        lock(&self.objects).insert(
            key.clone(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}
