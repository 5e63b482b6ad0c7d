//! DedupCache と per-key lock
//!
//! # 学習ポイント
//! - std::sync::Mutex による内部可変性（await を跨いでロックしない）
//! - tokio::sync::Mutex::lock_owned による key ごとの single-flight
//! - Arc::strong_count を使った lock エントリの後片付け

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::RemoteKey;

fn lock_ignoring_poison<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // 中身は set / map への単純な挿入・削除だけなので、poison されても整合性は壊れない
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Keys known, within this process's lifetime, to exist remotely.
///
/// Append-only: once `contains(k)` is true it stays true. Not persisted; a
/// restart only costs one extra existence check per key.
#[derive(Debug, Default)]
pub struct DedupCache {
    known: Mutex<HashSet<RemoteKey>>,
}

impl DedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &RemoteKey) -> bool {
        lock_ignoring_poison(&self.known).contains(key)
    }

    /// Idempotent.
    pub fn mark_known(&self, key: &RemoteKey) {
        let mut known = lock_ignoring_poison(&self.known);
        if !known.contains(key) {
            known.insert(key.clone());
        }
    }

    pub fn len(&self) -> usize {
        lock_ignoring_poison(&self.known).len()
    }

    pub fn is_empty(&self) -> bool {
        lock_ignoring_poison(&self.known).is_empty()
    }
}

type Slot = Arc<tokio::sync::Mutex<()>>;

/// KeyLocks は key ごとの非同期 lock
///
/// # 実装詳細
/// - HashMap<RemoteKey, Arc<tokio::sync::Mutex<()>>> を std Mutex で保護
/// - lock 取得待ちは tokio 側で行う（std Mutex は map 操作の間だけ）
/// - 最後の保持者が guard を drop したときにエントリを消す
#[derive(Debug, Default)]
pub struct KeyLocks {
    slots: Mutex<HashMap<RemoteKey, Slot>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other caller holds `key`, then hold it until the guard drops.
    pub async fn lock(&self, key: &RemoteKey) -> KeyGuard<'_> {
        let slot = {
            let mut slots = lock_ignoring_poison(&self.slots);
            slots.entry(key.clone()).or_default().clone()
        };
        let guard = slot.clone().lock_owned().await;
        KeyGuard {
            locks: self,
            key: key.clone(),
            slot,
            guard: Some(guard),
        }
    }

    /// Number of keys currently held or awaited.
    pub fn in_flight(&self) -> usize {
        lock_ignoring_poison(&self.slots).len()
    }
}

/// Holds one key of a `KeyLocks` until dropped.
pub struct KeyGuard<'a> {
    locks: &'a KeyLocks,
    key: RemoteKey,
    slot: Slot,
    guard: Option<tokio::sync::OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        // 先に tokio 側の lock を解放して、待っている caller を起こす
        drop(self.guard.take());

        let mut slots = lock_ignoring_poison(&self.locks.slots);
        // map と self.slot の 2 つだけ = 待っている caller がいない
        if Arc::strong_count(&self.slot) == 2 {
            slots.remove(&self.key);
        }
    }
}
