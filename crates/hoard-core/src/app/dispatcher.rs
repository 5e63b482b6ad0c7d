//! Dispatcher - record を sink ごとの task に振り分ける
//!
//! # フロー
//! 1. record を ArtifactEvent に変換（対象外の eventid は無視）
//! 2. 登録済みの sink ごとに tokio task を 1 本 spawn
//! 3. 完了した task は submit のたびに回収して OutcomeCounts に集計
//! 4. drain() で残りの task を全部待つ
//!
//! record を読む側は head / put の完了を待たない。

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

use super::registry::SinkRegistry;
use crate::domain::{ArtifactEvent, EventRecord, OutcomeCounts, UploadOutcome};

/// Fans artifact events out to every registered sink, one task per sink.
pub struct Dispatcher {
    registry: Arc<SinkRegistry>,
    tasks: JoinSet<UploadOutcome>,
    permits: Option<Arc<Semaphore>>,
    counts: OutcomeCounts,
}

impl Dispatcher {
    pub fn new(registry: Arc<SinkRegistry>) -> Self {
        Self {
            registry,
            tasks: JoinSet::new(),
            permits: None,
            counts: OutcomeCounts::default(),
        }
    }

    /// Cap the number of sink calls running at once (0 = unbounded).
    ///
    /// This bounds store traffic, not memory. Tasks are still spawned
    /// immediately and wait for a permit inside the task, so `submit` never
    /// blocks; while input outpaces uploads the backlog of waiting tasks
    /// (see `in_flight`) keeps growing.
    pub fn with_max_in_flight(mut self, max: usize) -> Self {
        self.permits = (max > 0).then(|| Arc::new(Semaphore::new(max)));
        self
    }

    /// Decode a JSON line and submit it. Returns the number of tasks spawned.
    pub fn submit_json(&mut self, line: &str) -> usize {
        match serde_json::from_str::<EventRecord>(line) {
            Ok(record) => self.submit(&record),
            Err(e) => {
                tracing::warn!(error = %e, "Dropping undecodable event record");
                self.counts.malformed += 1;
                0
            }
        }
    }

    /// Submit a raw record. Returns the number of tasks spawned.
    pub fn submit(&mut self, record: &EventRecord) -> usize {
        match ArtifactEvent::from_record(record) {
            Ok(Some(event)) => self.submit_event(event),
            Ok(None) => {
                self.counts.ignored += 1;
                0
            }
            Err(e) => {
                tracing::warn!(error = %e, "Dropping malformed artifact event");
                self.counts.malformed += 1;
                0
            }
        }
    }

    /// Spawn one task per sink for `event`. Must be called inside a tokio runtime.
    pub fn submit_event(&mut self, event: ArtifactEvent) -> usize {
        self.reap();

        let event = Arc::new(event);
        let mut spawned = 0;
        for sink in self.registry.iter() {
            let sink = Arc::clone(sink);
            let event = Arc::clone(&event);
            let permits = self.permits.clone();

            self.tasks.spawn(async move {
                let _permit = match permits {
                    Some(permits) => permits.acquire_owned().await.ok(),
                    None => None,
                };
                sink.handle(&event).await
            });
            spawned += 1;
        }
        spawned
    }

    /// Tasks spawned but not yet collected.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Counts of everything collected so far.
    pub fn counts(&self) -> &OutcomeCounts {
        &self.counts
    }

    /// Wait for every in-flight task and return the final counts.
    pub async fn drain(mut self) -> OutcomeCounts {
        while let Some(result) = self.tasks.join_next().await {
            self.collect(result);
        }
        self.counts
    }

    fn reap(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            self.collect(result);
        }
    }

    fn collect(&mut self, result: Result<UploadOutcome, JoinError>) {
        match result {
            Ok(outcome) => self.counts.record(&outcome),
            Err(e) => {
                // sink の panic はその event の失敗として扱う
                tracing::error!(error = %e, "Sink task did not complete");
                self.counts.record(&UploadOutcome::failed(e.to_string()));
            }
        }
    }
}
