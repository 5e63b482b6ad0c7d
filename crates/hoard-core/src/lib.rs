//! hoard-core
//!
//! Content-addressed, deduplicating uploader for locally captured artifacts.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（event, key, outcome, errors）
//! - **ports**: 抽象化レイヤー（ObjectStore, OutputSink）
//! - **cache**: DedupCache と per-key single-flight lock
//! - **app**: アプリケーションロジック（UploadCoordinator, SinkRegistry, Dispatcher）
//! - **impls**: ports の実装（S3ObjectStore, InMemoryObjectStore）
//! - **config**: store / uploader の設定

pub mod domain;
pub mod ports;
pub mod cache;
pub mod app;
pub mod impls;
pub mod config;

pub use app::{Dispatcher, SinkRegistry, UploadCoordinator};
pub use cache::DedupCache;
pub use config::{ConfigError, StoreConfig, UploaderConfig};
pub use domain::{ArtifactEvent, ArtifactKind, EventRecord, OutcomeCounts, RemoteKey, UploadOutcome};
