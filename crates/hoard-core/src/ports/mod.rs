//! Ports - 抽象化レイヤー
//!
//! 外部システム（S3 互換 object store など）と、
//! event 配送側から見た出力先のインターフェースを定義します。
//!
//! # 設計原則
//! - object store が「存在するか」の正本（DedupCache はただの最適化）
//! - coordinator は trait object 越しにしか store を触らない（fake に差し替え可能）

pub mod object_store;
pub mod output_sink;

// 主要な trait を再エクスポート
pub use self::object_store::{ObjectStore, Presence, StoreError, OCTET_STREAM};
pub use self::output_sink::OutputSink;
