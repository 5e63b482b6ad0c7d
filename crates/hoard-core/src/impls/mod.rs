//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **S3ObjectStore**: 本番用（aws-sdk-s3、S3 互換 endpoint 対応）
//! - **InMemoryObjectStore**: 開発用・テスト用（dry run、呼び出し回数の検証）

pub mod memory_store;
pub mod s3_store;

// 主要な型を再エクスポート
pub use self::memory_store::{InMemoryObjectStore, StoredObject};
pub use self::s3_store::S3ObjectStore;
