//! App - アプリケーション層
//!
//! ports を組み合わせて dedup upload を実装します。
//!
//! # 主要コンポーネント
//! - **UploadCoordinator**: cache → head → put の dedup protocol
//! - **SinkRegistry**: 出力先（OutputSink）の登録
//! - **Dispatcher**: record を sink ごとの task に振り分けて集計

pub mod coordinator;
pub mod dispatcher;
pub mod registry;

// 主要な型を再エクスポート
pub use self::coordinator::UploadCoordinator;
pub use self::dispatcher::Dispatcher;
pub use self::registry::{DispatchError, SinkRegistry};
