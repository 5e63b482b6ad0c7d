//! Remote key derivation.
//!
//! # 命名規約
//! - `{category}/{content_hash}`
//! - 例: `downloads/9f86d081...`, `tty/2c26b46b...`
//!
//! category が異なれば同じ hash でも key は衝突しない。

use serde::{Deserialize, Serialize};
use std::fmt;

/// Namespace under which an artifact is stored remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Files downloaded or uploaded during a session.
    Downloads,
    /// Session (tty) recordings.
    Tty,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Downloads => "downloads",
            Category::Tty => "tty",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// RemoteKey は object store 上の key（`category/hash`）
///
/// # 不変条件
/// - 同じ content は常に同じ key になる
/// - DedupCache / KeyLocks / ObjectStore すべてがこの型で key を扱う
///   （bare hash で cache を引くことはない）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteKey(String);

impl RemoteKey {
    pub fn new(category: Category, content_hash: &str) -> Self {
        Self(format!("{}/{}", category.as_str(), content_hash))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RemoteKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
