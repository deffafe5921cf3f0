//! Repository Layer - Core Traits
//!
//! Defines the key-value storage interface the shelf persists through.
//! Implementations can use SQLite, in-memory, etc.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Storage consumption snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    pub used_bytes: u64,
    pub total_bytes: u64,
    /// `used_bytes / total_bytes * 100`
    pub percent: f64,
}

impl UsageStats {
    pub fn new(used_bytes: u64, total_bytes: u64) -> Self {
        let percent = if total_bytes == 0 {
            100.0
        } else {
            used_bytes as f64 / total_bytes as f64 * 100.0
        };
        Self {
            used_bytes,
            total_bytes,
            percent,
        }
    }
}

/// Key-value persistence
///
/// Failures are reported as `false`, never as a panic. A write that would
/// exceed the quota leaves the previous value in place.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Read and parse a key; `None` if missing or not valid JSON
    async fn get(&self, key: &str) -> Option<Value>;

    /// Read the raw stored text
    async fn get_raw(&self, key: &str) -> Option<String>;

    /// Serialize and store a value
    async fn set(&self, key: &str, value: &Value) -> bool;

    /// Store several values all-or-nothing
    async fn set_many(&self, entries: &[(String, Value)]) -> bool {
        for (key, value) in entries {
            if !self.set(key, value).await {
                return false;
            }
        }
        true
    }

    async fn remove(&self, key: &str) -> bool;

    async fn usage_stats(&self) -> UsageStats;
}

/// Byte cost of one entry, the way quota accounting measures it
pub(crate) fn entry_size(key: &str, value: &str) -> u64 {
    (key.len() + value.len()) as u64
}
