//! In-memory Storage
//!
//! Quota-limited key-value map. Used by tests and by hosts that do not need
//! data to outlive the process.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use super::traits::{entry_size, StorageAdapter, UsageStats};

pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: u64,
}

impl MemoryStorage {
    pub fn new(quota_bytes: u64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota_bytes,
        }
    }

    /// Store raw text without validation, e.g. to seed corrupted data
    pub async fn insert_raw(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
    }

    fn used(entries: &HashMap<String, String>) -> u64 {
        entries.iter().map(|(k, v)| entry_size(k, v)).sum()
    }

    /// Bytes in use after replacing `updates` in `entries`
    fn projected(entries: &HashMap<String, String>, updates: &[(String, String)]) -> u64 {
        let mut used = Self::used(entries);
        for (key, value) in updates {
            if let Some(old) = entries.get(key) {
                used = used.saturating_sub(entry_size(key, old));
            }
            used += entry_size(key, value);
        }
        used
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new(5 * 1024 * 1024)
    }
}

#[async_trait]
impl StorageAdapter for MemoryStorage {
    async fn get(&self, key: &str) -> Option<Value> {
        let raw = self.get_raw(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("stored value for {} is not valid JSON: {}", key, e);
                None
            }
        }
    }

    async fn get_raw(&self, key: &str) -> Option<String> {
        self.entries.lock().await.get(key).cloned()
    }

    async fn set(&self, key: &str, value: &Value) -> bool {
        self.set_many(&[(key.to_string(), value.clone())]).await
    }

    async fn set_many(&self, entries: &[(String, Value)]) -> bool {
        let mut updates = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            match serde_json::to_string(value) {
                Ok(text) => updates.push((key.clone(), text)),
                Err(e) => {
                    log::error!("failed to serialize {}: {}", key, e);
                    return false;
                }
            }
        }

        let mut guard = self.entries.lock().await;
        let projected = Self::projected(&guard, &updates);
        if projected > self.quota_bytes {
            log::warn!(
                "storage quota exceeded: {} of {} bytes",
                projected,
                self.quota_bytes
            );
            return false;
        }
        guard.extend(updates);
        true
    }

    async fn remove(&self, key: &str) -> bool {
        self.entries.lock().await.remove(key);
        true
    }

    async fn usage_stats(&self) -> UsageStats {
        let guard = self.entries.lock().await;
        UsageStats::new(Self::used(&guard), self.quota_bytes)
    }
}
