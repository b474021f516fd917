//! Transient storage: an expiring key/value store holding filtered id lists.

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use metrics::counter;
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::types::ProductId;

use super::config::CacheConfig;
use super::keys::TransientKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

pub(crate) const METRIC_TRANSIENT_HIT: &str = "instock_nav_transient_hit_total";
pub(crate) const METRIC_TRANSIENT_MISS: &str = "instock_nav_transient_miss_total";
pub(crate) const METRIC_TRANSIENT_EVICT: &str = "instock_nav_transient_evict_total";
pub(crate) const METRIC_TRANSIENT_DELETE: &str = "instock_nav_transient_delete_total";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("transient backend error: {0}")]
    Backend(String),
    #[error("transient `{key}` holds an unreadable value: {reason}")]
    Decode { key: String, reason: String },
    #[error("ttl of {ttl_secs}s overflows the expiry timestamp")]
    TtlOverflow { ttl_secs: u64 },
}

impl CacheError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Host-provided expiring cache.
#[async_trait]
pub trait TransientStore: Send + Sync {
    /// Stored ids, or `None` when absent or expired.
    async fn get(&self, key: &TransientKey) -> Result<Option<Vec<ProductId>>, CacheError>;

    async fn set(
        &self,
        key: &TransientKey,
        ids: &[ProductId],
        ttl: Duration,
    ) -> Result<(), CacheError>;

    /// Remove the entry. Returns whether one was present.
    async fn delete(&self, key: &TransientKey) -> Result<bool, CacheError>;
}

/// Absolute expiry for an entry written now.
pub fn expires_after(ttl: Duration) -> Result<OffsetDateTime, CacheError> {
    let overflow = || CacheError::TtlOverflow {
        ttl_secs: ttl.as_secs(),
    };
    let ttl = time::Duration::try_from(ttl).map_err(|_| overflow())?;
    OffsetDateTime::now_utc()
        .checked_add(ttl)
        .ok_or_else(overflow)
}

/// Coerce a serialized id list into integers.
///
/// Accepts integers, floats (truncated) and numeric strings, matching how the
/// host casts stored ids when reading them back.
pub fn decode_ids(key: &TransientKey, value: &Value) -> Result<Vec<ProductId>, CacheError> {
    let decode_error = |reason: String| CacheError::Decode {
        key: key.to_string(),
        reason,
    };

    let Value::Array(items) = value else {
        return Err(decode_error(format!("expected an array, found {value}")));
    };

    items
        .iter()
        .map(|item| match item {
            Value::Number(number) => number
                .as_i64()
                .or_else(|| number.as_f64().map(|float| float.trunc() as i64))
                .map(ProductId)
                .ok_or_else(|| decode_error(format!("`{number}` is not an integer id"))),
            Value::String(text) => text
                .trim()
                .parse::<i64>()
                .map(ProductId)
                .map_err(|err| decode_error(format!("`{text}` is not numeric: {err}"))),
            other => Err(decode_error(format!("unsupported id value `{other}`"))),
        })
        .collect()
}

pub fn encode_ids(ids: &[ProductId]) -> Value {
    Value::Array(ids.iter().map(|id| Value::from(id.get())).collect())
}

#[derive(Debug, Clone)]
struct StoredEntry {
    ids: Vec<ProductId>,
    expires_at: OffsetDateTime,
}

/// In-process transient store with LRU eviction and per-entry expiry.
pub struct MemoryTransientStore {
    entries: RwLock<LruCache<TransientKey, StoredEntry>>,
}

impl MemoryTransientStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.memory_capacity_non_zero())),
        }
    }

    /// Number of stored entries, expired ones included until next read.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &TransientKey) -> bool {
        rw_read(&self.entries, SOURCE, "contains")
            .peek(key)
            .is_some_and(|entry| entry.expires_at > OffsetDateTime::now_utc())
    }

    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
    }
}

#[async_trait]
impl TransientStore for MemoryTransientStore {
    async fn get(&self, key: &TransientKey) -> Result<Option<Vec<ProductId>>, CacheError> {
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        let now = OffsetDateTime::now_utc();

        let hit = match entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.ids.clone()),
            Some(_) => {
                entries.pop(key);
                None
            }
            None => None,
        };

        if hit.is_some() {
            counter!(METRIC_TRANSIENT_HIT, "backend" => "memory").increment(1);
        } else {
            counter!(METRIC_TRANSIENT_MISS, "backend" => "memory").increment(1);
        }
        Ok(hit)
    }

    async fn set(
        &self,
        key: &TransientKey,
        ids: &[ProductId],
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let entry = StoredEntry {
            ids: ids.to_vec(),
            expires_at: expires_after(ttl)?,
        };

        let evicted = rw_write(&self.entries, SOURCE, "set").push(key.clone(), entry);
        if let Some((evicted_key, _)) = evicted
            && &evicted_key != key
        {
            counter!(METRIC_TRANSIENT_EVICT, "backend" => "memory").increment(1);
        }
        Ok(())
    }

    async fn delete(&self, key: &TransientKey) -> Result<bool, CacheError> {
        let removed = rw_write(&self.entries, SOURCE, "delete").pop(key).is_some();
        counter!(METRIC_TRANSIENT_DELETE, "backend" => "memory").increment(1);
        Ok(removed)
    }
}
