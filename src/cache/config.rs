//! Transient cache configuration.

use std::num::NonZeroUsize;
use std::time::Duration;

use crate::config::{
    CacheBackend, CacheSettings, DEFAULT_CACHE_CONSUME_BATCH_LIMIT, DEFAULT_CACHE_KEY_PREFIX,
    DEFAULT_CACHE_MEMORY_CAPACITY, DEFAULT_CACHE_TTL_SECS,
};

use super::keys::Keyspace;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// When false, events are dropped and the filter bypasses the transient store.
    pub enabled: bool,
    pub backend: CacheBackend,
    /// Namespace prepended to every term key.
    pub key_prefix: String,
    pub ttl_secs: u64,
    /// Maximum entries held by the in-memory backend.
    pub memory_capacity: usize,
    /// Maximum events per consumption batch.
    pub consume_batch_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackend::Memory,
            key_prefix: DEFAULT_CACHE_KEY_PREFIX.to_string(),
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
            memory_capacity: DEFAULT_CACHE_MEMORY_CAPACITY,
            consume_batch_limit: DEFAULT_CACHE_CONSUME_BATCH_LIMIT,
        }
    }
}

impl From<&CacheSettings> for CacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            backend: settings.backend,
            key_prefix: settings.key_prefix.clone(),
            ttl_secs: settings.ttl.as_secs(),
            memory_capacity: settings.memory_capacity.get(),
            consume_batch_limit: settings.consume_batch_limit.get(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn keyspace(&self) -> Keyspace {
        Keyspace::new(self.key_prefix.clone())
    }

    /// Returns the memory capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn memory_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.memory_capacity).unwrap_or(NonZeroUsize::MIN)
    }

    /// Batch limit clamped to at least one event.
    pub fn consume_batch_limit(&self) -> usize {
        self.consume_batch_limit.max(1)
    }
}
