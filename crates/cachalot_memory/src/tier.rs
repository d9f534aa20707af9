// Copyright (c) The Cachalot Project Authors.
// Licensed under the MIT License.

//! In-memory tier implementation using moka.

use std::{hash::Hash, sync::Arc};

use cachalot_tier::{CacheEntry, CacheTier, Clock, Error};
use moka::future::Cache;

use crate::builder::InMemoryTierBuilder;

/// A process-local cache tier backed by moka.
///
/// Entries carry their own TTL (see [`CacheEntry`]); expiry is enforced
/// passively at read time against the tier's [`Clock`], so an expired entry
/// is invalidated and reported absent without any background sweeper. moka's
/// capacity bound (TinyLFU) and optional time-to-idle keep memory bounded in
/// long-running processes.
///
/// Operations never perform I/O. `len` reports moka's entry count, which is
/// an eventually-consistent estimate: it can lag recent inserts until moka's
/// pending maintenance runs.
///
/// # Examples
///
/// ```
/// use cachalot_memory::InMemoryTier;
/// use cachalot_tier::{CacheEntry, CacheTier, Clock};
/// # futures::executor::block_on(async {
///
/// let tier = InMemoryTier::<String, i32>::new(Clock::new());
///
/// tier.insert(&"key".to_string(), CacheEntry::new(42)).await?;
/// let value = tier.get(&"key".to_string()).await?;
/// assert_eq!(*value.unwrap().value(), 42);
/// # Ok::<(), cachalot_tier::Error>(())
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryTier<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Arc<Cache<K, CacheEntry<V>>>,
    clock: Clock,
}

impl<K, V> InMemoryTier<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a new unbounded in-memory tier.
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self::builder(clock).build()
    }

    /// Creates a new in-memory tier bounded to `max_capacity` entries.
    #[must_use]
    pub fn with_capacity(clock: Clock, max_capacity: u64) -> Self {
        Self::builder(clock).max_capacity(max_capacity).build()
    }

    /// Creates a builder for configuring an in-memory tier.
    #[must_use]
    pub fn builder(clock: Clock) -> InMemoryTierBuilder<K, V> {
        InMemoryTierBuilder::new(clock)
    }

    pub(crate) fn from_builder(builder: &InMemoryTierBuilder<K, V>) -> Self {
        let mut moka_builder = Cache::builder();

        if let Some(capacity) = builder.max_capacity {
            moka_builder = moka_builder.max_capacity(capacity);
        }

        if let Some(capacity) = builder.initial_capacity {
            moka_builder = moka_builder.initial_capacity(capacity);
        }

        if let Some(tti) = builder.time_to_idle {
            moka_builder = moka_builder.time_to_idle(tti);
        }

        if let Some(name) = builder.name.as_deref() {
            moka_builder = moka_builder.name(name);
        }

        Self {
            inner: Arc::new(moka_builder.build()),
            clock: builder.clock.clone(),
        }
    }

    /// Returns the clock this tier checks entry expiry against.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }
}

impl<K, V> CacheTier<K, V> for InMemoryTier<K, V>
where
    K: Clone + Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Result<Option<CacheEntry<V>>, Error> {
        match self.inner.get(key).await {
            Some(entry) if entry.is_expired(self.clock.system_time()) => {
                self.inner.invalidate(key).await;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn insert(&self, key: &K, mut entry: CacheEntry<V>) -> Result<(), Error> {
        entry.ensure_cached_at(self.clock.system_time());
        self.inner.insert(key.clone(), entry).await;
        Ok(())
    }

    async fn invalidate(&self, key: &K) -> Result<(), Error> {
        self.inner.invalidate(key).await;
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        self.inner.invalidate_all();
        Ok(())
    }

    fn len(&self) -> Option<u64> {
        Some(self.inner.entry_count())
    }
}
