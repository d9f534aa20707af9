// Copyright (c) The Cachalot Project Authors.
// Licensed under the MIT License.

//! Builder for configuring an in-memory tier.

use std::{hash::Hash, marker::PhantomData, time::Duration};

use cachalot_tier::Clock;

use crate::InMemoryTier;

/// Builder for [`InMemoryTier`] configuration.
///
/// Created via [`InMemoryTier::builder`]. Every setting is optional; an
/// unconfigured builder produces an unbounded tier, which relies on
/// per-entry TTLs alone to bound growth. Long-running processes should set
/// [`max_capacity`](Self::max_capacity) so eviction kicks in even for keys
/// whose TTLs are long.
///
/// # Examples
///
/// ```
/// use cachalot_memory::InMemoryTier;
/// use cachalot_tier::Clock;
/// use std::time::Duration;
///
/// let tier = InMemoryTier::<String, i32>::builder(Clock::new())
///     .max_capacity(10_000)
///     .time_to_idle(Duration::from_secs(3600))
///     .build();
/// ```
#[derive(Debug)]
pub struct InMemoryTierBuilder<K, V> {
    pub(crate) clock: Clock,
    pub(crate) max_capacity: Option<u64>,
    pub(crate) initial_capacity: Option<usize>,
    pub(crate) time_to_idle: Option<Duration>,
    pub(crate) name: Option<String>,
    _phantom: PhantomData<(K, V)>,
}

impl<K, V> InMemoryTierBuilder<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(clock: Clock) -> Self {
        Self {
            clock,
            max_capacity: None,
            initial_capacity: None,
            time_to_idle: None,
            name: None,
            _phantom: PhantomData,
        }
    }

    /// Bounds the number of entries; excess entries are evicted by moka's
    /// TinyLFU policy.
    #[must_use]
    pub fn max_capacity(mut self, max_capacity: u64) -> Self {
        self.max_capacity = Some(max_capacity);
        self
    }

    /// Pre-allocates internal storage for the expected number of entries.
    #[must_use]
    pub fn initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = Some(initial_capacity);
        self
    }

    /// Evicts entries that have not been read or written for `tti`,
    /// regardless of their own TTL. A safety net against unbounded growth
    /// from keys that are written once and never touched again.
    #[must_use]
    pub fn time_to_idle(mut self, tti: Duration) -> Self {
        self.time_to_idle = Some(tti);
        self
    }

    /// Names the tier for diagnostics.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builds the tier.
    #[must_use]
    pub fn build(self) -> InMemoryTier<K, V> {
        InMemoryTier::from_builder(&self)
    }
}
