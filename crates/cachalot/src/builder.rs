// Copyright (c) The Cachalot Project Authors.
// Licensed under the MIT License.

//! Builder for configuring a caching service.

use std::time::Duration;

use cachalot_memory::InMemoryTier;
use cachalot_tier::{Clock, RemoteTier};

use crate::service::{CachingService, Stored};

/// Builder for [`CachingService`] configuration.
///
/// The settings here shape the local tier; the remote tier arrives fully
/// constructed at [`build`](Self::build) so the service works against any
/// [`RemoteTier`] backend. An unconfigured builder produces an unbounded
/// local tier; long-running processes should set
/// [`local_capacity`](Self::local_capacity) so eviction bounds memory even
/// for long-TTL keys.
///
/// # Examples
///
/// ```
/// use cachalot::CachingServiceBuilder;
/// use cachalot_tier::{Clock, testing::MockRemote};
/// use std::time::Duration;
///
/// let clock = Clock::new_frozen();
/// let service = CachingServiceBuilder::new(clock.clone())
///     .local_capacity(50_000)
///     .local_time_to_idle(Duration::from_secs(3600))
///     .build(MockRemote::new(clock));
/// # let _ = service;
/// ```
#[derive(Debug)]
pub struct CachingServiceBuilder {
    clock: Clock,
    local_capacity: Option<u64>,
    local_time_to_idle: Option<Duration>,
    name: Option<String>,
}

impl CachingServiceBuilder {
    /// Creates a builder with default local-tier settings.
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            local_capacity: None,
            local_time_to_idle: None,
            name: None,
        }
    }

    /// Bounds the number of entries held by the local tier.
    #[must_use]
    pub fn local_capacity(mut self, capacity: u64) -> Self {
        self.local_capacity = Some(capacity);
        self
    }

    /// Evicts local entries not touched for `tti`, regardless of their TTL.
    #[must_use]
    pub fn local_time_to_idle(mut self, tti: Duration) -> Self {
        self.local_time_to_idle = Some(tti);
        self
    }

    /// Names the local tier for diagnostics.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builds the service against the given remote backend.
    #[must_use]
    pub fn build<R>(self, remote: R) -> CachingService<R>
    where
        R: RemoteTier,
    {
        CachingService::from_builder(&self, remote)
    }

    pub(crate) fn local_tier(&self) -> InMemoryTier<String, Stored> {
        let mut builder = InMemoryTier::builder(self.clock.clone());

        if let Some(capacity) = self.local_capacity {
            builder = builder.max_capacity(capacity);
        }

        if let Some(tti) = self.local_time_to_idle {
            builder = builder.time_to_idle(tti);
        }

        if let Some(name) = self.name.as_deref() {
            builder = builder.name(name);
        }

        builder.build()
    }
}
