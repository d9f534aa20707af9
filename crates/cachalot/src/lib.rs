// Copyright (c) The Cachalot Project Authors.
// Licensed under the MIT License.

//! Tiered caching façade: a process-local tier in front of a shared remote
//! tier, with per-key request coalescing.
//!
//! [`CachingService`] is the entry point. Every data-access path routes its
//! reads through [`get_or_set`](CachingService::get_or_set) (or the fallible
//! [`try_get_or_set`](CachingService::try_get_or_set)), which checks the
//! local tier, then the remote tier, and only then runs the caller's compute
//! function — at most once per key per process, no matter how many concurrent
//! callers pile onto the same miss. Successful results are written through to
//! both tiers with independent TTLs.
//!
//! [`batch_process`](CachingService::batch_process) applies the same contract
//! across a list of items, resolving distinct keys concurrently while
//! preserving input order in the output.
//!
//! Remote-tier outages degrade to cache misses rather than failures: the only
//! error a read path surfaces is the compute function's own.
//!
//! # Examples
//!
//! ```
//! use cachalot::CachingService;
//! use cachalot_tier::{Clock, testing::MockRemote};
//! use std::time::Duration;
//! # futures::executor::block_on(async {
//!
//! let clock = Clock::new_frozen();
//! let service = CachingService::new(clock.clone(), MockRemote::new(clock));
//!
//! // Computed once, then served from cache.
//! let price: u64 = service
//!     .get_or_set("token:EGLD:price", || async { 128 }, Duration::from_secs(600), None)
//!     .await?;
//! assert_eq!(price, 128);
//!
//! let price: u64 = service
//!     .get_or_set("token:EGLD:price", || async { unreachable!() }, Duration::from_secs(600), None)
//!     .await?;
//! assert_eq!(price, 128);
//! # Ok::<(), cachalot_tier::Error>(())
//! # });
//! ```

mod batch;
mod builder;
mod service;

pub use builder::CachingServiceBuilder;
pub use cachalot_tier::{CacheEntry, Clock, Error, RemoteTier};
pub use service::CachingService;
