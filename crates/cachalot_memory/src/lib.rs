// Copyright (c) The Cachalot Project Authors.
// Licensed under the MIT License.

//! Process-local cache tier backed by [moka](https://docs.rs/moka).
//!
//! [`InMemoryTier`] implements [`CacheTier`](cachalot_tier::CacheTier) over a
//! concurrent moka cache. Per-entry TTLs are enforced at read time against
//! the tier's clock, so a frozen test clock sees deterministic expiry; moka
//! provides the capacity bound and eviction underneath.
//!
//! # Examples
//!
//! ```
//! use cachalot_memory::InMemoryTier;
//! use cachalot_tier::{CacheEntry, CacheTier, Clock};
//! use std::time::Duration;
//! # futures::executor::block_on(async {
//!
//! let tier = InMemoryTier::builder(Clock::new())
//!     .max_capacity(1_000)
//!     .build();
//!
//! let entry = CacheEntry::with_ttl("value".to_string(), Duration::from_secs(60));
//! tier.insert(&"key".to_string(), entry).await?;
//!
//! assert!(tier.get(&"key".to_string()).await?.is_some());
//! # Ok::<(), cachalot_tier::Error>(())
//! # });
//! ```

mod builder;
mod tier;

pub use builder::InMemoryTierBuilder;
pub use tier::InMemoryTier;
