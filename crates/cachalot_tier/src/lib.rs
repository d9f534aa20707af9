// Copyright (c) The Cachalot Project Authors.
// Licensed under the MIT License.

//! Core tier abstractions for building tiered caches.
//!
//! This crate defines the two storage-facing traits of the cachalot
//! workspace — [`CacheTier`] for process-local backends and [`RemoteTier`]
//! for shared out-of-process backends — along with [`CacheEntry`] for values
//! with expiration metadata, the [`Error`] taxonomy, and a test-controllable
//! [`Clock`].
//!
//! # Overview
//!
//! The tier abstraction separates storage from caching policy. Backends
//! implement [`CacheTier`] or [`RemoteTier`]; the `cachalot` façade composes
//! them with coalescing, tier promotion, and serialization at the remote
//! boundary.
//!
//! # Implementing a local tier
//!
//! ```
//! use cachalot_tier::{CacheEntry, CacheTier, Error};
//! use std::collections::HashMap;
//! use std::sync::RwLock;
//!
//! struct SimpleTier<K, V>(RwLock<HashMap<K, CacheEntry<V>>>);
//!
//! impl<K, V> CacheTier<K, V> for SimpleTier<K, V>
//! where
//!     K: Clone + Eq + std::hash::Hash + Send + Sync,
//!     V: Clone + Send + Sync,
//! {
//!     async fn get(&self, key: &K) -> Result<Option<CacheEntry<V>>, Error> {
//!         Ok(self.0.read().unwrap().get(key).cloned())
//!     }
//!
//!     async fn insert(&self, key: &K, entry: CacheEntry<V>) -> Result<(), Error> {
//!         self.0.write().unwrap().insert(key.clone(), entry);
//!         Ok(())
//!     }
//!
//!     async fn invalidate(&self, key: &K) -> Result<(), Error> {
//!         self.0.write().unwrap().remove(key);
//!         Ok(())
//!     }
//!
//!     async fn clear(&self) -> Result<(), Error> {
//!         self.0.write().unwrap().clear();
//!         Ok(())
//!     }
//! }
//! ```

mod clock;
mod entry;
pub mod error;
mod remote;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub(crate) mod tier;

#[doc(inline)]
pub use clock::Clock;
#[doc(inline)]
pub use entry::CacheEntry;
#[doc(inline)]
pub use error::{Error, Result, validate_key};
#[doc(inline)]
pub use remote::RemoteTier;
#[doc(inline)]
pub use tier::CacheTier;
