// Copyright (c) The Cachalot Project Authors.
// Licensed under the MIT License.

//! The core trait for process-local cache storage backends.
//!
//! [`CacheTier`] defines the interface that local cache backends implement.
//! Backends store [`CacheEntry`] values and report expired entries as absent;
//! everything above this trait (coalescing, tier promotion, serialization)
//! lives in the `cachalot` façade.

use crate::{CacheEntry, Error};

/// Trait for local cache tier implementations.
///
/// All four core methods are required: `get`, `insert`, `invalidate`, and
/// `clear`. Only `len` and `is_empty` have default implementations, returning
/// `None` for backends that do not track size.
pub trait CacheTier<K, V>: Send + Sync {
    /// Gets a value, returning `None` if the key is missing or expired.
    fn get(&self, key: &K) -> impl Future<Output = Result<Option<CacheEntry<V>>, Error>> + Send;

    /// Inserts a value, stamping its insertion time.
    fn insert(&self, key: &K, entry: CacheEntry<V>) -> impl Future<Output = Result<(), Error>> + Send;

    /// Invalidates a value.
    fn invalidate(&self, key: &K) -> impl Future<Output = Result<(), Error>> + Send;

    /// Clears all entries.
    fn clear(&self) -> impl Future<Output = Result<(), Error>> + Send;

    /// Returns the number of entries, if the backend tracks size.
    fn len(&self) -> Option<u64> {
        None
    }

    /// Returns `true` if the cache contains no entries, if the backend tracks size.
    fn is_empty(&self) -> Option<bool> {
        self.len().map(|len| len == 0)
    }
}
