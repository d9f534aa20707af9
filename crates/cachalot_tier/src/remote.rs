// Copyright (c) The Cachalot Project Authors.
// Licensed under the MIT License.

//! The interface consumed for shared, out-of-process cache backends.

use std::time::Duration;

use crate::Error;

/// Trait for remote (cross-process) cache backends.
///
/// The remote store sees only text: string keys and serialized string
/// payloads. Encoding and decoding happen at the façade boundary, so a
/// backend never needs to understand the values it stores.
///
/// Implementations map every transport failure to
/// [`Error::RemoteUnavailable`] and must never panic on connection loss; the
/// façade degrades such failures to cache misses. TTL bookkeeping is the
/// backend's responsibility (e.g. Redis `SET ... EX`), unlike
/// [`CacheTier`](crate::CacheTier) where entries carry their own expiry.
pub trait RemoteTier: Send + Sync {
    /// Fetches the payload stored under `key`, if any.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, Error>> + Send;

    /// Stores `payload` under `key`, expiring after `ttl`.
    fn set(&self, key: &str, payload: &str, ttl: Duration) -> impl Future<Output = Result<(), Error>> + Send;

    /// Removes the payload stored under `key`, if any.
    fn delete(&self, key: &str) -> impl Future<Output = Result<(), Error>> + Send;

    /// Removes every key in the backing store.
    ///
    /// Intended for controlled initialization and test contexts only; on a
    /// shared production store this clears state for every process instance.
    fn flush_all(&self) -> impl Future<Output = Result<(), Error>> + Send;
}
