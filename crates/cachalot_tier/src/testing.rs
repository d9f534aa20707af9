// Copyright (c) The Cachalot Project Authors.
// Licensed under the MIT License.

//! Mock tier implementations for testing.
//!
//! [`MockTier`] and [`MockRemote`] store values in memory, record every
//! operation, and support failure injection via predicates, which makes
//! degradation paths testable without a real backend.

use std::{
    collections::HashMap,
    hash::Hash,
    sync::Arc,
    time::{Duration, SystemTime},
};

use parking_lot::Mutex;

use crate::{CacheEntry, CacheTier, Clock, Error, RemoteTier};

/// Recorded local-tier operation with full context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierOp<K, V> {
    /// A get operation with the given key.
    Get(K),
    /// An insert operation.
    Insert {
        /// The key that was inserted.
        key: K,
        /// The cache entry that was inserted.
        entry: CacheEntry<V>,
    },
    /// An invalidate operation with the given key.
    Invalidate(K),
    /// A clear operation.
    Clear,
}

type TierFailPredicate<K, V> = Box<dyn Fn(&TierOp<K, V>) -> bool + Send + Sync>;

/// A configurable mock local tier.
///
/// Stores values in a plain map and can be told to fail operations on
/// demand. All operations are recorded for later verification.
///
/// # Failure injection
///
/// ```
/// use cachalot_tier::testing::{MockTier, TierOp};
///
/// let tier: MockTier<String, i32> = MockTier::new();
///
/// // Fail only gets for a specific key
/// tier.fail_when(|op| matches!(op, TierOp::Get(k) if k == "forbidden"));
/// ```
pub struct MockTier<K, V> {
    data: Arc<Mutex<HashMap<K, CacheEntry<V>>>>,
    operations: Arc<Mutex<Vec<TierOp<K, V>>>>,
    fail_when: Arc<Mutex<Option<TierFailPredicate<K, V>>>>,
}

impl<K, V> std::fmt::Debug for MockTier<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTier")
            .field("fail_when", &self.fail_when.lock().is_some())
            .finish_non_exhaustive()
    }
}

impl<K, V> Clone for MockTier<K, V> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            operations: Arc::clone(&self.operations),
            fail_when: Arc::clone(&self.fail_when),
        }
    }
}

impl<K, V> Default for MockTier<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> MockTier<K, V> {
    /// Creates a new empty mock tier.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Arc::new(Mutex::new(HashMap::new())),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
        }
    }
}

impl<K, V> MockTier<K, V>
where
    K: Eq + Hash,
{
    /// Returns the number of stored entries.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.data.lock().len()
    }

    /// Returns `true` if the tier contains the given key.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.data.lock().contains_key(key)
    }
}

impl<K, V> MockTier<K, V>
where
    K: Clone,
    V: Clone,
{
    /// Sets a predicate that determines which operations fail.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&TierOp<K, V>) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate, allowing all operations to succeed.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    /// Returns a clone of all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<TierOp<K, V>> {
        self.operations.lock().clone()
    }

    fn record(&self, op: TierOp<K, V>) {
        self.operations.lock().push(op);
    }

    fn should_fail(&self, op: &TierOp<K, V>) -> bool {
        self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(op))
    }
}

impl<K, V> CacheTier<K, V> for MockTier<K, V>
where
    K: Clone + Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn get(&self, key: &K) -> Result<Option<CacheEntry<V>>, Error> {
        let op = TierOp::Get(key.clone());
        let failed = self.should_fail(&op);
        self.record(op);
        if failed {
            return Err(Error::remote_unavailable(MockFailure("get")));
        }
        Ok(self.data.lock().get(key).cloned())
    }

    async fn insert(&self, key: &K, entry: CacheEntry<V>) -> Result<(), Error> {
        let op = TierOp::Insert {
            key: key.clone(),
            entry: entry.clone(),
        };
        let failed = self.should_fail(&op);
        self.record(op);
        if failed {
            return Err(Error::remote_unavailable(MockFailure("insert")));
        }
        self.data.lock().insert(key.clone(), entry);
        Ok(())
    }

    async fn invalidate(&self, key: &K) -> Result<(), Error> {
        let op = TierOp::Invalidate(key.clone());
        let failed = self.should_fail(&op);
        self.record(op);
        if failed {
            return Err(Error::remote_unavailable(MockFailure("invalidate")));
        }
        self.data.lock().remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        let op = TierOp::Clear;
        let failed = self.should_fail(&op);
        self.record(op);
        if failed {
            return Err(Error::remote_unavailable(MockFailure("clear")));
        }
        self.data.lock().clear();
        Ok(())
    }

    fn len(&self) -> Option<u64> {
        Some(self.data.lock().len() as u64)
    }
}

/// Recorded remote-tier operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOp {
    /// A get operation with the given key.
    Get(String),
    /// A set operation.
    Set {
        /// The key that was written.
        key: String,
        /// The serialized payload.
        payload: String,
        /// The requested expiry.
        ttl: Duration,
    },
    /// A delete operation with the given key.
    Delete(String),
    /// A flush-all operation.
    Flush,
}

type RemoteFailPredicate = Box<dyn Fn(&RemoteOp) -> bool + Send + Sync>;

/// A configurable mock remote tier.
///
/// Honors TTLs against the supplied [`Clock`], so expiry behavior can be
/// exercised with a frozen clock. Like [`MockTier`], every operation is
/// recorded and failures can be injected per operation.
pub struct MockRemote {
    data: Arc<Mutex<HashMap<String, StoredPayload>>>,
    operations: Arc<Mutex<Vec<RemoteOp>>>,
    fail_when: Arc<Mutex<Option<RemoteFailPredicate>>>,
    clock: Clock,
}

#[derive(Debug, Clone)]
struct StoredPayload {
    payload: String,
    expires_at: SystemTime,
}

impl std::fmt::Debug for MockRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockRemote")
            .field("data", &self.data)
            .field("fail_when", &self.fail_when.lock().is_some())
            .finish_non_exhaustive()
    }
}

impl Clone for MockRemote {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            operations: Arc::clone(&self.operations),
            fail_when: Arc::clone(&self.fail_when),
            clock: self.clock.clone(),
        }
    }
}

impl MockRemote {
    /// Creates a new empty mock remote tier reading time from `clock`.
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            data: Arc::new(Mutex::new(HashMap::new())),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
            clock,
        }
    }

    /// Sets a predicate that determines which operations fail with
    /// [`Error::RemoteUnavailable`].
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&RemoteOp) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    /// Returns a clone of all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<RemoteOp> {
        self.operations.lock().clone()
    }

    /// Returns the live payload stored under `key`, ignoring failure injection.
    #[must_use]
    pub fn payload(&self, key: &str) -> Option<String> {
        let data = self.data.lock();
        let stored = data.get(key)?;
        (self.clock.system_time() <= stored.expires_at).then(|| stored.payload.clone())
    }

    /// Stores a payload directly, bypassing operation recording.
    pub fn seed(&self, key: &str, payload: &str, ttl: Duration) {
        self.data.lock().insert(
            key.to_string(),
            StoredPayload {
                payload: payload.to_string(),
                expires_at: self.clock.system_time() + ttl,
            },
        );
    }

    /// Returns the number of live entries.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        let now = self.clock.system_time();
        self.data.lock().values().filter(|stored| now <= stored.expires_at).count()
    }

    fn record(&self, op: RemoteOp) {
        self.operations.lock().push(op);
    }

    fn should_fail(&self, op: &RemoteOp) -> bool {
        self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(op))
    }
}

impl RemoteTier for MockRemote {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let op = RemoteOp::Get(key.to_string());
        let failed = self.should_fail(&op);
        self.record(op);
        if failed {
            return Err(Error::remote_unavailable(MockFailure("get")));
        }
        Ok(self.payload(key))
    }

    async fn set(&self, key: &str, payload: &str, ttl: Duration) -> Result<(), Error> {
        let op = RemoteOp::Set {
            key: key.to_string(),
            payload: payload.to_string(),
            ttl,
        };
        let failed = self.should_fail(&op);
        self.record(op);
        if failed {
            return Err(Error::remote_unavailable(MockFailure("set")));
        }
        self.seed(key, payload, ttl);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        let op = RemoteOp::Delete(key.to_string());
        let failed = self.should_fail(&op);
        self.record(op);
        if failed {
            return Err(Error::remote_unavailable(MockFailure("delete")));
        }
        self.data.lock().remove(key);
        Ok(())
    }

    async fn flush_all(&self) -> Result<(), Error> {
        let op = RemoteOp::Flush;
        let failed = self.should_fail(&op);
        self.record(op);
        if failed {
            return Err(Error::remote_unavailable(MockFailure("flush")));
        }
        self.data.lock().clear();
        Ok(())
    }
}

/// The error type surfaced by injected mock failures.
#[derive(Debug, Clone, thiserror::Error)]
#[error("mock: {0} failed")]
pub struct MockFailure(pub &'static str);
