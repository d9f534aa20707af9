// Copyright (c) The Cachalot Project Authors.
// Licensed under the MIT License.

//! The tiered caching service.

use std::{any::Any, sync::Arc, time::Duration};

use cachalot_memory::InMemoryTier;
use cachalot_tier::{CacheEntry, CacheTier, Error, RemoteTier, error::validate_key};
use serde::{Serialize, de::DeserializeOwned};
use soloflight::Merger;
use tracing::{debug, warn};

use crate::builder::CachingServiceBuilder;

/// Type-erased cached value held by the local tier.
///
/// One service instance caches values of many concrete types, one per call
/// site; the local tier stores them behind `dyn Any` and each accessor
/// downcasts back to the type it asked for. A downcast mismatch is treated as
/// a miss, the same way a schema change invalidates a serialized payload.
pub(crate) type Stored = Arc<dyn Any + Send + Sync>;

/// The compute functions coalesced for one key may have been submitted for
/// different value types; a follower whose type differs from the leader's
/// cannot use the shared result.
#[derive(Debug, thiserror::Error)]
#[error("coalesced value for key {key:?} has a different type than requested")]
struct TypeMismatch {
    key: String,
}

/// The tiered caching façade.
///
/// Composes a process-local tier, a shared remote tier, and per-key request
/// coalescing into one get-or-set contract:
///
/// 1. A local hit returns immediately, with no remote round-trip.
/// 2. A remote hit is decoded, promoted into the local tier, and returned.
/// 3. Otherwise the compute function runs, with at most one execution in
///    flight per key within the process; the result is written through to
///    both tiers and every coalesced caller receives it.
///
/// Remote-tier failures degrade to cache misses rather than failing the
/// operation; see the individual methods for where that policy applies.
///
/// The service is constructed once (see [`CachingServiceBuilder`]) and shared
/// by reference or `Arc` across request handlers; all methods take `&self`.
///
/// # Examples
///
/// ```
/// use cachalot::CachingService;
/// use cachalot_tier::{Clock, testing::MockRemote};
/// use std::time::Duration;
/// # futures::executor::block_on(async {
///
/// let clock = Clock::new_frozen();
/// let service = CachingService::new(clock.clone(), MockRemote::new(clock));
///
/// let value: u64 = service
///     .get_or_set("answer", || async { 42 }, Duration::from_secs(60), None)
///     .await?;
/// assert_eq!(value, 42);
/// # Ok::<(), cachalot_tier::Error>(())
/// # });
/// ```
pub struct CachingService<R> {
    local: InMemoryTier<String, Stored>,
    remote: R,
    flights: Merger<String, Result<Stored, Error>>,
}

impl<R> CachingService<R>
where
    R: RemoteTier,
{
    /// Creates a service with default local-tier settings.
    ///
    /// Use [`CachingServiceBuilder`] to bound the local tier's capacity.
    pub fn new(clock: cachalot_tier::Clock, remote: R) -> Self {
        CachingServiceBuilder::new(clock).build(remote)
    }

    pub(crate) fn from_builder(builder: &CachingServiceBuilder, remote: R) -> Self {
        Self {
            local: builder.local_tier(),
            remote,
            flights: Merger::new(),
        }
    }

    /// Retrieves a value, computing and caching it on a miss.
    ///
    /// Checks the local tier, then the remote tier (promoting a remote hit
    /// into the local tier), and finally runs `compute` with per-key
    /// coalescing: concurrent callers for the same missing key share one
    /// execution. A successful computation is written through to both tiers.
    ///
    /// `local_ttl` defaults to `remote_ttl` when `None`; pass a shorter value
    /// when local memory should turn over faster than the shared store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] for a malformed key. Remote-tier
    /// failures never surface here; they are logged and treated as misses.
    pub async fn get_or_set<T, Fut>(
        &self,
        key: &str,
        compute: impl FnOnce() -> Fut + Send,
        remote_ttl: Duration,
        local_ttl: Option<Duration>,
    ) -> Result<T, Error>
    where
        T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
        Fut: Future<Output = T> + Send,
    {
        self.try_get_or_set(
            key,
            || async move { Ok::<_, std::convert::Infallible>(compute().await) },
            remote_ttl,
            local_ttl,
        )
        .await
    }

    /// Like [`get_or_set`](Self::get_or_set), but the compute function can
    /// fail.
    ///
    /// A failed computation is broadcast to every coalesced caller and
    /// nothing is cached, so the next call for the key retries. Recover the
    /// concrete failure with [`Error::source_as`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] for a malformed key and
    /// [`Error::Computation`] when `compute` fails. Remote-tier failures are
    /// logged and treated as misses, never surfaced.
    pub async fn try_get_or_set<T, E, Fut>(
        &self,
        key: &str,
        compute: impl FnOnce() -> Fut + Send,
        remote_ttl: Duration,
        local_ttl: Option<Duration>,
    ) -> Result<T, Error>
    where
        T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
        E: std::error::Error + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send,
    {
        validate_key(key)?;
        let local_ttl = local_ttl.unwrap_or(remote_ttl);

        if let Some(value) = self.local_hit::<T>(key).await {
            return Ok(value);
        }

        let flight_key = key.to_string();
        let stored = self
            .flights
            .execute(&flight_key, || {
                self.load_slow(key, compute, remote_ttl, local_ttl)
            })
            .await?;

        stored.downcast_ref::<T>().cloned().ok_or_else(|| {
            Error::serialization(TypeMismatch { key: key.to_string() })
        })
    }

    /// The coalesced miss path: re-check the local tier, then the remote
    /// tier, then compute and write through.
    ///
    /// The local re-check matters for followers that attached while an
    /// earlier flight for this key was settling; without it they would race
    /// a fresh computation against a value that already landed.
    async fn load_slow<T, E, Fut>(
        &self,
        key: &str,
        compute: impl FnOnce() -> Fut,
        remote_ttl: Duration,
        local_ttl: Duration,
    ) -> Result<Stored, Error>
    where
        T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
        E: std::error::Error + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(stored) = self.local_stored::<T>(key).await {
            return Ok(stored);
        }

        match self.remote.get(key).await {
            Ok(Some(payload)) => match serde_json::from_str::<T>(&payload) {
                Ok(value) => {
                    let stored: Stored = Arc::new(value);
                    self.store_local(key, Arc::clone(&stored), local_ttl).await?;
                    return Ok(stored);
                }
                Err(error) => {
                    warn!(key, %error, "discarding undecodable remote payload");
                }
            },
            Ok(None) => {}
            Err(error) => {
                warn!(key, %error, "remote cache read failed, treating as miss");
            }
        }

        let value = compute().await.map_err(Error::computation)?;

        match serde_json::to_string(&value) {
            Ok(payload) => {
                if let Err(error) = self.remote.set(key, &payload, remote_ttl).await {
                    warn!(key, %error, "remote cache write failed, value cached locally only");
                }
            }
            Err(error) => {
                warn!(key, %error, "computed value could not be serialized for the remote tier");
            }
        }

        let stored: Stored = Arc::new(value);
        self.store_local(key, Arc::clone(&stored), local_ttl).await?;
        Ok(stored)
    }

    /// Retrieves a value from the local tier only.
    ///
    /// No remote round-trip, no computation. A value cached under a
    /// different concrete type reads as absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] for a malformed key.
    pub async fn get_local<T>(&self, key: &str) -> Result<Option<T>, Error>
    where
        T: Clone + Send + Sync + 'static,
    {
        validate_key(key)?;
        Ok(self.local_hit::<T>(key).await)
    }

    /// Stores a value in the local tier only.
    ///
    /// Used for per-process state that is meaningless to other instances,
    /// such as lookup tables keyed by volatile local context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] for a malformed key.
    pub async fn set_local<T>(&self, key: &str, value: T, ttl: Duration) -> Result<(), Error>
    where
        T: Clone + Send + Sync + 'static,
    {
        validate_key(key)?;
        self.store_local(key, Arc::new(value), ttl).await
    }

    /// Retrieves a value from the remote tier only, bypassing the local tier.
    ///
    /// Used for cross-process coordination state that must reflect what
    /// other instances wrote. Remote failures and undecodable payloads are
    /// logged and read as absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] for a malformed key.
    pub async fn get_remote<T>(&self, key: &str) -> Result<Option<T>, Error>
    where
        T: DeserializeOwned,
    {
        validate_key(key)?;
        match self.remote.get(key).await {
            Ok(Some(payload)) => match serde_json::from_str(&payload) {
                Ok(value) => Ok(Some(value)),
                Err(error) => {
                    warn!(key, %error, "discarding undecodable remote payload");
                    Ok(None)
                }
            },
            Ok(None) => Ok(None),
            Err(error) => {
                warn!(key, %error, "remote cache read failed, treating as miss");
                Ok(None)
            }
        }
    }

    /// Stores a value in the remote tier only, bypassing the local tier.
    ///
    /// A remote failure is logged and swallowed; the write is best-effort
    /// like every other remote interaction on the read/write path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] for a malformed key and
    /// [`Error::Serialization`] when `value` cannot be encoded.
    pub async fn set_remote<T>(&self, key: &str, value: &T, ttl: Duration) -> Result<(), Error>
    where
        T: Serialize,
    {
        validate_key(key)?;
        let payload = serde_json::to_string(value).map_err(Error::serialization)?;
        if let Err(error) = self.remote.set(key, &payload, ttl).await {
            warn!(key, %error, "remote cache write failed");
        }
        Ok(())
    }

    /// Writes a value through to both tiers unconditionally.
    ///
    /// Both tiers receive the same `ttl`. A remote failure is logged and
    /// swallowed; the local write still happens, so subsequent reads in this
    /// process hit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] for a malformed key and
    /// [`Error::Serialization`] when `value` cannot be encoded.
    pub async fn set<T>(&self, key: &str, value: T, ttl: Duration) -> Result<(), Error>
    where
        T: Clone + Send + Sync + Serialize + 'static,
    {
        validate_key(key)?;
        let payload = serde_json::to_string(&value).map_err(Error::serialization)?;
        if let Err(error) = self.remote.set(key, &payload, ttl).await {
            warn!(key, %error, "remote cache write failed, value cached locally only");
        }
        self.store_local(key, Arc::new(value), ttl).await
    }

    /// Removes a key from both tiers.
    ///
    /// The local entry is always removed first. Unlike the read/write path,
    /// a remote failure here propagates: pretending a shared entry was
    /// invalidated when it was not would leave other instances serving data
    /// this process knows is stale.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] for a malformed key and
    /// [`Error::RemoteUnavailable`] when the remote delete fails.
    pub async fn delete(&self, key: &str) -> Result<(), Error> {
        validate_key(key)?;
        self.local.invalidate(&key.to_string()).await?;
        self.remote.delete(key).await
    }

    /// Clears the entire remote store and this process's local tier.
    ///
    /// Destructive and cross-process: on a shared store this wipes state for
    /// every instance, so it belongs in controlled initialization and test
    /// contexts only. Unlike other remote interactions, a failure here
    /// propagates; a flush that silently did nothing would defeat its
    /// purpose.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RemoteUnavailable`] when the remote flush fails.
    pub async fn flush_db(&self) -> Result<(), Error> {
        warn!("flushing the entire remote cache");
        self.remote.flush_all().await?;
        self.local.clear().await
    }

    /// Tears the service down, clearing the local tier.
    ///
    /// In-flight coalesced computations settle as their callers are driven;
    /// the remote connection closes when the backing client is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if clearing the local tier fails.
    pub async fn teardown(self) -> Result<(), Error> {
        self.local.clear().await?;
        debug!("caching service torn down");
        Ok(())
    }

    /// Returns the number of entries in the local tier.
    ///
    /// The count is an eventually-consistent estimate: the tier's backing
    /// store batches its internal bookkeeping, so a just-inserted entry may
    /// not be reflected immediately. Use [`get_local`](Self::get_local) to
    /// check for a specific key.
    #[must_use]
    pub fn local_len(&self) -> Option<u64> {
        self.local.len()
    }

    async fn local_hit<T>(&self, key: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.local_stored::<T>(key)
            .await
            .and_then(|stored| stored.downcast_ref::<T>().cloned())
    }

    /// Fetches the type-erased local entry for `key`, reporting a miss when
    /// the stored value is not a `T`.
    async fn local_stored<T>(&self, key: &str) -> Option<Stored>
    where
        T: 'static,
    {
        match self.local.get(&key.to_string()).await {
            Ok(Some(entry)) if entry.value().is::<T>() => Some(entry.into_value()),
            _ => None,
        }
    }

    async fn store_local(&self, key: &str, stored: Stored, ttl: Duration) -> Result<(), Error> {
        self.local
            .insert(&key.to_string(), CacheEntry::with_ttl(stored, ttl))
            .await
    }
}

impl<R> std::fmt::Debug for CachingService<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachingService")
            .field("local_len", &self.local.len())
            .finish_non_exhaustive()
    }
}
