// Copyright (c) The Cachalot Project Authors.
// Licensed under the MIT License.

//! Batch get-or-set over a sequence of items.

use std::time::Duration;

use cachalot_tier::{Error, RemoteTier};
use futures::future::try_join_all;
use serde::{Serialize, de::DeserializeOwned};

use crate::service::CachingService;

impl<R> CachingService<R>
where
    R: RemoteTier,
{
    /// Resolves a value per item, caching each under its own key.
    ///
    /// Derives a cache key for every item with `key_of` and applies the
    /// [`try_get_or_set`](Self::try_get_or_set) logic per key. Cache misses
    /// for distinct keys are dispatched concurrently rather than
    /// sequentially; items that share a key coalesce onto one computation.
    ///
    /// The output is order-preserving: `results[i]` always corresponds to
    /// `items[i]`, regardless of the order in which the underlying
    /// computations complete.
    ///
    /// # Failure policy
    ///
    /// The whole batch fails on the first item whose computation fails.
    /// Partial results are never returned, so output alignment with the
    /// input can never silently break; callers that want per-item
    /// degradation encode it in `T` (e.g. compute to an `Option`).
    /// The batch short-circuits: siblings still in flight when the failure
    /// surfaces are cancelled. Items that already completed have been cached,
    /// so a retried batch does not recompute them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] if any derived key is malformed and
    /// [`Error::Computation`] when an item's computation fails.
    pub async fn batch_process<I, T, E, Fut>(
        &self,
        items: &[I],
        key_of: impl Fn(&I) -> String + Sync,
        compute: impl Fn(&I) -> Fut + Sync,
        remote_ttl: Duration,
        local_ttl: Option<Duration>,
    ) -> Result<Vec<T>, Error>
    where
        I: Sync,
        T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
        E: std::error::Error + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send,
    {
        // Shared by reference so every concurrent lookup can call it.
        let compute = &compute;
        let lookups = items.iter().map(|item| {
            let key = key_of(item);
            async move {
                self.try_get_or_set(&key, || compute(item), remote_ttl, local_ttl)
                    .await
            }
        });

        try_join_all(lookups).await
    }
}
