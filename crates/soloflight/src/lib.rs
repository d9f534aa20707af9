// Copyright (c) The Cachalot Project Authors.
// Licensed under the MIT License.

//! Coalesces duplicate keyed async computations into a single execution.
//!
//! This crate provides [`Merger`], a mechanism for deduplicating concurrent
//! async operations. When multiple tasks request the same work (identified by
//! a key), only the first task (the "leader") performs the actual work while
//! subsequent tasks (the "followers") wait and receive a clone of the result.
//!
//! The in-flight record for a key exists only while its computation is
//! unresolved: the instant the leader settles, every attached follower is
//! released with a clone of the outcome and the record is removed. A caller
//! arriving after settlement starts a fresh computation.
//!
//! # Example
//!
//! ```
//! use soloflight::Merger;
//!
//! # async fn example() {
//! let merger: Merger<String, String> = Merger::new();
//!
//! // Concurrent calls with the same key share a single execution.
//! let result = merger.execute(&"user:123".to_string(), || async {
//!     "expensive_result".to_string()
//! }).await;
//! # }
//! ```
//!
//! # Failure broadcast
//!
//! `Merger` is agnostic to success or failure: the result type is whatever
//! the closure produces, so callers that need shared failures use
//! `T = Result<V, E>` with cloneable `E`. Nothing is retained after
//! settlement, so a failed computation is retried by the next caller.
//!
//! # Cancellation and panic safety
//!
//! Leadership is not assigned up front; it is whoever acquires the slot lock
//! while the slot is still empty. If that caller is cancelled, dropped, or
//! panics, the lock is released and the next waiter computes with its own
//! closure. Followers that attach before the leader settles receive the
//! leader's result without invoking their closure.

use std::{
    collections::HashMap,
    hash::Hash,
    sync::{Arc, Weak},
};

use futures_util::lock::Mutex as AsyncMutex;
use parking_lot::Mutex as SyncMutex;

type SharedMapping<K, T> = Arc<SyncMutex<HashMap<K, Broadcast<T>>>>;

/// Deduplicates concurrent async computations keyed by `K`.
///
/// For any key, at most one computation is in flight at a time within the
/// process; concurrent callers for the same key attach to it and receive a
/// clone of the single eventual result.
#[derive(Debug)]
pub struct Merger<K, T> {
    mapping: SharedMapping<K, T>,
}

impl<K, T> Default for Merger<K, T> {
    fn default() -> Self {
        Self { mapping: Arc::default() }
    }
}

/// Shared state between every caller attached to one in-flight computation.
///
/// The computing caller holds the async `slot` mutex for the duration of the
/// work, so followers block on `lock().await` until the result lands or the
/// leader vanishes (releasing the lock with the slot still empty).
struct Shared<T> {
    slot: AsyncMutex<Option<T>>,
}

/// In-flight record stored in the mapping.
///
/// Holds only a weak reference: when every waiter for a key is dropped before
/// settling, the record is dead and the next caller regenerates it.
struct Broadcast<T> {
    shared: Weak<Shared<T>>,
}

impl<T> Broadcast<T> {
    fn new() -> (Self, Arc<Shared<T>>) {
        let shared = Arc::new(Shared {
            slot: AsyncMutex::new(None),
        });
        (
            Self {
                shared: Arc::downgrade(&shared),
            },
            shared,
        )
    }
}

impl<T> std::fmt::Debug for Broadcast<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Broadcast")
    }
}

struct Waiter<K, T, F> {
    shared: Arc<Shared<T>>,
    key: K,
    mapping: SharedMapping<K, T>,
    func: F,
}

impl<K, T, F, Fut> Waiter<K, T, F>
where
    K: Hash + Eq,
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
    T: Clone,
{
    async fn wait(self) -> T {
        let Self {
            shared,
            key,
            mapping,
            func,
        } = self;

        // Whoever acquires the lock first while the slot is empty computes;
        // everyone else finds the settled result here.
        let mut slot = shared.slot.lock().await;
        if let Some(value) = slot.as_ref() {
            return value.clone();
        }

        let value = func().await;
        *slot = Some(value.clone());
        drop(slot);

        // The computation settled; the in-flight record must go away now so
        // that later callers start fresh.
        let _removed = mapping.lock().remove(&key);

        value
    }
}

impl<K, T> Merger<K, T>
where
    K: Hash + Eq + Clone,
{
    /// Creates a new `Merger`.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Executes `func` for the given key, coalescing with any computation
    /// already in flight for that key.
    ///
    /// If no computation for `key` is in flight, this caller starts one.
    /// Otherwise it attaches as a follower and receives a clone of the
    /// in-flight result without `func` being invoked — including a caller
    /// that arrives just before settlement.
    ///
    /// The returned future owns its key and shared state, so it may be held
    /// past the lifetime of the `key` reference (precise capturing excludes
    /// the `&self` and `&K` borrows).
    pub fn execute<F, Fut>(&self, key: &K, func: F) -> impl Future<Output = T> + use<K, T, F, Fut>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
        T: Clone,
    {
        let owned_mapping = Arc::clone(&self.mapping);
        let mut mapping = self.mapping.lock();

        let shared = match mapping.get_mut(key) {
            // Attach to the live broadcast, or regenerate it if every
            // previous participant dropped before settling.
            Some(broadcast) => broadcast.shared.upgrade().unwrap_or_else(|| {
                let (replacement, shared) = Broadcast::new();
                *broadcast = replacement;
                shared
            }),
            None => {
                let (broadcast, shared) = Broadcast::new();
                mapping.insert(key.clone(), broadcast);
                shared
            }
        };
        drop(mapping);

        let waiter = Waiter {
            shared,
            key: key.clone(),
            mapping: owned_mapping,
            func,
        };
        waiter.wait()
    }

    /// Returns the number of computations currently in flight.
    ///
    /// Dead records (every waiter dropped before settling) are not counted.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.mapping.lock().values().filter(|b| b.shared.strong_count() > 0).count()
    }
}
