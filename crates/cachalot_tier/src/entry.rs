// Copyright (c) The Cachalot Project Authors.
// Licensed under the MIT License.

use std::{
    ops::Deref,
    time::{Duration, SystemTime},
};

/// A cached value with expiration metadata.
///
/// `CacheEntry` wraps a value with an optional per-entry TTL and the absolute
/// time at which it was inserted. Tiers use this metadata to decide whether an
/// entry is still live; the value itself is opaque to them.
///
/// # Examples
///
/// ```
/// use cachalot_tier::CacheEntry;
/// use std::time::Duration;
///
/// // Simple entry with just a value
/// let entry = CacheEntry::new(42);
/// assert_eq!(*entry.value(), 42);
///
/// // Entry with a per-entry TTL
/// let entry = CacheEntry::with_ttl("data".to_string(), Duration::from_secs(60));
/// assert_eq!(entry.ttl(), Some(Duration::from_secs(60)));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntry<V> {
    value: V,
    cached_at: Option<SystemTime>,
    ttl: Option<Duration>,
}

impl<V> CacheEntry<V> {
    /// Creates a new cache entry with the given value and no TTL.
    ///
    /// The timestamp is stamped by the tier at insertion time.
    pub fn new(value: V) -> Self {
        Self {
            value,
            cached_at: None,
            ttl: None,
        }
    }

    /// Creates a new cache entry with a per-entry TTL.
    ///
    /// # Examples
    ///
    /// ```
    /// use cachalot_tier::CacheEntry;
    /// use std::time::Duration;
    ///
    /// let entry = CacheEntry::with_ttl(42, Duration::from_secs(300));
    /// assert_eq!(entry.ttl(), Some(Duration::from_secs(300)));
    /// ```
    pub fn with_ttl(value: V, ttl: Duration) -> Self {
        Self {
            value,
            cached_at: None,
            ttl: Some(ttl),
        }
    }

    /// Returns the time this entry was inserted, if it has been inserted yet.
    #[must_use]
    pub fn cached_at(&self) -> Option<SystemTime> {
        self.cached_at
    }

    /// Sets the insertion timestamp.
    pub fn set_cached_at(&mut self, cached_at: SystemTime) {
        self.cached_at = Some(cached_at);
    }

    /// Stamps the insertion timestamp unless one is already present.
    ///
    /// Tiers call this on insert so that re-inserting a pre-stamped entry
    /// (e.g. when promoting between tiers) preserves the original age.
    pub fn ensure_cached_at(&mut self, now: SystemTime) {
        if self.cached_at.is_none() {
            self.cached_at = Some(now);
        }
    }

    /// Returns the per-entry TTL, if set.
    #[must_use]
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Returns `true` if this entry's TTL has elapsed as of `now`.
    ///
    /// Entries without a TTL never expire. An entry that carries a TTL but no
    /// insertion timestamp is treated as expired, as is an entry whose
    /// timestamp lies in the future (the system clock went backwards).
    #[must_use]
    pub fn is_expired(&self, now: SystemTime) -> bool {
        let Some(ttl) = self.ttl else {
            return false;
        };
        match self.cached_at {
            Some(cached_at) => match now.duration_since(cached_at) {
                Ok(elapsed) => elapsed > ttl,
                Err(_) => true,
            },
            None => true,
        }
    }

    /// Consumes the entry and returns the inner value.
    #[must_use]
    pub fn into_value(self) -> V {
        self.value
    }

    /// Returns a reference to the cached value.
    #[must_use]
    pub fn value(&self) -> &V {
        &self.value
    }
}

impl<V> Deref for CacheEntry<V> {
    type Target = V;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<V> From<V> for CacheEntry<V> {
    fn from(value: V) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: SystemTime = SystemTime::UNIX_EPOCH;

    #[test]
    fn entry_without_ttl_never_expires() {
        let mut entry = CacheEntry::new(1);
        entry.set_cached_at(BASE);
        assert!(!entry.is_expired(BASE + Duration::from_secs(u32::MAX.into())));
    }

    #[test]
    fn entry_with_ttl_expires_after_elapsed() {
        let mut entry = CacheEntry::with_ttl(1, Duration::from_secs(10));
        entry.set_cached_at(BASE);
        assert!(!entry.is_expired(BASE + Duration::from_secs(10)));
        assert!(entry.is_expired(BASE + Duration::from_secs(11)));
    }

    #[test]
    fn entry_with_ttl_but_no_timestamp_is_expired() {
        let entry = CacheEntry::with_ttl(1, Duration::from_secs(10));
        assert!(entry.is_expired(BASE));
    }

    #[test]
    fn entry_with_future_timestamp_is_expired() {
        let mut entry = CacheEntry::with_ttl(1, Duration::from_secs(10));
        entry.set_cached_at(BASE + Duration::from_secs(100));
        assert!(entry.is_expired(BASE));
    }

    #[test]
    fn ensure_cached_at_preserves_existing_timestamp() {
        let mut entry = CacheEntry::new(1);
        entry.set_cached_at(BASE);
        entry.ensure_cached_at(BASE + Duration::from_secs(5));
        assert_eq!(entry.cached_at(), Some(BASE));
    }
}
