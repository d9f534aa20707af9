// Copyright (c) The Cachalot Project Authors.
// Licensed under the MIT License.

//! Redis tier implementation.

use std::time::Duration;

use cachalot_tier::{Error, RemoteTier};
use redis::{AsyncCommands, aio::ConnectionManager};
use tracing::debug;

/// A shared cache tier backed by Redis.
///
/// Payloads are stored as plain strings under their cache key, with expiry
/// delegated to Redis via `SET ... EX`. The tier holds a
/// [`ConnectionManager`], so clones share one underlying connection and
/// reconnection is handled transparently; an operation issued while the
/// connection is down fails fast with
/// [`Error::RemoteUnavailable`](cachalot_tier::Error::RemoteUnavailable)
/// instead of blocking.
#[derive(Clone)]
pub struct RedisTier {
    manager: ConnectionManager,
}

impl RedisTier {
    /// Connects to the Redis instance at `url` (e.g. `redis://host:6379/0`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::RemoteUnavailable`](cachalot_tier::Error::RemoteUnavailable)
    /// if the URL is malformed or the initial connection cannot be
    /// established.
    pub async fn connect(url: &str) -> Result<Self, Error> {
        let client = redis::Client::open(url).map_err(Error::remote_unavailable)?;
        let manager = client
            .get_connection_manager()
            .await
            .map_err(Error::remote_unavailable)?;
        debug!("redis connection manager established");
        Ok(Self { manager })
    }

    /// Wraps an existing connection manager.
    #[must_use]
    pub fn new(manager: ConnectionManager) -> Self {
        Self { manager }
    }
}

/// Redis expiry has whole-second granularity; round fractional TTLs up so an
/// entry never outlives its requested lifetime by truncation, and clamp zero
/// to one second since `EX 0` is rejected by the server.
fn ttl_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 || secs == 0 { secs + 1 } else { secs }
}

impl RemoteTier for RedisTier {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let mut manager = self.manager.clone();
        manager.get(key).await.map_err(Error::remote_unavailable)
    }

    async fn set(&self, key: &str, payload: &str, ttl: Duration) -> Result<(), Error> {
        let mut manager = self.manager.clone();
        let () = manager
            .set_ex(key, payload, ttl_seconds(ttl))
            .await
            .map_err(Error::remote_unavailable)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        let mut manager = self.manager.clone();
        let () = manager.del(key).await.map_err(Error::remote_unavailable)?;
        Ok(())
    }

    async fn flush_all(&self) -> Result<(), Error> {
        let mut manager = self.manager.clone();
        let () = redis::cmd("FLUSHDB")
            .query_async(&mut manager)
            .await
            .map_err(Error::remote_unavailable)?;
        Ok(())
    }
}

impl std::fmt::Debug for RedisTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisTier").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_second_ttls_pass_through() {
        assert_eq!(ttl_seconds(Duration::from_secs(60)), 60);
        assert_eq!(ttl_seconds(Duration::from_secs(1)), 1);
    }

    #[test]
    fn fractional_ttls_round_up() {
        assert_eq!(ttl_seconds(Duration::from_millis(500)), 1);
        assert_eq!(ttl_seconds(Duration::from_millis(2500)), 3);
    }

    #[test]
    fn zero_ttl_clamps_to_one_second() {
        assert_eq!(ttl_seconds(Duration::ZERO), 1);
    }

    #[tokio::test]
    async fn malformed_url_is_remote_unavailable() {
        let result = RedisTier::connect("not-a-redis-url").await;
        assert!(matches!(result, Err(error) if error.is_remote_unavailable()));
    }
}
