// Copyright (c) The Cachalot Project Authors.
// Licensed under the MIT License.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use cachalot::{CachingService, CachingServiceBuilder};
use cachalot_tier::{
    Clock, Error,
    testing::{MockRemote, RemoteOp},
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};

const MINUTE: Duration = Duration::from_secs(60);

fn service() -> (CachingService<MockRemote>, MockRemote, Clock) {
    let clock = Clock::new_frozen();
    let remote = MockRemote::new(clock.clone());
    let service = CachingService::new(clock.clone(), remote.clone());
    (service, remote, clock)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TokenProperties {
    identifier: String,
    decimals: u32,
}

/// A value that cannot cross the remote boundary: encoding always fails.
#[derive(Debug, Clone, PartialEq)]
struct Opaque(u64);

impl Serialize for Opaque {
    fn serialize<S>(&self, _serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        Err(serde::ser::Error::custom("opaque values cannot be encoded"))
    }
}

impl<'de> Deserialize<'de> for Opaque {
    fn deserialize<D>(_deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Err(serde::de::Error::custom("opaque values cannot be decoded"))
    }
}

#[tokio::test]
async fn computes_once_then_serves_from_cache() {
    let (service, remote, _) = service();
    let invocations = AtomicUsize::new(0);

    for _ in 0..3 {
        let value: u64 = service
            .get_or_set(
                "token:count",
                || async {
                    invocations.fetch_add(1, Ordering::SeqCst);
                    7
                },
                MINUTE,
                None,
            )
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    assert_eq!(invocations.load(Ordering::SeqCst), 1);
    // The single computation was written through to the remote tier.
    assert_eq!(remote.payload("token:count").as_deref(), Some("7"));
}

#[tokio::test]
async fn concurrent_callers_share_one_computation() {
    let (service, remote, _) = service();
    let invocations = Arc::new(AtomicUsize::new(0));

    let callers = (0..16).map(|_| {
        let invocations = Arc::clone(&invocations);
        let service = &service;
        async move {
            service
                .get_or_set(
                    "block:latest",
                    move || async move {
                        invocations.fetch_add(1, Ordering::SeqCst);
                        // Hold the flight open across poll points so every
                        // caller attaches before the result lands.
                        tokio::task::yield_now().await;
                        tokio::task::yield_now().await;
                        99_u64
                    },
                    MINUTE,
                    None,
                )
                .await
                .unwrap()
        }
    });

    let results = join_all(callers).await;

    assert_eq!(invocations.load(Ordering::SeqCst), 1);
    assert!(results.iter().all(|value| *value == 99));

    let writes = remote
        .operations()
        .into_iter()
        .filter(|op| matches!(op, RemoteOp::Set { .. }))
        .count();
    assert_eq!(writes, 1);
}

#[tokio::test]
async fn remote_hit_is_promoted_to_the_local_tier() {
    let (service, remote, _) = service();
    remote.seed("token:EGLD:supply", "\"20000000\"", MINUTE);

    let value: String = service
        .get_or_set("token:EGLD:supply", || async { unreachable!() }, MINUTE, None)
        .await
        .unwrap();
    assert_eq!(value, "20000000");

    // The promoted entry must now be served locally even when the remote
    // tier goes away entirely.
    remote.fail_when(|_| true);

    let local: Option<String> = service.get_local("token:EGLD:supply").await.unwrap();
    assert_eq!(local.as_deref(), Some("20000000"));

    let value: String = service
        .get_or_set("token:EGLD:supply", || async { unreachable!() }, MINUTE, None)
        .await
        .unwrap();
    assert_eq!(value, "20000000");
}

#[tokio::test]
async fn expired_entries_are_recomputed() {
    let (service, _, clock) = service();
    let invocations = AtomicUsize::new(0);
    let compute = || async {
        invocations.fetch_add(1, Ordering::SeqCst);
        1_u64
    };

    let _: u64 = service
        .get_or_set("epoch:current", compute, Duration::from_secs(10), None)
        .await
        .unwrap();
    clock.advance(Duration::from_secs(9));
    let _: u64 = service
        .get_or_set("epoch:current", compute, Duration::from_secs(10), None)
        .await
        .unwrap();
    assert_eq!(invocations.load(Ordering::SeqCst), 1);

    // Past the TTL both tiers report absent and the value is recomputed.
    clock.advance(Duration::from_secs(2));
    let _: u64 = service
        .get_or_set("epoch:current", compute, Duration::from_secs(10), None)
        .await
        .unwrap();
    assert_eq!(invocations.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn expired_local_entry_falls_back_to_remote() {
    let (service, _, clock) = service();
    let invocations = AtomicUsize::new(0);
    let compute = || async {
        invocations.fetch_add(1, Ordering::SeqCst);
        5_u64
    };

    // Local lifetime much shorter than remote.
    let _: u64 = service
        .get_or_set("shard:count", compute, MINUTE, Some(Duration::from_secs(5)))
        .await
        .unwrap();
    clock.advance(Duration::from_secs(6));

    // Local expired, remote still live: served without recomputing.
    let value: u64 = service
        .get_or_set("shard:count", compute, MINUTE, Some(Duration::from_secs(5)))
        .await
        .unwrap();
    assert_eq!(value, 5);
    assert_eq!(invocations.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn remote_outage_degrades_to_computation() {
    let (service, remote, _) = service();
    remote.fail_when(|_| true);

    let value: u64 = service
        .get_or_set("account:count", || async { 11 }, MINUTE, None)
        .await
        .unwrap();
    assert_eq!(value, 11);

    // The value still landed locally, so the next read does not recompute.
    let value: u64 = service
        .get_or_set("account:count", || async { unreachable!() }, MINUTE, None)
        .await
        .unwrap();
    assert_eq!(value, 11);
}

#[tokio::test]
async fn failed_computation_is_shared_and_not_cached() {
    let (service, remote, _) = service();
    let invocations = Arc::new(AtomicUsize::new(0));

    let callers = (0..4).map(|_| {
        let invocations = Arc::clone(&invocations);
        let service = &service;
        async move {
            service
                .try_get_or_set::<u64, _, _>(
                    "nft:thumbnail",
                    move || async move {
                        invocations.fetch_add(1, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        Err(std::io::Error::new(std::io::ErrorKind::TimedOut, "gateway timeout"))
                    },
                    MINUTE,
                    None,
                )
                .await
        }
    });

    let results = join_all(callers).await;

    assert_eq!(invocations.load(Ordering::SeqCst), 1);
    for result in results {
        let error = result.unwrap_err();
        assert!(matches!(error, Error::Computation { .. }));
        assert_eq!(
            error.source_as::<std::io::Error>().unwrap().kind(),
            std::io::ErrorKind::TimedOut
        );
    }

    // Nothing was cached, so the key retries on the next call.
    assert_eq!(remote.entry_count(), 0);
    let value: u64 = service
        .get_or_set("nft:thumbnail", || async { 3 }, MINUTE, None)
        .await
        .unwrap();
    assert_eq!(value, 3);
}

#[tokio::test]
async fn cached_value_short_circuits_a_failing_computation() {
    let (service, _, _) = service();

    service.set("x", 42_u64, MINUTE).await.unwrap();

    let value: u64 = service
        .try_get_or_set(
            "x",
            || async { Err(std::io::Error::other("must not run")) },
            MINUTE,
            None,
        )
        .await
        .unwrap();
    assert_eq!(value, 42);
}

#[tokio::test]
async fn set_writes_through_to_both_tiers() {
    let (service, remote, _) = service();

    let properties = TokenProperties {
        identifier: "WEGLD-bd4d79".to_string(),
        decimals: 18,
    };
    service.set("token:WEGLD:properties", properties.clone(), MINUTE).await.unwrap();

    let local: Option<TokenProperties> = service.get_local("token:WEGLD:properties").await.unwrap();
    assert_eq!(local, Some(properties));
    assert!(remote.payload("token:WEGLD:properties").is_some());
}

#[tokio::test]
async fn set_still_caches_locally_when_remote_is_down() {
    let (service, remote, _) = service();
    remote.fail_when(|op| matches!(op, RemoteOp::Set { .. }));

    service.set("flag", true, MINUTE).await.unwrap();

    let local: Option<bool> = service.get_local("flag").await.unwrap();
    assert_eq!(local, Some(true));
    assert_eq!(remote.entry_count(), 0);
}

#[tokio::test]
async fn local_accessors_bypass_the_remote_tier() {
    let (service, remote, _) = service();

    service.set_local("validator:keys", vec![1_u8, 2, 3], MINUTE).await.unwrap();

    let local: Option<Vec<u8>> = service.get_local("validator:keys").await.unwrap();
    assert_eq!(local, Some(vec![1, 2, 3]));
    assert!(remote.operations().is_empty());
}

#[tokio::test]
async fn local_read_under_a_different_type_is_a_miss() {
    let (service, _, _) = service();

    service.set_local("count", 42_u64, MINUTE).await.unwrap();

    let as_string: Option<String> = service.get_local("count").await.unwrap();
    assert_eq!(as_string, None);
    let as_number: Option<u64> = service.get_local("count").await.unwrap();
    assert_eq!(as_number, Some(42));
}

#[tokio::test]
async fn remote_accessors_bypass_the_local_tier() {
    let (service, _, _) = service();

    service.set_remote("init:complete", &true, MINUTE).await.unwrap();

    // Not visible locally; visible through the remote accessor.
    let local: Option<bool> = service.get_local("init:complete").await.unwrap();
    assert_eq!(local, None);
    let remote_value: Option<bool> = service.get_remote("init:complete").await.unwrap();
    assert_eq!(remote_value, Some(true));
}

#[tokio::test]
async fn remote_accessor_reads_absent_during_an_outage() {
    let (service, remote, _) = service();
    remote.seed("init:complete", "true", MINUTE);
    remote.fail_when(|_| true);

    let value: Option<bool> = service.get_remote("init:complete").await.unwrap();
    assert_eq!(value, None);
}

#[tokio::test]
async fn undecodable_remote_payload_is_recomputed() {
    let (service, remote, _) = service();
    remote.seed("token:count", "not-json", MINUTE);

    let value: u64 = service
        .get_or_set("token:count", || async { 12 }, MINUTE, None)
        .await
        .unwrap();
    assert_eq!(value, 12);
    // The recomputed value replaced the malformed payload.
    assert_eq!(remote.payload("token:count").as_deref(), Some("12"));
}

#[tokio::test]
async fn unencodable_value_is_returned_and_cached_locally() {
    let (service, remote, _) = service();
    let invocations = AtomicUsize::new(0);

    let value = service
        .get_or_set(
            "session:opaque",
            || async {
                invocations.fetch_add(1, Ordering::SeqCst);
                Opaque(9)
            },
            MINUTE,
            None,
        )
        .await
        .unwrap();
    assert_eq!(value, Opaque(9));
    // The encode failure skipped the remote write, not the caller.
    assert_eq!(remote.entry_count(), 0);

    // The value still landed in the local tier.
    let value: Opaque = service
        .get_or_set("session:opaque", || async { unreachable!() }, MINUTE, None)
        .await
        .unwrap();
    assert_eq!(value, Opaque(9));
    assert_eq!(invocations.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn delete_removes_from_both_tiers() {
    let (service, remote, _) = service();
    service.set("stale", 1_u64, MINUTE).await.unwrap();

    service.delete("stale").await.unwrap();

    let local: Option<u64> = service.get_local("stale").await.unwrap();
    assert_eq!(local, None);
    assert_eq!(remote.entry_count(), 0);
}

#[tokio::test]
async fn delete_propagates_remote_failures() {
    let (service, remote, _) = service();
    service.set("stale", 1_u64, MINUTE).await.unwrap();
    remote.fail_when(|op| matches!(op, RemoteOp::Delete(_)));

    let error = service.delete("stale").await.unwrap_err();
    assert!(error.is_remote_unavailable());
    // The local entry is gone regardless.
    let local: Option<u64> = service.get_local("stale").await.unwrap();
    assert_eq!(local, None);
}

#[tokio::test]
async fn flush_db_clears_both_tiers() {
    let (service, remote, _) = service();
    service.set("a", 1_u64, MINUTE).await.unwrap();
    service.set("b", 2_u64, MINUTE).await.unwrap();

    service.flush_db().await.unwrap();

    assert_eq!(remote.entry_count(), 0);
    let local: Option<u64> = service.get_local("a").await.unwrap();
    assert_eq!(local, None);
}

#[tokio::test]
async fn flush_db_propagates_remote_failures() {
    let (service, remote, _) = service();
    remote.fail_when(|op| matches!(op, RemoteOp::Flush));

    assert!(service.flush_db().await.unwrap_err().is_remote_unavailable());
}

#[tokio::test]
async fn invalid_keys_fail_fast() {
    let (service, remote, _) = service();

    let result: Result<u64, _> = service
        .get_or_set("", || async { unreachable!() }, MINUTE, None)
        .await;
    assert!(matches!(result, Err(Error::InvalidKey { .. })));

    let result: Result<u64, _> = service
        .get_or_set("token properties", || async { unreachable!() }, MINUTE, None)
        .await;
    assert!(matches!(result, Err(Error::InvalidKey { .. })));

    // Neither tier was touched.
    assert!(remote.operations().is_empty());
}

#[tokio::test]
async fn builder_bounds_the_local_tier() {
    let clock = Clock::new_frozen();
    let remote = MockRemote::new(clock.clone());
    let service = CachingServiceBuilder::new(clock)
        .local_capacity(1_000)
        .name("api-cache")
        .build(remote);

    service.set_local("k", 1_u64, MINUTE).await.unwrap();

    // The entry is readable immediately; the length is only an
    // eventually-consistent estimate and may still lag the insert.
    let local: Option<u64> = service.get_local("k").await.unwrap();
    assert_eq!(local, Some(1));
    assert!(service.local_len().is_some());
}

#[tokio::test]
async fn teardown_clears_local_state() {
    let (service, remote, _) = service();
    service.set("k", 1_u64, MINUTE).await.unwrap();

    service.teardown().await.unwrap();

    // Remote state is shared and survives a single instance shutting down.
    assert_eq!(remote.entry_count(), 1);
}
