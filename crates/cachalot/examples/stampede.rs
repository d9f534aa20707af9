// Copyright (c) The Cachalot Project Authors.
// Licensed under the MIT License.

//! Stampede protection demonstration.
//!
//! Forty concurrent callers request the same uncached key; the upstream
//! computation runs exactly once and every caller receives its result.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use cachalot::CachingService;
use cachalot_tier::{Clock, testing::MockRemote};

#[tokio::main]
async fn main() -> Result<(), cachalot::Error> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let clock = Clock::new();
    let remote = MockRemote::new(clock.clone());
    let service = Arc::new(CachingService::new(clock, remote));
    let upstream_calls = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for caller in 0..40 {
        let service = Arc::clone(&service);
        let upstream_calls = Arc::clone(&upstream_calls);
        handles.push(tokio::spawn(async move {
            let value: u64 = service
                .get_or_set(
                    "block:latest:nonce",
                    || async move {
                        upstream_calls.fetch_add(1, Ordering::SeqCst);
                        // Simulated slow upstream fetch; every other caller
                        // arrives while this is pending and attaches to it.
                        tokio::time::sleep(Duration::from_millis(200)).await;
                        18_352_647
                    },
                    Duration::from_secs(6),
                    None,
                )
                .await
                .expect("cache lookup failed");
            println!("caller {caller:2} got {value}");
        }));
    }

    for handle in handles {
        handle.await.expect("caller task panicked");
    }

    println!("upstream calls: {}", upstream_calls.load(Ordering::SeqCst));
    assert_eq!(upstream_calls.load(Ordering::SeqCst), 1);

    Ok(())
}
