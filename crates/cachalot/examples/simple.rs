// Copyright (c) The Cachalot Project Authors.
// Licensed under the MIT License.

//! Basic tiered caching walkthrough.
//!
//! Uses the mock remote tier so the example runs without a Redis instance;
//! swap in `cachalot_redis::RedisTier` for a real deployment.

use std::time::Duration;

use cachalot::CachingService;
use cachalot_tier::{Clock, testing::MockRemote};

#[tokio::main]
async fn main() -> Result<(), cachalot::Error> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let clock = Clock::new();
    let remote = MockRemote::new(clock.clone());
    let service = CachingService::new(clock, remote);

    // First read misses both tiers and computes; the result is written
    // through with a one-week remote TTL and a one-day local TTL.
    let supply: u64 = service
        .get_or_set(
            "token:EGLD:supply",
            || async {
                println!("computing supply from upstream...");
                20_000_000
            },
            Duration::from_secs(7 * 24 * 3600),
            Some(Duration::from_secs(24 * 3600)),
        )
        .await?;
    println!("supply: {supply}");

    // Second read is a local hit; the closure never runs.
    let supply: u64 = service
        .get_or_set(
            "token:EGLD:supply",
            || async { unreachable!("served from cache") },
            Duration::from_secs(7 * 24 * 3600),
            None,
        )
        .await?;
    println!("supply, cached: {supply}");

    // Direct tier access for state that should not cross tiers.
    service.set_local("shard:id", 1_u32, Duration::from_secs(600)).await?;
    service.set_remote("init:complete", &true, Duration::from_secs(600)).await?;

    let shard: Option<u32> = service.get_local("shard:id").await?;
    let initialized: Option<bool> = service.get_remote("init:complete").await?;
    println!("shard: {shard:?}, initialized: {initialized:?}");

    Ok(())
}
