// Copyright (c) The Cachalot Project Authors.
// Licensed under the MIT License.

//! Redis-backed remote cache tier.
//!
//! [`RedisTier`] implements [`RemoteTier`](cachalot_tier::RemoteTier) over a
//! [`ConnectionManager`], which multiplexes one connection across clones and
//! reconnects automatically after transport failures. Every Redis error is
//! surfaced as [`Error::RemoteUnavailable`](cachalot_tier::Error), which the
//! `cachalot` façade degrades to a cache miss.
//!
//! # Examples
//!
//! ```no_run
//! use cachalot_redis::RedisTier;
//! use cachalot_tier::RemoteTier;
//! use std::time::Duration;
//! # async fn example() -> Result<(), cachalot_tier::Error> {
//!
//! let tier = RedisTier::connect("redis://127.0.0.1:6379").await?;
//! tier.set("greeting", "\"hello\"", Duration::from_secs(60)).await?;
//!
//! assert_eq!(tier.get("greeting").await?.as_deref(), Some("\"hello\""));
//! # Ok(())
//! # }
//! ```

mod tier;

pub use tier::RedisTier;
