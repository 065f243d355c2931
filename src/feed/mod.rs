pub mod aggregate;
pub mod client;
pub mod mock;
pub mod parking;
pub mod traffic;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use types::TransportLivePayload;

/// Single-slot payload cache. The unit key keeps at most one snapshot while
/// moka's coalesced initialization gives single-flight refreshes: concurrent
/// callers arriving after expiry share one upstream round-trip.
pub type PayloadCache = Cache<(), Arc<TransportLivePayload>>;

pub fn init_cache(ttl: Duration) -> PayloadCache {
    Cache::builder().max_capacity(1).time_to_live(ttl).build()
}
