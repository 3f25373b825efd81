//! Constant variables.
use std::time::Duration;

/// Bit width of the identifier ring.
pub const RING_BITS: usize = 160;
/// Default length of the successor list.
pub const DEFAULT_SUCC_MAX: u8 = 3;
/// Default stabilization cadence in seconds.
pub const DEFAULT_STABILIZE_INTERVAL: u64 = 3;
/// Floor of the stabilization cadence.
pub const MIN_STABILIZE_INTERVAL: Duration = Duration::from_millis(10);
/// Default timeout of a single remote call in milliseconds.
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 2000;
/// Default hop bound of a lookup walk.
pub const DEFAULT_MAX_LOOKUP_HOPS: usize = 64;
/// Factor applied to the per-hop budget to bound a whole lookup.
pub const LOOKUP_RETRY_FACTOR: u32 = 2;
/// Capacity of the ring event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;
