mod ring_index;
mod fixed_ring;
mod sparse_map;
mod shared;
pub mod snapshot;

pub use ring_index::*;
pub use fixed_ring::*;
pub use sparse_map::*;
pub use shared::*;

use std::fmt::{self, Debug, Display};
use dyn_clone::DynClone;
use serde::{Deserialize, Serialize};

/// Widest window a store accepts: one day of per-second buckets.
pub const MAX_WINDOW_SECONDS: u64 = 86_400;

/// Seconds elapsed between `earlier` and `now`. A clock that moved backward
/// yields 0 instead of wrapping.
#[inline]
pub fn elapsed_secs(earlier: u64, now: u64) -> u64 {
    now.saturating_sub(earlier)
}

/// A bucket written at `written` still belongs to the window ending at `now`.
#[inline]
pub fn is_fresh(written: u64, now: u64, window_seconds: u64) -> bool {
    elapsed_secs(written, now) <= window_seconds
}

/// Per-second request accounting over a trailing window.
///
/// Mutated by a single writer (the flush scheduler) and read concurrently by
/// request handlers through [`SharedWindow`]. Implementations are serialized
/// into snapshots with their `strategy` tag.
#[typetag::serde(tag = "strategy")]
pub trait WindowStore: DynClone + Debug + Send + Sync {
    fn strategy(&self) -> StoreStrategy;

    fn window_seconds(&self) -> u64;

    /// Second of the most recent `record` call, 0 for a store never written.
    fn last_update(&self) -> u64;

    /// Adds `delta` events observed at `slot_time`.
    fn record(&mut self, slot_time: u64, delta: u64);

    /// Events recorded in `[now - W, now]`.
    fn total(&self, now: u64) -> u64;

    /// Fast-forwards a store restored from a snapshot to `now`, invalidating
    /// whatever the downtime made stale.
    fn reconcile(&mut self, now: u64);

    /// Releases memory held by stale buckets.
    fn compact(&mut self, _now: u64) {}

    /// Bucket dump for debug responses.
    fn describe(&self) -> String;
}
dyn_clone::clone_trait_object!(WindowStore);

pub type BoxedWindowStore = Box<dyn WindowStore>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum StoreStrategy {
    #[default]
    FixedRing,
    SparseMap,
}

impl StoreStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            StoreStrategy::FixedRing => "fixed_ring",
            StoreStrategy::SparseMap => "sparse_map",
        }
    }

    pub fn new_store(&self, window_seconds: u64) -> BoxedWindowStore {
        match self {
            StoreStrategy::FixedRing => Box::new(FixedRing::new(window_seconds)),
            StoreStrategy::SparseMap => Box::new(SparseMap::new(window_seconds)),
        }
    }
}

impl Display for StoreStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
