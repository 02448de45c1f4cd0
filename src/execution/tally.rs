use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering::{AcqRel, Relaxed};

/// Requests seen since the last flush tick. Request threads only ever add,
/// the flush thread takes and resets in one atomic swap.
#[derive(Debug, Default)]
pub struct PendingTally {
    count: AtomicU64,
}

impl PendingTally {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment(&self) {
        self.count.fetch_add(1, Relaxed);
    }

    #[inline]
    pub fn take(&self) -> u64 {
        self.count.swap(0, AcqRel)
    }

    pub fn pending(&self) -> u64 {
        self.count.load(Relaxed)
    }
}
