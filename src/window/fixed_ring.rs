use serde::{Deserialize, Serialize};
use crate::window::{elapsed_secs, is_fresh, RingIndex, StoreStrategy, WindowStore, MAX_WINDOW_SECONDS};

/// Ring of `window_seconds` slots indexed by `second mod W`.
///
/// Each slot remembers which absolute second it currently aggregates, so a slot
/// left behind by a gap in writes is filtered out by `total` even before the
/// ring comes back around to overwrite it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "FixedRingRecord")]
pub struct FixedRing {
    window_seconds: u64,
    counts: Vec<u64>,
    slot_seconds: Vec<u64>,
    current_slot: usize,
    last_update: u64,
}

impl FixedRing {
    pub fn new(window_seconds: u64) -> Self {
        let Some(width) = checked_width(window_seconds) else {
            panic!("window_seconds must be between 1 and {}", MAX_WINDOW_SECONDS);
        };
        FixedRing {
            window_seconds,
            counts: vec![0; width],
            slot_seconds: vec![0; width],
            current_slot: 0,
            last_update: 0,
        }
    }

    #[inline]
    fn width(&self) -> usize {
        self.counts.len()
    }

    pub fn current_slot(&self) -> usize {
        self.current_slot
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    fn clear(&mut self) {
        self.counts.iter_mut().for_each(|c| *c = 0);
    }
}

#[typetag::serde(name = "fixed_ring")]
impl WindowStore for FixedRing {
    fn strategy(&self) -> StoreStrategy {
        StoreStrategy::FixedRing
    }

    fn window_seconds(&self) -> u64 {
        self.window_seconds
    }

    fn last_update(&self) -> u64 {
        self.last_update
    }

    fn record(&mut self, slot_time: u64, delta: u64) {
        let slot = RingIndex::of_second(slot_time, self.width()).index();
        if self.slot_seconds[slot] == slot_time {
            self.counts[slot] += delta;
        } else {
            // slot held some other second
            self.slot_seconds[slot] = slot_time;
            self.counts[slot] = delta;
        }
        self.current_slot = slot;
        self.last_update = slot_time;
    }

    fn total(&self, now: u64) -> u64 {
        self.counts.iter()
            .zip(self.slot_seconds.iter())
            .filter(|(_, second)| is_fresh(**second, now, self.window_seconds))
            .map(|(count, _)| *count)
            .sum()
    }

    fn reconcile(&mut self, now: u64) {
        let idle = elapsed_secs(self.last_update, now);
        if idle >= self.window_seconds {
            self.clear();
            return;
        }
        // zero the `idle` seconds ending at now: (now - idle, now]
        let current = RingIndex::of_second(now, self.width());
        for slot in current.walk_back(idle as usize) {
            self.counts[slot.index()] = 0;
        }
    }

    fn describe(&self) -> String {
        let counts: Vec<String> = self.counts.iter().map(|c| c.to_string()).collect();
        format!("[{}] current_slot={}", counts.join(","), self.current_slot)
    }
}

fn checked_width(window_seconds: u64) -> Option<usize> {
    if window_seconds == 0 || window_seconds > MAX_WINDOW_SECONDS {
        return None;
    }
    usize::try_from(window_seconds).ok()
}

/// Wire form of [`FixedRing`]; decoding checks the vectors match the width.
#[derive(Deserialize)]
struct FixedRingRecord {
    window_seconds: u64,
    counts: Vec<u64>,
    slot_seconds: Vec<u64>,
    current_slot: usize,
    last_update: u64,
}

impl TryFrom<FixedRingRecord> for FixedRing {
    type Error = String;

    fn try_from(record: FixedRingRecord) -> Result<Self, Self::Error> {
        let width = checked_width(record.window_seconds).ok_or_else(|| {
            format!("fixed_ring window_seconds must be between 1 and {}, found {}", MAX_WINDOW_SECONDS, record.window_seconds)
        })?;
        if record.counts.len() != width || record.slot_seconds.len() != width {
            return Err(format!(
                "fixed_ring expects {} slots, found {} counts and {} slot seconds",
                width, record.counts.len(), record.slot_seconds.len()
            ));
        }
        if record.current_slot >= width {
            return Err(format!("fixed_ring current_slot {} out of range for {} slots", record.current_slot, width));
        }
        Ok(FixedRing {
            window_seconds: record.window_seconds,
            counts: record.counts,
            slot_seconds: record.slot_seconds,
            current_slot: record.current_slot,
            last_update: record.last_update,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: u64 = 1_495_048_810; // second 10 of the minute

    #[test]
    fn test_record_same_second_accumulates() {
        let mut ring = FixedRing::new(60);
        ring.record(T, 30);
        ring.record(T, 31);
        assert_eq!(ring.current_slot(), 10);
        assert_eq!(ring.counts()[10], 61);
        assert_eq!(ring.total(T), 61);
        assert_eq!(ring.last_update(), T);
    }

    #[test]
    fn test_record_reused_slot_discards_old_value() {
        let mut ring = FixedRing::new(60);
        ring.record(T, 30);
        ring.record(T + 60, 2);
        assert_eq!(ring.counts()[10], 2);
        assert_eq!(ring.total(T + 60), 2);
    }

    #[test]
    fn test_total_skips_slots_left_behind_by_a_gap() {
        let mut ring = FixedRing::new(60);
        ring.record(T, 30);
        ring.record(T + 61, 20);
        // slot 10 still physically holds 30
        assert_eq!(ring.counts()[10], 30);
        assert_eq!(ring.total(T + 61), 20);
    }

    #[test]
    fn test_reconcile_partial_walk_keeps_older_data() {
        let mut ring = FixedRing::new(60);
        let minute = T - 10; // second 0
        for s in 0..3 {
            ring.record(minute + s, 1);
        }
        ring.counts[5] = 9;
        // down for 5 seconds, back at second 7: slots 3..=7 are zeroed
        ring.reconcile(minute + 7);
        assert_eq!(ring.counts()[5], 0);
        assert_eq!(&ring.counts()[0..3], &[1, 1, 1]);
        assert_eq!(ring.total(minute + 7), 3);
    }

    #[test]
    fn test_reconcile_partial_walk_wraps_past_zero() {
        let mut ring = FixedRing::new(60);
        let minute = T - 10; // second 0
        // seconds 50..=57 of the previous minute
        for s in 50..58 {
            ring.record(minute - 60 + s, 1);
        }
        assert_eq!(ring.current_slot(), 57);
        // leftovers of an older rotation in the slots the walk must reach
        for slot in [58, 59, 0, 1] {
            ring.counts[slot] = 9;
        }
        // down for 4 seconds, back at second 1: slots 1, 0, 59, 58
        ring.reconcile(minute + 1);
        for slot in [58, 59, 0, 1] {
            assert_eq!(ring.counts()[slot], 0, "slot {}", slot);
        }
        assert_eq!(ring.counts()[57], 1);
        assert_eq!(ring.counts()[50], 1);
        assert_eq!(ring.total(minute + 1), 8);
    }

    #[test]
    fn test_reconcile_full_window_idle_clears() {
        let mut ring = FixedRing::new(60);
        ring.record(T, 30);
        ring.record(T + 1, 5);
        ring.reconcile(T + 61);
        assert!(ring.counts().iter().all(|c| *c == 0));
        assert_eq!(ring.total(T + 61), 0);
    }

    #[test]
    fn test_reconcile_idle_equal_to_window_clears() {
        let mut ring = FixedRing::new(60);
        ring.record(T, 30);
        ring.reconcile(T + 60);
        assert_eq!(ring.total(T + 60), 0);
    }

    #[test]
    fn test_decode_rejects_wrong_width() {
        let json = r#"{"window_seconds":3,"counts":[1,2],"slot_seconds":[0,0,0],"current_slot":0,"last_update":0}"#;
        let err = serde_json::from_str::<FixedRing>(json).unwrap_err();
        assert!(err.to_string().contains("expects 3 slots"), "{}", err);

        let json = r#"{"window_seconds":2,"counts":[1,2],"slot_seconds":[0,0],"current_slot":2,"last_update":0}"#;
        assert!(serde_json::from_str::<FixedRing>(json).is_err());
    }

    #[test]
    fn test_decode_rejects_oversized_width() {
        let json = r#"{"window_seconds":1099511627776,"counts":[],"slot_seconds":[],"current_slot":0,"last_update":0}"#;
        let err = serde_json::from_str::<FixedRing>(json).unwrap_err();
        assert!(err.to_string().contains("must be between 1 and 86400"), "{}", err);
    }

    #[test]
    fn test_describe() {
        let mut ring = FixedRing::new(3);
        ring.record(4, 2);
        assert_eq!(ring.describe(), "[0,2,0] current_slot=1");
    }
}
