use std::collections::HashMap;
use ahash::RandomState;
use serde::{Deserialize, Serialize};
use crate::window::{is_fresh, StoreStrategy, WindowStore, MAX_WINDOW_SECONDS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TimeEntry {
    count: u64,
    last_update: u64,
}

/// Lazily created entries keyed by `second mod W`. Staleness is judged per
/// entry at read time, so restoring from a snapshot needs no fast-forward.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "SparseMapRecord", try_from = "SparseMapRecord")]
pub struct SparseMap {
    window_seconds: u64,
    entries: HashMap<u64, TimeEntry, RandomState>,
    last_update: u64,
}

impl SparseMap {
    pub fn new(window_seconds: u64) -> Self {
        assert!((1..=MAX_WINDOW_SECONDS).contains(&window_seconds), "window_seconds must be between 1 and {}", MAX_WINDOW_SECONDS);
        SparseMap {
            window_seconds,
            entries: HashMap::with_hasher(RandomState::new()),
            last_update: 0,
        }
    }

    #[inline]
    fn slot_key(&self, second: u64) -> u64 {
        second % self.window_seconds
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[typetag::serde(name = "sparse_map")]
impl WindowStore for SparseMap {
    fn strategy(&self) -> StoreStrategy {
        StoreStrategy::SparseMap
    }

    fn window_seconds(&self) -> u64 {
        self.window_seconds
    }

    fn last_update(&self) -> u64 {
        self.last_update
    }

    fn record(&mut self, slot_time: u64, delta: u64) {
        let key = self.slot_key(slot_time);
        self.entries.entry(key)
            .and_modify(|entry| {
                if entry.last_update == slot_time {
                    entry.count += delta;
                } else {
                    *entry = TimeEntry { count: delta, last_update: slot_time };
                }
            })
            .or_insert(TimeEntry { count: delta, last_update: slot_time });
        self.last_update = slot_time;
    }

    fn total(&self, now: u64) -> u64 {
        self.entries.values()
            .filter(|entry| is_fresh(entry.last_update, now, self.window_seconds))
            .map(|entry| entry.count)
            .sum()
    }

    fn reconcile(&mut self, _now: u64) {
        // stale entries are already excluded by `total`
    }

    fn compact(&mut self, now: u64) {
        let window_seconds = self.window_seconds;
        self.entries.retain(|_, entry| is_fresh(entry.last_update, now, window_seconds));
    }

    fn describe(&self) -> String {
        let mut keys: Vec<&u64> = self.entries.keys().collect();
        keys.sort();
        let parts: Vec<String> = keys.into_iter()
            .map(|key| {
                let entry = &self.entries[key];
                format!("{}:{}@{}", key, entry.count, entry.last_update)
            })
            .collect();
        format!("{{{}}}", parts.join(","))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SparseEntryRecord {
    slot: u64,
    count: u64,
    last_update: u64,
}

/// Wire form of [`SparseMap`]: entries as a list ordered by slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SparseMapRecord {
    window_seconds: u64,
    last_update: u64,
    entries: Vec<SparseEntryRecord>,
}

impl From<SparseMap> for SparseMapRecord {
    fn from(map: SparseMap) -> Self {
        let mut entries: Vec<SparseEntryRecord> = map.entries.into_iter()
            .map(|(slot, entry)| SparseEntryRecord { slot, count: entry.count, last_update: entry.last_update })
            .collect();
        entries.sort_by_key(|entry| entry.slot);
        SparseMapRecord { window_seconds: map.window_seconds, last_update: map.last_update, entries }
    }
}

impl TryFrom<SparseMapRecord> for SparseMap {
    type Error = String;

    fn try_from(record: SparseMapRecord) -> Result<Self, Self::Error> {
        if !(1..=MAX_WINDOW_SECONDS).contains(&record.window_seconds) {
            return Err(format!("sparse_map window_seconds must be between 1 and {}, found {}", MAX_WINDOW_SECONDS, record.window_seconds));
        }
        let mut map = SparseMap::new(record.window_seconds);
        map.last_update = record.last_update;
        for entry in record.entries {
            if entry.slot >= record.window_seconds {
                return Err(format!("sparse_map slot {} out of range for {} seconds", entry.slot, record.window_seconds));
            }
            map.entries.insert(entry.slot, TimeEntry { count: entry.count, last_update: entry.last_update });
        }
        Ok(map)
    }
}
