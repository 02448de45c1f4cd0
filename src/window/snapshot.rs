use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::Result;
use crate::datetime_utils::current_rfc3339;
use crate::window::{BoxedWindowStore, SharedWindow, StoreStrategy, WindowStore};

pub const SNAPSHOT_VERSION: u32 = 1;

/// Persisted form of a window store.
#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub saved_at: String,
    pub window: BoxedWindowStore,
}

impl Snapshot {
    pub fn from_store(window: BoxedWindowStore) -> Self {
        Snapshot { version: SNAPSHOT_VERSION, saved_at: current_rfc3339(), window }
    }

    pub fn capture(window: &SharedWindow) -> Self {
        Self::from_store(window.clone_store())
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| format!("failed to encode snapshot: {}", e))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_slice(bytes).map_err(|e| format!("failed to decode snapshot: {}", e))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(format!("unsupported snapshot version {}, expected {}", snapshot.version, SNAPSHOT_VERSION));
        }
        Ok(snapshot)
    }

    /// A snapshot taken under a different window width or strategy cannot be
    /// resumed: its buckets mean something else.
    pub fn check_compatible(&self, window_seconds: u64, strategy: StoreStrategy) -> Result<()> {
        if self.window.window_seconds() != window_seconds {
            return Err(format!("snapshot window is {}s, configured window is {}s", self.window.window_seconds(), window_seconds));
        }
        if self.window.strategy() != strategy {
            return Err(format!("snapshot strategy is {}, configured strategy is {}", self.window.strategy(), strategy));
        }
        Ok(())
    }

    pub fn into_store(self) -> BoxedWindowStore {
        self.window
    }
}

/// Reads the snapshot at `path`. `Ok(None)` means there is no file yet.
pub fn load_snapshot(path: &Path) -> Result<Option<Snapshot>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(format!("failed to read snapshot {}: {}", path.display(), e)),
    };
    Snapshot::decode(&bytes).map(Some)
}

/// Writes next to `path` and renames over it, so a crash mid-write never leaves
/// a truncated snapshot behind.
pub fn save_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let bytes = snapshot.encode()?;
    let tmp = tmp_path(path);
    fs::write(&tmp, bytes).map_err(|e| format!("failed to write snapshot {}: {}", tmp.display(), e))?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        format!("failed to move snapshot into {}: {}", path.display(), e)
    })
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
