use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use log::{debug, error, info, warn};
use crate::Result;
use crate::clock::Clock;
use crate::execution::PendingTally;
use crate::window::SharedWindow;
use crate::window::snapshot::{save_snapshot, Snapshot};

/// Moves the pending tally into the window, one batch per tick.
#[derive(Debug, Clone)]
pub struct Flusher {
    tally: Arc<PendingTally>,
    window: Arc<SharedWindow>,
    clock: Arc<dyn Clock>,
}

impl Flusher {
    pub fn new(tally: Arc<PendingTally>, window: Arc<SharedWindow>, clock: Arc<dyn Clock>) -> Self {
        Self { tally, window, clock }
    }

    /// Drains the tally into the current second and returns the drained amount.
    pub fn tick(&self) -> u64 {
        let delta = self.tally.take();
        self.window.record(self.clock.now(), delta);
        delta
    }

    pub fn window(&self) -> &Arc<SharedWindow> {
        &self.window
    }
}

#[derive(Debug, Clone)]
pub struct PeriodicSnapshot {
    pub path: PathBuf,
    pub interval: Duration,
}

impl PeriodicSnapshot {
    fn save(&self, flusher: &Flusher) {
        flusher.window.compact(flusher.clock.now());
        match save_snapshot(&self.path, &Snapshot::capture(&flusher.window)) {
            Ok(()) => debug!("periodic snapshot written to {}", self.path.display()),
            Err(e) => warn!("periodic snapshot failed: {}", e),
        }
    }
}

/// Runs a [`Flusher`] on its own thread every `interval` until stopped.
pub struct FlushScheduler {
    flusher: Flusher,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FlushScheduler {
    pub fn start(flusher: Flusher, interval: Duration, periodic: Option<PeriodicSnapshot>) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let handle = {
            let flusher = flusher.clone();
            let stop = Arc::clone(&stop);
            thread::Builder::new().name("flush".to_string()).spawn(move || {
                run_loop(&flusher, interval, periodic.as_ref(), &stop);
            }).map_err(|e| format!("failed to spawn flush thread: {}", e))?
        };
        info!("flush scheduler started, interval {:?}", interval);
        Ok(Self { flusher, stop, handle: Some(handle) })
    }

    /// Cancels the next tick, waits for the thread, then drains whatever arrived
    /// after the last tick. No tick runs once this returns.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.stop.store(true, Ordering::Release);
        handle.thread().unpark();
        if handle.join().is_err() {
            error!("flush thread panicked");
        }
        let drained = self.flusher.tick();
        info!("flush scheduler stopped, drained {} pending requests", drained);
    }
}

impl Drop for FlushScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_loop(flusher: &Flusher, interval: Duration, periodic: Option<&PeriodicSnapshot>, stop: &AtomicBool) {
    let mut last_snapshot = Instant::now();
    loop {
        thread::park_timeout(interval);
        if stop.load(Ordering::Acquire) {
            break;
        }
        flusher.tick();
        if let Some(periodic) = periodic {
            if last_snapshot.elapsed() >= periodic.interval {
                periodic.save(flusher);
                last_snapshot = Instant::now();
            }
        }
    }
}
