use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use log::{error, info, warn};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::flag;
use crate::Result;
use crate::clock::{Clock, SystemClock};
use crate::config::{AppConfig, SnapshotConfig, WindowConfig};
use crate::datetime_utils::format_timestamp_secs;
use crate::execution::{bind, start_web, CounterHandler, FlushScheduler, Flusher, PendingTally, PeriodicSnapshot};
use crate::window::{BoxedWindowStore, SharedWindow, WindowStore};
use crate::window::snapshot::{load_snapshot, save_snapshot, Snapshot};

/// Restores the window from the snapshot file and fast-forwards it to `now`.
/// Any problem with the file yields a fresh window instead.
pub fn restore_window(window: &WindowConfig, snapshot: &SnapshotConfig, now: u64) -> BoxedWindowStore {
    let fresh = || window.strategy.new_store(window.seconds);
    if !snapshot.enabled {
        return fresh();
    }
    let path = snapshot.path();
    let loaded = match load_snapshot(&path) {
        Ok(Some(loaded)) => loaded,
        Ok(None) => {
            info!("no snapshot at {}, starting with an empty window", path.display());
            return fresh();
        }
        Err(e) => {
            warn!("could not load snapshot, starting with an empty window: {}", e);
            return fresh();
        }
    };
    if let Err(e) = loaded.check_compatible(window.seconds, window.strategy) {
        warn!("ignoring snapshot {}: {}", path.display(), e);
        return fresh();
    }
    let mut store = loaded.into_store();
    let last_update = store.last_update();
    store.reconcile(now);
    info!(
        "restored {} window from {}, last update {}, {} requests still in window",
        store.strategy(), path.display(), format_timestamp_secs(last_update), store.total(now)
    );
    store
}

/// Final snapshot at shutdown. Failure is logged and does not block exit.
pub fn persist_window(window: &SharedWindow, path: &Path) {
    match save_snapshot(path, &Snapshot::capture(window)) {
        Ok(()) => info!("snapshot saved to {}", path.display()),
        Err(e) => error!("could not store request data: {}", e),
    }
}

/// Everything the running service shares between its threads.
pub struct Application {
    config: AppConfig,
    clock: Arc<dyn Clock>,
    tally: Arc<PendingTally>,
    window: Arc<SharedWindow>,
}

impl Application {
    pub fn new(config: AppConfig, clock: Arc<dyn Clock>) -> Self {
        let store = restore_window(&config.window, &config.snapshot, clock.now());
        Self {
            config,
            clock,
            tally: Arc::new(PendingTally::new()),
            window: Arc::new(SharedWindow::new(store)),
        }
    }

    pub fn window(&self) -> &Arc<SharedWindow> {
        &self.window
    }

    pub fn handler(&self) -> CounterHandler {
        CounterHandler::new(
            Arc::clone(&self.tally),
            Arc::clone(&self.window),
            Arc::clone(&self.clock),
            self.config.web.route.clone(),
            self.config.web.debug,
        )
    }

    pub fn flusher(&self) -> Flusher {
        Flusher::new(Arc::clone(&self.tally), Arc::clone(&self.window), Arc::clone(&self.clock))
    }

    /// Serves until `terminated` is set. Web workers are joined first, then the
    /// flush thread is stopped, so the shutdown snapshot sees every counted
    /// request and no tick races the save.
    pub fn run(self, terminated: Arc<AtomicBool>) -> Result<()> {
        let server = Arc::new(bind(&self.config.web.listen)?);
        info!("listening on {} route {}", self.config.web.listen, self.config.web.route);

        let periodic = self.config.snapshot.interval().map(|interval| PeriodicSnapshot {
            path: self.config.snapshot.path(),
            interval,
        });
        let scheduler = FlushScheduler::start(self.flusher(), self.config.flush.interval(), periodic)?;
        let workers = self.config.web.workers as usize;
        let handles = match start_web(server, Arc::new(self.handler()), workers, Arc::clone(&terminated)) {
            Ok(handles) => handles,
            Err(e) => {
                terminated.store(true, Ordering::Release);
                scheduler.stop();
                return Err(e);
            }
        };

        while !terminated.load(Ordering::Acquire) {
            thread::sleep(Duration::from_millis(50));
        }
        info!("termination requested, shutting down");

        for handle in handles {
            if handle.join().is_err() {
                error!("web thread panicked");
            }
        }
        scheduler.stop();
        if self.config.snapshot.enabled {
            persist_window(&self.window, &self.config.snapshot.path());
        }
        Ok(())
    }
}

pub fn run_application(config: AppConfig) -> Result<()> {
    info!("config: {:?}", config);
    let terminated: Arc<AtomicBool> = Arc::new(AtomicBool::new(false));
    flag::register(SIGINT, Arc::clone(&terminated)).map_err(|e| format!("failed to register SIGINT handler: {}", e))?;
    flag::register(SIGTERM, Arc::clone(&terminated)).map_err(|e| format!("failed to register SIGTERM handler: {}", e))?;
    let application = Application::new(config, Arc::new(SystemClock));
    application.run(terminated)
}
