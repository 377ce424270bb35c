//! Flush Coordinator: bounds outstanding dirtied disk data by scheduling
//! background full-file syncs and gating new level allocations while
//! throttled.

use std::fs::File;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};

/// The threshold at which a typical low-memory device starts evicting
/// foreground pages.
pub const THROTTLE_THRESHOLD_BYTES: u64 = 50 * 1024 * 1024;

struct FlushJob {
    file: Arc<File>,
    bytes: u64,
}

/// Concurrency group other producer work (new level allocations) suspends
/// on while throttled.
struct Gate {
    mutex: Mutex<()>,
    condvar: Condvar,
}

/// Tracks outstanding dirtied bytes across a pyramid's levels and runs
/// background fsyncs for finished levels. An injected instance rather than
/// a hidden global: one is owned by each [`crate::pyramid::Pyramid`], and
/// tests build their own private instance the same way.
pub struct FlushCoordinator {
    dirty_bytes: Arc<AtomicU64>,
    throttled: Arc<AtomicBool>,
    gate: Arc<Gate>,
    sender: Mutex<Option<Sender<FlushJob>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl FlushCoordinator {
    /// Starts the background fsync worker (`Init`). Call [`Self::shutdown`]
    /// to stop it, or let `Drop` do it.
    pub fn new() -> Self {
        let dirty_bytes = Arc::new(AtomicU64::new(0));
        let throttled = Arc::new(AtomicBool::new(false));
        let gate = Arc::new(Gate {
            mutex: Mutex::new(()),
            condvar: Condvar::new(),
        });
        let (sender, receiver) = mpsc::channel::<FlushJob>();

        let worker_dirty = Arc::clone(&dirty_bytes);
        let worker_throttled = Arc::clone(&throttled);
        let worker_gate = Arc::clone(&gate);
        let handle = std::thread::Builder::new()
            .name("flush-coordinator".into())
            .spawn(move || {
                for job in receiver {
                    if let Err(e) = job.file.sync_all() {
                        eprintln!("[FLUSH] background fsync failed: {e}");
                    }
                    let previous = worker_dirty.fetch_sub(job.bytes, Ordering::AcqRel);
                    let now = previous.saturating_sub(job.bytes);
                    if now <= THROTTLE_THRESHOLD_BYTES {
                        worker_throttled.store(false, Ordering::Release);
                        let _guard = worker_gate.mutex.lock();
                        worker_gate.condvar.notify_all();
                    }
                }
            })
            .expect("failed to spawn flush coordinator worker");

        Self {
            dirty_bytes,
            throttled,
            gate,
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(handle)),
        }
    }

    /// Current outstanding dirtied bytes across all levels.
    pub fn dirty_bytes(&self) -> u64 {
        self.dirty_bytes.load(Ordering::Acquire)
    }

    pub fn is_throttled(&self) -> bool {
        self.throttled.load(Ordering::Acquire)
    }

    /// Records that a level finished (tile builder completed in final
    /// mode): atomically adds its size to `dirty_bytes` and schedules a
    /// background flush of its file.
    pub fn record_level_finished(&self, file: Arc<File>, bytes: u64) {
        let previous = self.dirty_bytes.fetch_add(bytes, Ordering::AcqRel);
        if previous + bytes > THROTTLE_THRESHOLD_BYTES {
            self.throttled.store(true, Ordering::Release);
        }
        if let Some(sender) = self.sender.lock().as_ref() {
            let _ = sender.send(FlushJob { file, bytes });
        }
    }

    /// Blocks the calling (producer) thread while throttled -- the
    /// concurrency model's only other suspension point besides decoder
    /// back-pressure.
    pub fn wait_if_throttled(&self) {
        let mut guard = self.gate.mutex.lock();
        while self.throttled.load(Ordering::Acquire) {
            self.gate.condvar.wait(&mut guard);
        }
    }

    /// Closes the job queue and joins the worker (`Shutdown`). Outstanding
    /// background fsyncs already queued are allowed to complete first; the
    /// counter is still decremented on their completion.
    pub fn shutdown(&self) {
        self.sender.lock().take();
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Default for FlushCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FlushCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
