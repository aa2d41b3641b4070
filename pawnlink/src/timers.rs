//! The timer / deferred invocation queue.
//!
//! One process-wide collection of pending invocations behind one
//! exclusive lock, advanced by an external polling tick. The lock only
//! protects the collection: due entries are copied out before firing, so
//! a callable may reentrantly register or cancel without deadlocking, and
//! a cancelled id can never fire again once `cancel` returns.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::value::{HostFnRef, Value};

/// Timer handle. Ids increase monotonically from 1 and are never reused;
/// 0 means "no timer".
pub type TimerId = u64;

pub const NO_TIMER: TimerId = 0;

struct TimerEntry {
    id: TimerId,
    func: HostFnRef,
    args: Option<Arc<[Value]>>,
    interval_ms: u64,
    repeating: bool,
    last_fired: u64,
}

/// The pending-invocation collection.
pub struct TimerQueue {
    entries: Mutex<Vec<TimerEntry>>,
    next_id: AtomicU64,
    epoch: Instant,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            epoch: Instant::now(),
        }
    }

    /// Register a delayed invocation. The queue takes its own references
    /// on the callable and the argument tuple, so they outlive the
    /// caller's scope. The entry first fires one full interval after
    /// registration, never at registration time.
    pub fn register(
        &self,
        func: HostFnRef,
        interval: Duration,
        repeating: bool,
        args: Option<Vec<Value>>,
    ) -> TimerId {
        self.register_at(func, interval, repeating, args, self.now_ms())
    }

    /// Register a fire-once invocation for the next tick. No id is
    /// handed out; a deferred call cannot be cancelled.
    pub fn defer(&self, func: HostFnRef, args: Option<Vec<Value>>) {
        self.register_at(func, Duration::ZERO, false, args, self.now_ms());
    }

    /// Remove the entry with `id`, releasing its references. A miss (an
    /// already-fired one-shot, an unknown id, or [`NO_TIMER`]) is a
    /// silent no-op.
    pub fn cancel(&self, id: TimerId) {
        if id == NO_TIMER {
            return;
        }
        let mut entries = self.entries.lock();
        if let Some(pos) = entries.iter().position(|e| e.id == id) {
            entries.remove(pos);
        }
    }

    /// Advance the queue: fire every entry whose interval has elapsed
    /// since it last fired. Driven by an external polling loop.
    pub fn tick(&self) {
        self.tick_at(self.now_ms());
    }

    pub fn pending(&self) -> usize {
        self.entries.lock().len()
    }

    fn register_at(
        &self,
        func: HostFnRef,
        interval: Duration,
        repeating: bool,
        args: Option<Vec<Value>>,
        now: u64,
    ) -> TimerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let entry = TimerEntry {
            id,
            func,
            args: args.map(Arc::from),
            interval_ms: interval.as_millis() as u64,
            repeating,
            last_fired: now,
        };
        self.entries.lock().push(entry);
        id
    }

    fn tick_at(&self, now: u64) {
        // copy due entries out: firing may register or cancel reentrantly,
        // and one-shot entries must already be gone when their callable
        // runs
        let due: Vec<(HostFnRef, Option<Arc<[Value]>>)> = {
            let mut entries = self.entries.lock();
            let mut due = Vec::new();
            let mut i = 0;
            while i < entries.len() {
                let entry = &mut entries[i];
                if now.saturating_sub(entry.last_fired) >= entry.interval_ms {
                    if entry.repeating {
                        entry.last_fired = now;
                        due.push((entry.func.clone(), entry.args.clone()));
                        i += 1;
                    } else {
                        let entry = entries.remove(i);
                        due.push((entry.func, entry.args));
                    }
                } else {
                    i += 1;
                }
            }
            due
        };

        for (func, args) in due {
            let args = args.as_deref().unwrap_or(&[]);
            if let Err(err) = func.invoke(args) {
                log::error!("timer callback failed: {err:#}");
            }
        }
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }
}

impl Default for TimerQueue {
    fn default() -> Self {
        Self::new()
    }
}
