//! Bounded drain protocol run when the writer is torn down.
//!
//! Every phase is a polling wait with its own bound. A phase that runs out
//! of time is logged and skipped so a wedged dependency can never hold up
//! process exit.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::warn;
use parking_lot::Mutex;

use crate::queue::PendingQueue;
use crate::state::WriterState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShutdownTimeouts {
    /// Grace period for enqueues issued just before shutdown.
    pub settle: Duration,
    pub initialization: Duration,
    pub in_flight: Duration,
    pub flush: Duration,
    /// How long stopped loops get to exit.
    pub stop: Duration,
    pub poll: Duration,
}

impl Default for ShutdownTimeouts {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(100),
            initialization: Duration::from_secs(60),
            in_flight: Duration::from_secs(3 * 60),
            flush: Duration::from_secs(3 * 60),
            stop: Duration::from_secs(5),
            poll: Duration::from_millis(100),
        }
    }
}

/// Which phases finished within their bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShutdownReport {
    pub initialized: bool,
    pub enqueues_settled: bool,
    pub queue_flushed: bool,
    pub workers_stopped: bool,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.initialized && self.enqueues_settled && self.queue_flushed && self.workers_stopped
    }
}

/// Poll `done` every `poll` until it holds or `timeout` elapses.
pub(crate) fn wait_until(timeout: Duration, poll: Duration, mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if done() {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        thread::sleep(poll.min(deadline - now));
    }
}

pub(crate) struct ShutdownCoordinator<'a> {
    pub(crate) timeouts: ShutdownTimeouts,
    pub(crate) state: &'a WriterState,
    pub(crate) queue: &'a PendingQueue,
    pub(crate) workers: &'a Mutex<Vec<JoinHandle<()>>>,
}

impl ShutdownCoordinator<'_> {
    pub(crate) fn run(&self) -> ShutdownReport {
        let ShutdownTimeouts {
            settle,
            initialization,
            in_flight,
            flush,
            poll,
            ..
        } = self.timeouts;

        thread::sleep(settle);

        let initialized = wait_until(initialization, poll, || self.state.is_initialized());
        if !initialized {
            warn!("tandemlog: initialization did not finish within {initialization:?}");
        }

        let enqueues_settled = wait_until(in_flight, poll, || self.queue.in_flight() == 0);
        if !enqueues_settled {
            warn!(
                "tandemlog: {} enqueues still in flight after {in_flight:?}",
                self.queue.in_flight()
            );
        }

        let queue_flushed = wait_until(flush, poll, || {
            self.state.is_disabled() || (!self.state.is_flushing() && self.queue.is_empty())
        });
        if !queue_flushed {
            warn!(
                "tandemlog: {} lines still pending after {flush:?}",
                self.queue.len()
            );
        }

        self.state.stop();
        let workers_stopped = self.stop_workers();

        ShutdownReport {
            initialized,
            enqueues_settled,
            queue_flushed,
            workers_stopped,
        }
    }

    fn stop_workers(&self) -> bool {
        let ShutdownTimeouts { stop, poll, .. } = self.timeouts;
        let handles = std::mem::take(&mut *self.workers.lock());
        let stopped = wait_until(stop, poll.min(Duration::from_millis(10)), || {
            handles.iter().all(JoinHandle::is_finished)
        });
        for handle in handles {
            if !handle.is_finished() {
                let name = handle.thread().name().unwrap_or("worker").to_owned();
                warn!("tandemlog: {name} did not stop within {stop:?}");
                continue;
            }
            if handle.join().is_err() {
                warn!("tandemlog: worker thread panicked");
            }
        }
        stopped
    }
}
