//! Background reachability check for the online folder.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::info;

use crate::destination::LogDestination;
use crate::state::WriterState;

/// Default delay between reachability checks.
pub const DEFAULT_CONNECTIVITY_INTERVAL: Duration = Duration::from_millis(50);

/// Sole writer of the shared `online` flag.
pub struct ConnectivityMonitor {
    online: LogDestination,
    state: Arc<WriterState>,
    interval: Duration,
}

impl ConnectivityMonitor {
    pub fn new(online: LogDestination, state: Arc<WriterState>, interval: Duration) -> Self {
        Self {
            online,
            state,
            interval,
        }
    }

    /// Check once: the online folder counts as reachable when it exists or
    /// can be created.
    pub fn check(&self) -> bool {
        let reachable = self.online.try_ensure_folder();
        let was_online = self.state.set_online(reachable);
        if was_online != reachable {
            if reachable {
                info!(
                    "tandemlog: online log folder {} is reachable",
                    self.online.folder().display()
                );
            } else {
                info!(
                    "tandemlog: online log folder {} is unreachable; writing offline",
                    self.online.folder().display()
                );
            }
        }
        reachable
    }

    /// Poll until the writer stops.
    pub fn run(&self) {
        while self.state.is_running() {
            self.check();
            thread::sleep(self.interval);
        }
    }
}
