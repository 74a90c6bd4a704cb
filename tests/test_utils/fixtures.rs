//! Fixtures shared by the integration tests.
//!
//! Every writer under test gets its own temporary online and offline
//! folders plus a fixed identity, and runs with short polling intervals so
//! tests finish quickly.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use rstest::fixture;
use tandemlog::{Identity, Notifier, ShutdownTimeouts, TandemLogBuilder};
use tempfile::TempDir;

pub const APP: &str = "Inventory";

pub struct Folders {
    pub dir: TempDir,
    pub online: PathBuf,
    pub offline: PathBuf,
}

impl Folders {
    /// A plain file that no folder can be created beneath.
    pub fn blocker(&self) -> PathBuf {
        let path = self.dir.path().join("blocker");
        if !path.exists() {
            fs::write(&path, b"").expect("create blocker file");
        }
        path
    }

    /// An online path that cannot be created while the blocker exists.
    pub fn unreachable_online(&self) -> PathBuf {
        self.blocker().join("online")
    }
}

#[fixture]
pub fn folders() -> Folders {
    let dir = TempDir::new().expect("create temp dir");
    let online = dir.path().join("online");
    let offline = dir.path().join("offline");
    Folders {
        dir,
        online,
        offline,
    }
}

pub fn quick_timeouts() -> ShutdownTimeouts {
    ShutdownTimeouts {
        settle: Duration::from_millis(10),
        initialization: Duration::from_secs(5),
        in_flight: Duration::from_secs(5),
        flush: Duration::from_secs(5),
        stop: Duration::from_secs(2),
        poll: Duration::from_millis(5),
    }
}

pub fn quick_builder(online: impl Into<PathBuf>, offline: impl Into<PathBuf>) -> TandemLogBuilder {
    TandemLogBuilder::new(online, offline, APP)
        .with_connectivity_interval(Duration::from_millis(5))
        .with_reconcile_interval(Duration::from_millis(5))
        .with_flush_interval(Duration::from_millis(5))
        .with_retry_count(3)
        .with_retry_pause(Duration::ZERO)
        .with_shutdown_timeouts(quick_timeouts())
        .with_identity(Identity::new("alice", "ws-01"))
}

/// Poll `cond` until it holds, panicking after `timeout`.
pub fn wait_for(timeout: Duration, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + timeout;
    while !cond() {
        assert!(Instant::now() < deadline, "condition not met within {timeout:?}");
        thread::sleep(Duration::from_millis(5));
    }
}

pub fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_owned)
        .collect()
}

/// Records every notification it receives.
#[derive(Clone, Default)]
pub struct CollectingNotifier {
    seen: Arc<Mutex<Vec<(String, String)>>>,
}

impl CollectingNotifier {
    pub fn notifications(&self) -> Vec<(String, String)> {
        self.seen.lock().expect("notifier mutex poisoned").clone()
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, title: &str, message: &str) {
        self.seen
            .lock()
            .expect("notifier mutex poisoned")
            .push((title.to_owned(), message.to_owned()));
    }
}
