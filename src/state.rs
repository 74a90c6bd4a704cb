//! Flags shared between the writer and its background loops.
//!
//! `online` has a single writer (the connectivity monitor); the other loops
//! read it and tolerate one poll interval of staleness. `disabled` is sticky:
//! once set it never clears.

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug)]
pub struct WriterState {
    online: AtomicBool,
    disabled: AtomicBool,
    running: AtomicBool,
    initialized: AtomicBool,
    flushing: AtomicBool,
}

impl Default for WriterState {
    fn default() -> Self {
        Self {
            online: AtomicBool::new(false),
            disabled: AtomicBool::new(false),
            running: AtomicBool::new(true),
            initialized: AtomicBool::new(false),
            flushing: AtomicBool::new(false),
        }
    }
}

impl WriterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    /// Store the connectivity flag and return the previous value.
    pub fn set_online(&self, online: bool) -> bool {
        self.online.swap(online, Ordering::AcqRel)
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Acquire)
    }

    /// Disable persistence for good. Returns `true` for the call that made
    /// the transition.
    pub fn disable(&self) -> bool {
        !self.disabled.swap(true, Ordering::AcqRel)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Ask every background loop to exit.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn mark_initialized(&self) {
        self.initialized.store(true, Ordering::Release);
    }

    pub fn is_flushing(&self) -> bool {
        self.flushing.load(Ordering::Acquire)
    }

    pub fn set_flushing(&self, flushing: bool) {
        self.flushing.store(flushing, Ordering::Release);
    }
}
