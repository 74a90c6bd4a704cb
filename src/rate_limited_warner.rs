use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Default minimum gap between warnings about re-queued batches.
pub const DEFAULT_WARN_INTERVAL: Duration = Duration::from_secs(5);

/// Helper that rate limits warnings about repeated write failures.
///
/// The caller records each event via [`record`](Self::record). The next call
/// to [`warn_if_due`](Self::warn_if_due) hands the accumulated count to the
/// callback once the interval has elapsed. [`flush`](Self::flush) reports any
/// pending count immediately.
#[derive(Debug)]
pub struct RateLimitedWarner {
    interval: Duration,
    inner: Mutex<WarnerState>,
}

#[derive(Debug)]
struct WarnerState {
    last_warn: Option<Instant>,
    pending: u64,
}

impl Default for RateLimitedWarner {
    fn default() -> Self {
        Self::new(DEFAULT_WARN_INTERVAL)
    }
}

impl RateLimitedWarner {
    /// The first warning is emitted as soon as an event is recorded.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            inner: Mutex::new(WarnerState {
                last_warn: None,
                pending: 0,
            }),
        }
    }

    pub fn record(&self) {
        self.inner.lock().pending += 1;
    }

    pub fn pending(&self) -> u64 {
        self.inner.lock().pending
    }

    pub fn warn_if_due(&self, warn: impl FnOnce(u64)) {
        self.warn_if_due_at(Instant::now(), warn);
    }

    pub(crate) fn warn_if_due_at(&self, now: Instant, warn: impl FnOnce(u64)) {
        let count = {
            let mut state = self.inner.lock();
            let due = state
                .last_warn
                .is_none_or(|last| now.saturating_duration_since(last) >= self.interval);
            if !due || state.pending == 0 {
                return;
            }
            state.last_warn = Some(now);
            std::mem::take(&mut state.pending)
        };
        warn(count);
    }

    pub fn flush(&self, warn: impl FnOnce(u64)) {
        let count = {
            let mut state = self.inner.lock();
            if state.pending == 0 {
                return;
            }
            state.last_warn = Some(Instant::now());
            std::mem::take(&mut state.pending)
        };
        warn(count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_first_warning_immediately() {
        let warner = RateLimitedWarner::new(Duration::from_secs(5));
        let mut warnings = Vec::new();
        warner.record();
        warner.warn_if_due(|c| warnings.push(c));
        assert_eq!(warnings, vec![1]);
    }

    #[test]
    fn rate_limits_subsequent_warnings() {
        let warner = RateLimitedWarner::new(Duration::from_secs(5));
        let start = Instant::now();
        let mut warnings = Vec::new();
        warner.record();
        warner.warn_if_due_at(start, |c| warnings.push(c));
        warner.record();
        warner.record();
        warner.warn_if_due_at(start + Duration::from_secs(1), |c| warnings.push(c));
        assert_eq!(warnings, vec![1]);
        warner.warn_if_due_at(start + Duration::from_secs(5), |c| warnings.push(c));
        assert_eq!(warnings, vec![1, 2]);
    }

    #[test]
    fn flush_emits_pending_warning() {
        let warner = RateLimitedWarner::default();
        let mut warnings = Vec::new();
        warner.record();
        warner.warn_if_due(|c| warnings.push(c));
        warner.record();
        warner.flush(|c| warnings.push(c));
        assert_eq!(warnings, vec![1, 1]);
        assert_eq!(warner.pending(), 0);
    }
}
