/// Surfaces the one user-facing failure: logging had to be disabled.
///
/// Host applications plug in their own message box or toast; the writer
/// calls it at most once per instance.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str);
}

/// Default notifier that reports through the `log` facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, message: &str) {
        log::error!("{title}: {message}");
    }
}
