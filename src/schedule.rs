//! Fire-and-forget delayed work

use std::time::Duration;
use tracing::trace;

/// Run `task` once `delay` has elapsed without blocking the caller
///
/// Uses the ambient tokio runtime when there is one and a detached timer
/// thread otherwise.
pub(crate) fn run_after<F>(delay: Duration, task: F)
where
    F: FnOnce() + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                tokio::time::sleep(delay).await;
                task();
            });
        }
        Err(_) => {
            trace!("No tokio runtime, scheduling on a timer thread");
            std::thread::spawn(move || {
                std::thread::sleep(delay);
                task();
            });
        }
    }
}
