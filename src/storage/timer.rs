//! One-Shot Sweep Timer
//!
//! The expiration sweep needs exactly one capability from its host
//! environment: "run this callback once, after this delay, unless I cancel
//! it first". [`OneShot`] wraps that up as a Tokio task that sleeps and then
//! invokes the callback.
//!
//! Cancellation aborts the task. Aborting is idempotent and safe even if the
//! callback already ran - the sweep itself is idempotent, so a timer that
//! slips through and fires redundantly does no harm.

use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// A cancellable, one-shot delayed callback.
///
/// Dropping the handle does *not* cancel the timer; the spawned task owns
/// itself until it fires or [`cancel`](OneShot::cancel) is called.
#[derive(Debug)]
pub(crate) struct OneShot {
    task: JoinHandle<()>,
}

impl OneShot {
    /// Schedules `callback` to run once after `delay`, on the given runtime.
    pub(crate) fn schedule<F>(runtime: &Handle, delay: Duration, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        });

        Self { task }
    }

    /// Cancels the timer if it has not fired yet.
    ///
    /// Safe to call multiple times and safe to call after the callback has
    /// already run.
    pub(crate) fn cancel(&self) {
        self.task.abort();
    }
}
