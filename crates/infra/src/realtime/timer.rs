//! Cancellable, non-stacking reconnect timer

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

struct Pending {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// At most one pending task. Scheduling replaces whatever was pending, and
/// [`cancel`](Self::cancel) guarantees the pending task never starts.
#[derive(Default)]
pub struct ReconnectTimer {
    pending: Mutex<Option<Pending>>,
    scheduled: AtomicU32,
}

impl ReconnectTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `task` after `delay` on its own tokio task.
    pub fn schedule(&self, delay: Duration, task: BoxFuture<'static, ()>) {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    // Detached so replacing the timer from inside `task`
                    // cannot abort it.
                    tokio::spawn(task);
                }
            }
        });

        let previous = self.pending.lock().replace(Pending { cancel, handle });
        if let Some(previous) = previous {
            debug!("Replacing pending reconnect");
            previous.cancel.cancel();
            previous.handle.abort();
        }
        self.scheduled.fetch_add(1, Ordering::SeqCst);
    }

    pub fn cancel(&self) {
        if let Some(pending) = self.pending.lock().take() {
            pending.cancel.cancel();
            pending.handle.abort();
        }
    }

    /// True while a scheduled task has not fired yet.
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|p| !p.cancel.is_cancelled() && !p.handle.is_finished())
    }

    /// How many times [`schedule`](Self::schedule) was called.
    pub fn scheduled(&self) -> u32 {
        self.scheduled.load(Ordering::SeqCst)
    }
}

impl Drop for ReconnectTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
