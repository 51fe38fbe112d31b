use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Trailing-edge debounce: only the last scheduled task runs, once `delay`
/// has passed without another call to [`Debouncer::schedule`].
///
/// Rescheduling or cancelling only stops a task that is still waiting out
/// its delay. Once the task has started it runs to completion.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<Pending>,
}

#[derive(Debug)]
struct Pending {
    handle: JoinHandle<()>,
    fired: Arc<AtomicBool>,
}

impl Pending {
    fn is_waiting(&self) -> bool {
        !self.fired.load(Ordering::SeqCst) && !self.handle.is_finished()
    }
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace any waiting task with `task`. Returns false when there is no
    /// tokio runtime to run it on.
    pub fn schedule<F>(&mut self, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();

        let Ok(handle) = Handle::try_current() else {
            tracing::warn!("No async runtime available, debounced task dropped");
            return false;
        };

        let delay = self.delay;
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let handle = handle.spawn(async move {
            tokio::time::sleep(delay).await;
            flag.store(true, Ordering::SeqCst);
            task.await;
        });

        self.pending = Some(Pending { handle, fired });
        true
    }

    /// Abort the task if it is still waiting. Returns true if one was stopped.
    /// A task that already started is left to finish.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) if pending.is_waiting() => {
                pending.handle.abort();
                true
            }
            _ => false,
        }
    }

    /// True while a task is waiting out its delay
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(Pending::is_waiting)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.handle.abort();
        }
    }
}
