//! Depth-1 write coalescing.
//!
//! A [`Debouncer`] holds at most one pending value. Each new value replaces
//! the pending one and restarts the quiescence window; when the window
//! elapses with no newer value the pending one is flushed. Intermediate
//! values in a burst are dropped, never queued.
//!
//! ```text
//! push(a) ─┐ push(b) ─┐ push(c) ─┐
//!          └─ window ─┘          └──── window ────▶ flush(c)
//! ```

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

pub struct Debouncer<T> {
    tx: mpsc::UnboundedSender<T>,
    task: JoinHandle<()>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Spawn the coalescing task. `flush` runs on that task, one call at a
    /// time.
    pub fn spawn<F, Fut>(window: Duration, flush: F) -> Self
    where
        F: Fn(T) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(rx, window, flush));
        Self { tx, task }
    }

    /// Offer a new value. Returns false once the task is gone.
    pub fn push(&self, value: T) -> bool {
        self.tx.send(value).is_ok()
    }

    /// Stop accepting values, flush whatever is pending, and wait for the
    /// task to finish.
    pub async fn close(self) {
        drop(self.tx);
        let _ = self.task.await;
    }
}

async fn run<T, F, Fut>(mut rx: mpsc::UnboundedReceiver<T>, window: Duration, flush: F)
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut pending: Option<T> = None;

    loop {
        match pending.take() {
            None => match rx.recv().await {
                Some(v) => pending = Some(v),
                None => return,
            },
            Some(v) => {
                tokio::select! {
                    next = rx.recv() => match next {
                        Some(newer) => {
                            debug!("debounce: value superseded");
                            pending = Some(newer);
                        }
                        None => {
                            flush(v).await;
                            return;
                        }
                    },
                    _ = tokio::time::sleep(window) => flush(v).await,
                }
            }
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
