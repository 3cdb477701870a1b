//! Shared queue of pending write tasks
//!
//! The queue is the only structure shared between caller tasks and the
//! background worker. Ordering within one file's tasks is FIFO; no ordering
//! is guaranteed across files.

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::time::Instant;

/// A single pending write, tagged with the target file identity
///
/// The apply closure captures the already-open file handle, so the worker
/// never touches the path->writer map.
pub(crate) struct WriteTask {
    /// Target file path (used to count pending work per file)
    pub path: PathBuf,

    /// Performs the actual write against the captured handle
    pub apply: Box<dyn FnOnce() -> io::Result<()> + Send>,

    /// Signalled by the worker after apply completes
    pub drain: Arc<DrainSignal>,
}

/// Per-writer count of enqueued-but-unapplied tasks, with wake-on-zero
///
/// Incremented under the queue lock on enqueue, decremented by the worker
/// after each apply. `drained` resolves the moment the count reaches zero,
/// so dispose never needs a polling interval.
pub(crate) struct DrainSignal {
    pending: watch::Sender<usize>,
}

impl DrainSignal {
    pub fn new() -> Arc<Self> {
        let (pending, _) = watch::channel(0);
        Arc::new(Self { pending })
    }

    fn add_one(&self) {
        self.pending.send_modify(|n| *n += 1);
    }

    pub fn finish_one(&self) {
        self.pending.send_modify(|n| *n = n.saturating_sub(1));
    }

    /// Wait until no tasks for this writer remain unapplied
    ///
    /// `wait_for` inspects the current value before parking, so a decrement
    /// that lands between the caller's last check and the subscription is
    /// never missed.
    pub async fn drained(&self) {
        let mut rx = self.pending.subscribe();
        // The sender lives as long as self, so wait_for cannot fail here.
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

struct QueueState {
    items: VecDeque<WriteTask>,
    completed: bool,
}

/// Unbounded FIFO queue of pending writes
///
/// One instance exists per worker run; the registry creates a fresh queue
/// every time the worker starts so a completed queue from a previous run
/// never leaks into a new one.
pub(crate) struct PendingWriteQueue {
    state: Mutex<QueueState>,
    /// Wakes the worker on enqueue and on completion
    notify: Notify,
}

impl PendingWriteQueue {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                completed: false,
            }),
            notify: Notify::new(),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append a task to the tail
    ///
    /// Returns `false` if the queue has already been marked complete; the
    /// task is dropped without touching its drain counter, so a straggling
    /// write racing shutdown never errors and never wedges dispose.
    pub fn enqueue(&self, task: WriteTask) -> bool {
        {
            let mut st = self.lock();
            if st.completed {
                return false;
            }
            task.drain.add_one();
            st.items.push_back(task);
        }
        self.notify.notify_one();
        true
    }

    /// Wait up to `timeout` for the next task
    ///
    /// Returns `None` on timeout, and `None` immediately once the queue is
    /// complete and empty so the worker loop can exit without waiting out
    /// the full timeout.
    pub async fn try_take(&self, timeout: Duration) -> Option<WriteTask> {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register for wakeups before inspecting state, so an enqueue
            // landing between the check and the await is not missed.
            notified.as_mut().enable();

            {
                let mut st = self.lock();
                if let Some(task) = st.items.pop_front() {
                    return Some(task);
                }
                if st.completed {
                    return None;
                }
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return None;
            }
        }
    }

    /// Disallow further enqueue; already-queued items remain to be drained
    pub fn mark_complete(&self) {
        self.lock().completed = true;
        self.notify.notify_waiters();
    }

    /// Point-in-time count of queued tasks whose path satisfies `pred`
    pub fn count_matching(&self, pred: impl Fn(&Path) -> bool) -> usize {
        self.lock().items.iter().filter(|t| pred(&t.path)).count()
    }

    /// True once no more items will ever arrive and none remain
    pub fn is_drained(&self) -> bool {
        let st = self.lock();
        st.completed && st.items.is_empty()
    }
}
