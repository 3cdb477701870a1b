//! Writer registry
//!
//! Maps file path to [`FileLineWriter`] and ties the background worker's
//! lifetime to the number of live writers: the worker starts when the first
//! writer is created and stops, after a full drain, when the last one is
//! removed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::error;

use crate::config::WriterConfig;
use crate::error::{WriterError, WriterResult};
use crate::queue::PendingWriteQueue;
use crate::worker;
use crate::writer::FileLineWriter;

/// One worker run: its queue and its spawned task
///
/// Both are created fresh on every start so a completed queue from a
/// previous run never leaks into a new one.
struct Worker {
    queue: Arc<PendingWriteQueue>,
    handle: JoinHandle<()>,
}

struct RegistryState {
    writers: HashMap<PathBuf, Arc<FileLineWriter>>,
    /// Running iff `writers` is non-empty
    worker: Option<Worker>,
}

impl RegistryState {
    fn start_worker(&mut self, config: &WriterConfig) -> WriterResult<()> {
        if self.worker.is_some() {
            return Err(WriterError::AlreadyRunning);
        }
        let queue = PendingWriteQueue::new();
        let handle = tokio::spawn(worker::run(
            Arc::clone(&queue),
            Duration::from_millis(config.take_timeout_ms),
        ));
        self.worker = Some(Worker { queue, handle });
        Ok(())
    }
}

impl Drop for RegistryState {
    fn drop(&mut self) {
        // Dropping the registry with writers still live detaches the worker
        // task; completing the queue lets it drain and exit instead of
        // parking on `try_take` forever.
        if let Some(w) = &self.worker {
            w.queue.mark_complete();
        }
    }
}

pub(crate) struct RegistryShared {
    state: Mutex<RegistryState>,
    config: WriterConfig,
}

impl RegistryShared {
    /// Remove `path` from the map; stop the worker if it was the last entry
    ///
    /// Called by [`FileLineWriter::dispose`] strictly after the file handle
    /// has been closed. Stopping waits for the loop task to actually exit so
    /// no task is abandoned mid-flight.
    pub(crate) async fn release(&self, path: &Path) -> WriterResult<()> {
        let mut st = self.state.lock().await;
        st.writers.remove(path);

        if st.writers.is_empty() {
            let Worker { queue, handle } = st.worker.take().ok_or(WriterError::AlreadyStopped)?;
            queue.mark_complete();
            if let Err(e) = handle.await {
                error!(error = %e, "write worker task did not exit cleanly");
            }
        }
        Ok(())
    }
}

/// Registry of per-file line writers sharing one background I/O worker
///
/// Cheap to clone; all clones share the same state. Intended usage is one
/// instance coordinating all writers for the whole process (singleton by
/// convention, not enforced) — state is instance-owned, so multiple
/// registries and tests stay isolated.
#[derive(Clone)]
pub struct MultiFileWriter {
    shared: Arc<RegistryShared>,
}

impl MultiFileWriter {
    pub fn new() -> Self {
        Self::with_config(WriterConfig::default())
    }

    pub fn with_config(config: WriterConfig) -> Self {
        Self {
            shared: Arc::new(RegistryShared {
                state: Mutex::new(RegistryState {
                    writers: HashMap::new(),
                    worker: None,
                }),
                config,
            }),
        }
    }

    /// Register `path` and return its writer
    ///
    /// Deletes any pre-existing file at `path` and creates a fresh empty one.
    /// Creating the first writer starts the background worker with a fresh
    /// queue before returning.
    ///
    /// # Errors
    ///
    /// - `NullPath` if `path` is empty
    /// - `PathConflict` if a live writer already owns `path`
    /// - `Io` if the filesystem refuses to delete or create the file
    pub async fn create(&self, path: impl AsRef<Path>) -> WriterResult<Arc<FileLineWriter>> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(WriterError::NullPath);
        }

        let mut st = self.shared.state.lock().await;
        if st.writers.contains_key(path) {
            return Err(WriterError::PathConflict(path.display().to_string()));
        }

        // Open before possibly starting the worker, so an open failure can
        // never leave a worker running over an empty map.
        let file = FileLineWriter::open_clean(path)?;

        if st.writers.is_empty() {
            st.start_worker(&self.shared.config)?;
        }
        let queue = match &st.worker {
            Some(w) => Arc::clone(&w.queue),
            None => return Err(WriterError::AlreadyStopped),
        };

        let writer = Arc::new(FileLineWriter::new(
            path.to_path_buf(),
            file,
            queue,
            Arc::downgrade(&self.shared),
        ));
        st.writers.insert(path.to_path_buf(), Arc::clone(&writer));
        Ok(writer)
    }

    /// Dispose every remaining writer
    ///
    /// For cleanup by callers that never disposed their writers
    /// individually. Each writer drains and deregisters itself; safe to call
    /// even if some writers are being disposed concurrently.
    pub async fn dispose(&self) -> WriterResult<()> {
        let writers: Vec<Arc<FileLineWriter>> = {
            let st = self.shared.state.lock().await;
            st.writers.values().cloned().collect()
        };
        for writer in writers {
            writer.dispose().await?;
        }
        Ok(())
    }

    /// Whether the background worker task is currently running
    ///
    /// False before the first writer is created and false again after the
    /// last writer's removal (stop waits for the task to exit, so there is
    /// no lingering "alive" window).
    pub async fn is_worker_alive(&self) -> bool {
        self.shared.state.lock().await.worker.is_some()
    }

    /// Paths of all currently live writers
    pub async fn active_file_paths(&self) -> Vec<PathBuf> {
        self.shared.state.lock().await.writers.keys().cloned().collect()
    }
}

impl Default for MultiFileWriter {
    fn default() -> Self {
        Self::new()
    }
}
