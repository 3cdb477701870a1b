//! Per-file line writer
//!
//! A `FileLineWriter` owns one open output file. Writes are enqueued onto the
//! registry's shared queue and applied by the background worker; the caller
//! never performs disk I/O itself.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tracing::{trace, warn};

use crate::error::{WriterError, WriterResult};
use crate::queue::{DrainSignal, PendingWriteQueue, WriteTask};
use crate::registry::RegistryShared;

/// Writer for a single output file
///
/// Created through [`MultiFileWriter::create`](crate::MultiFileWriter::create).
/// `write_line` never blocks; `dispose` waits until every previously enqueued
/// line has been applied, then closes the file and deregisters the path.
pub struct FileLineWriter {
    path: PathBuf,

    /// Exclusively-owned open handle; `None` once dispose has closed it
    file: Arc<Mutex<Option<File>>>,

    queue: Arc<PendingWriteQueue>,
    drain: Arc<DrainSignal>,
    disposed: AtomicBool,

    /// Back-reference for deregistration; weak so writers never keep a
    /// dropped registry alive
    registry: Weak<RegistryShared>,
}

impl FileLineWriter {
    pub(crate) fn new(
        path: PathBuf,
        file: File,
        queue: Arc<PendingWriteQueue>,
        registry: Weak<RegistryShared>,
    ) -> Self {
        Self {
            path,
            file: Arc::new(Mutex::new(Some(file))),
            queue,
            drain: DrainSignal::new(),
            disposed: AtomicBool::new(false),
            registry,
        }
    }

    /// Delete any pre-existing file at `path` and create a fresh empty one,
    /// opened for append, so re-running with the same path starts clean
    pub(crate) fn open_clean(path: &Path) -> io::Result<File> {
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        OpenOptions::new().append(true).create_new(true).open(path)
    }

    /// Path this writer was registered under
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `dispose` has been called
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Snapshot of how many enqueued lines for this file are not yet applied
    pub fn pending_writes(&self) -> usize {
        self.queue.count_matching(|p| p == self.path)
    }

    /// Enqueue `text` + newline for appending to this writer's file
    ///
    /// Never blocks: the write is applied by the background worker, flushed
    /// immediately so there is no buffering window in which a crash loses an
    /// already-written line. A line racing queue shutdown is dropped rather
    /// than errored; callers racing a concurrent dispose get best-effort
    /// delivery of their last few lines.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyDisposed` if called after `dispose`.
    pub fn write_line(&self, text: &str) -> WriterResult<()> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(WriterError::AlreadyDisposed(self.path.display().to_string()));
        }

        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text);
        line.push('\n');

        let file = Arc::clone(&self.file);
        let accepted = self.queue.enqueue(WriteTask {
            path: self.path.clone(),
            drain: Arc::clone(&self.drain),
            apply: Box::new(move || {
                let mut guard = file.lock().unwrap_or_else(|e| e.into_inner());
                if let Some(f) = guard.as_mut() {
                    f.write_all(line.as_bytes())?;
                    f.flush()?;
                }
                Ok(())
            }),
        });

        if !accepted {
            trace!(path = %self.path.display(), "queue already completed, line dropped");
        }
        Ok(())
    }

    /// Drain, close and deregister this writer
    ///
    /// Blocks (awaits) until every line enqueued before this call has been
    /// applied, then closes the file handle, then removes the path from the
    /// registry — in that order, so the registry never reports the path free
    /// while the file is still open. Removing the last writer stops the
    /// background worker.
    ///
    /// A second call is a no-op, which makes
    /// [`MultiFileWriter::dispose`](crate::MultiFileWriter::dispose) safe
    /// against concurrent individual disposes.
    ///
    /// There is no timeout on the drain wait: a permanently stalled worker
    /// (e.g. disk unavailable) blocks this call forever.
    pub async fn dispose(&self) -> WriterResult<()> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        self.drain.drained().await;

        // Close before deregistering.
        drop(self.file.lock().unwrap_or_else(|e| e.into_inner()).take());

        match self.registry.upgrade() {
            Some(shared) => shared.release(&self.path).await,
            None => {
                warn!(path = %self.path.display(), "registry dropped before writer dispose");
                Ok(())
            }
        }
    }
}
