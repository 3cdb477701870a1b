//! linelog - concurrent multi-file line writer
//!
//! Writes text lines to multiple independent output files from many
//! concurrent callers, with all disk I/O for every file performed serially
//! on a single dedicated background worker task.
//!
//! Callers register a path with [`MultiFileWriter::create`], push lines
//! through the returned [`FileLineWriter`] (non-blocking), and call
//! `dispose` to drain and close the file. The worker starts with the first
//! writer and stops after the last one is removed.

pub mod config;
pub mod error;
pub mod registry;
pub mod writer;

mod queue;
mod worker;

// Re-exports
pub use config::WriterConfig;
pub use error::{WriterError, WriterResult};
pub use registry::MultiFileWriter;
pub use writer::FileLineWriter;
