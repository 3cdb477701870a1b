//! Background worker loop
//!
//! One long-lived task per registry run. All disk I/O for every registered
//! file happens here, serially, never on caller tasks.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::queue::PendingWriteQueue;

/// Drain the queue until it is complete and empty
///
/// Each iteration takes the next pending write with a short timeout (so the
/// completion flag is re-checked periodically) and executes its apply closure
/// against the file handle captured inside it. An individual task failure is
/// logged and the loop continues; one failed line must not halt delivery of
/// lines for other files.
pub(crate) async fn run(queue: Arc<PendingWriteQueue>, take_timeout: Duration) {
    info!(take_timeout_ms = take_timeout.as_millis() as u64, "write worker started");

    loop {
        if queue.is_drained() {
            break;
        }

        let Some(task) = queue.try_take(take_timeout).await else {
            continue;
        };

        if let Err(e) = (task.apply)() {
            error!(path = %task.path.display(), error = %e, "write task failed");
        }

        // Signal after apply, success or not, so dispose never hangs on a
        // failed line.
        task.drain.finish_one();
    }

    info!("write worker stopped");
}
