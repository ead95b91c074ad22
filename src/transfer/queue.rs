//! Background FIFO queue for shipping finished datasets to bulk storage.
//!
//! One dedicated thread drains the queue in submission order. Dropping the queue does not wait
//! for outstanding jobs; call [`TransferQueue::wait_idle`] first if they must complete.

use std::path::PathBuf;
use std::sync::mpsc::{Sender, channel};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;

use crate::foundation::error::{FoldError, FoldResult};
use crate::transfer::mover::move_dir_contents;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferJob {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Performs one directory move.
pub trait DirectoryMover: Send + 'static {
    fn move_dir(&mut self, job: &TransferJob) -> FoldResult<()>;
}

/// Filesystem mover used outside tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsMover;

impl DirectoryMover for FsMover {
    fn move_dir(&mut self, job: &TransferJob) -> FoldResult<()> {
        move_dir_contents(&job.source, &job.destination).map(|_| ())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransferStats {
    pub pending: usize,
    pub completed: u64,
    pub failed: u64,
}

#[derive(Default)]
struct Shared {
    stats: Mutex<TransferStats>,
    idle: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, TransferStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct TransferQueue {
    tx: Sender<TransferJob>,
    shared: Arc<Shared>,
}

impl TransferQueue {
    pub fn spawn() -> FoldResult<Self> {
        Self::with_mover(FsMover)
    }

    pub fn with_mover(mut mover: impl DirectoryMover) -> FoldResult<Self> {
        let (tx, rx) = channel::<TransferJob>();
        let shared = Arc::new(Shared::default());
        let worker_shared = Arc::clone(&shared);

        thread::Builder::new()
            .name("framefold-transfer".into())
            .spawn(move || {
                while let Ok(job) = rx.recv() {
                    tracing::info!(
                        source = %job.source.display(),
                        destination = %job.destination.display(),
                        "transfer started"
                    );
                    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        mover.move_dir(&job)
                    }));
                    let ok = match result {
                        Ok(Ok(())) => {
                            tracing::info!(destination = %job.destination.display(), "transfer done");
                            true
                        }
                        Ok(Err(e)) => {
                            tracing::error!(source = %job.source.display(), "transfer failed: {e}");
                            false
                        }
                        Err(_) => {
                            tracing::error!(source = %job.source.display(), "transfer panicked");
                            false
                        }
                    };

                    let mut stats = worker_shared.lock();
                    stats.pending = stats.pending.saturating_sub(1);
                    if ok {
                        stats.completed += 1;
                    } else {
                        stats.failed += 1;
                    }
                    if stats.pending == 0 {
                        worker_shared.idle.notify_all();
                    }
                }
            })
            .map_err(|e| FoldError::validation(format!("failed to spawn transfer worker: {e}")))?;

        Ok(Self { tx, shared })
    }

    /// Queue a move. Returns immediately.
    pub fn enqueue(&self, job: TransferJob) -> FoldResult<()> {
        self.shared.lock().pending += 1;
        if self.tx.send(job).is_err() {
            self.shared.lock().pending -= 1;
            return Err(FoldError::validation("transfer worker is no longer running"));
        }
        Ok(())
    }

    pub fn stats(&self) -> TransferStats {
        *self.shared.lock()
    }

    /// Block until every job enqueued so far has finished.
    pub fn wait_idle(&self) -> TransferStats {
        let mut stats = self.shared.lock();
        while stats.pending > 0 {
            stats = self
                .shared
                .idle
                .wait(stats)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *stats
    }
}

#[cfg(test)]
#[path = "../../tests/unit/transfer/queue.rs"]
mod tests;
