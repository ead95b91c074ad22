//! Bounded worker pool for per-frame post-processing.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use rayon::prelude::*;

use crate::foundation::error::{FoldError, FoldResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Logical cores left free for the renderer and the rest of the system.
    pub reserved: usize,
    /// Upper bound on worker threads.
    pub max: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { reserved: 4, max: 60 }
    }
}

impl PoolConfig {
    pub fn worker_count(self, available: usize) -> usize {
        available.saturating_sub(self.reserved).clamp(1, self.max.max(1))
    }
}

/// Failure of one task in a batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskFailure {
    pub task: String,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub completed: usize,
    pub failures: Vec<TaskFailure>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct WorkerPool {
    pool: rayon::ThreadPool,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> FoldResult<Self> {
        if size == 0 {
            return Err(FoldError::validation("worker pool size must be >= 1"));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(|i| format!("framefold-post-{i}"))
            .build()
            .map_err(|e| FoldError::validation(format!("failed to build rayon thread pool: {e}")))?;
        Ok(Self { pool, size })
    }

    /// Size the pool from the machine's parallelism.
    pub fn from_config(cfg: PoolConfig) -> FoldResult<Self> {
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::new(cfg.worker_count(available))
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Run `task` once per item and block until every task has finished.
    ///
    /// A failing or panicking task is logged and recorded; the others still run.
    pub fn run_batch<T, F>(&self, items: &[T], task: F) -> BatchReport
    where
        T: fmt::Display + Sync,
        F: Fn(&T) -> FoldResult<()> + Sync,
    {
        let results: Vec<Option<TaskFailure>> = self.pool.install(|| {
            items
                .par_iter()
                .map(|item| {
                    let message = match catch_unwind(AssertUnwindSafe(|| task(item))) {
                        Ok(Ok(())) => return None,
                        Ok(Err(e)) => e.to_string(),
                        Err(panic) => panic_message(panic.as_ref()),
                    };
                    tracing::error!(task = %item, "post-processing failed: {message}");
                    Some(TaskFailure {
                        task: item.to_string(),
                        message,
                    })
                })
                .collect()
        });

        let mut report = BatchReport::default();
        for r in results {
            match r {
                None => report.completed += 1,
                Some(f) => report.failures.push(f),
            }
        }
        report
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/schedule/pool.rs"]
mod tests;
