//! Parallel execution facilities available to coding algorithms.
//!
//! An [`Executor`] runs "job `i` for `i` in `0..n`", possibly concurrently,
//! and reports one status per job. Algorithms use it for slice threading
//! (rows of one picture) and frame threading (one job per unit of a batch).
//! The coder's own send/receive calls never run on executor threads.

use rayon::prelude::*;
use rayon::ThreadPool;
use std::fmt;
use std::ops::Range;
use transcode_core::{CodecError, CodecResult, Error, Result};

/// A job body: called once per job index.
pub type Job<'a> = dyn Fn(usize) -> CodecResult<()> + Sync + 'a;

/// Dispatches batches of independent jobs.
pub trait Executor: Send + Sync {
    /// Jobs that may run at the same time.
    fn concurrency(&self) -> usize;

    /// Run `job(i)` for every `i` in `0..jobs` and return the status of each,
    /// in index order. Every job runs even if another fails.
    fn execute(&self, jobs: usize, job: &Job<'_>) -> Vec<CodecResult<()>>;

    /// Run a batch, failing as a whole if any job failed.
    fn execute_all(&self, jobs: usize, job: &Job<'_>) -> CodecResult<()> {
        self.execute(jobs, job).into_iter().collect()
    }
}

/// Runs jobs one after another on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialExecutor;

impl Executor for SerialExecutor {
    fn concurrency(&self) -> usize {
        1
    }

    fn execute(&self, jobs: usize, job: &Job<'_>) -> Vec<CodecResult<()>> {
        (0..jobs).map(job).collect()
    }
}

/// Runs jobs on a dedicated rayon thread pool.
pub struct RayonExecutor {
    pool: ThreadPool,
}

impl RayonExecutor {
    /// Create an executor with `threads` named worker threads.
    pub fn new(threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|idx| format!("coder-worker-{}", idx))
            .build()
            .map_err(|e| Error::negotiation(format!("failed to create worker pool: {e}")))?;
        tracing::debug!(threads = pool.current_num_threads(), "worker pool created");
        Ok(Self { pool })
    }
}

impl Executor for RayonExecutor {
    fn concurrency(&self) -> usize {
        self.pool.current_num_threads()
    }

    fn execute(&self, jobs: usize, job: &Job<'_>) -> Vec<CodecResult<()>> {
        self.pool
            .install(|| (0..jobs).into_par_iter().map(job).collect())
    }
}

impl fmt::Debug for RayonExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RayonExecutor")
            .field("threads", &self.concurrency())
            .finish()
    }
}

/// Split `rows` into at most `slices` contiguous, non-empty row ranges.
pub fn split_rows(rows: usize, slices: usize) -> Vec<Range<usize>> {
    let slices = slices.clamp(1, rows.max(1));
    let base = rows / slices;
    let extra = rows % slices;
    let mut start = 0;
    (0..slices)
        .map(|i| {
            let len = base + usize::from(i < extra);
            let range = start..start + len;
            start += len;
            range
        })
        .filter(|r| !r.is_empty())
        .collect()
}

/// Wrap a job failure that is not already a codec error.
pub(crate) fn job_error(msg: impl Into<String>) -> CodecError {
    CodecError::Internal(msg.into())
}
