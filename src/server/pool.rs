use std::future::Future;

use anyhow::Context;
use tokio::runtime::{Builder, Runtime};

/// A fixed set of worker threads sharing one I/O reactor.
///
/// Every worker can drive any connection's next step, so a stalled
/// connection only parks its own task.
pub struct WorkerPool {
    runtime: Runtime,
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> anyhow::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(workers)
            .thread_name("chunkd-worker")
            .enable_all()
            .build()
            .context("Failed to start worker pool")?;

        tracing::debug!(workers, "Worker pool started");

        Ok(Self { runtime, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Blocks the calling thread until `fut` completes on the pool.
    pub fn block_on<F: Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }
}
