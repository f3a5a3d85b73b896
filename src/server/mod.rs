//! Listening socket and the worker pool it runs on.

pub mod listener;
pub mod pool;

pub use listener::Acceptor;
pub use pool::WorkerPool;

use crate::config::Config;

/// Starts the worker pool, binds the listener and serves until Ctrl-C.
pub fn serve(cfg: Config) -> anyhow::Result<()> {
    let addr = cfg.listen_addr()?;
    let pool = WorkerPool::new(cfg.server.workers)?;

    tracing::info!(
        workers = pool.workers(),
        chunk_size = cfg.transfer.chunk_size,
        "Starting file server"
    );
    match &cfg.transfer.root {
        Some(root) => tracing::info!(root = %root.display(), "Serving files under root"),
        None => tracing::warn!("No transfer.root configured, filenames are opened verbatim"),
    }

    pool.block_on(async move {
        let acceptor = Acceptor::bind(addr, cfg.transfer)?;

        acceptor
            .run_until(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "Cannot listen for shutdown signal");
                    std::future::pending::<()>().await;
                }
                tracing::info!("Shutdown signal received");
            })
            .await;

        Ok::<_, anyhow::Error>(())
    })
}
