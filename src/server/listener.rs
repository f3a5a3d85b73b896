use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::{TcpListener, TcpSocket};
use tracing::{Instrument, info, warn};

use crate::config::TransferConfig;
use crate::error::ServeError;
use crate::http::connection::Connection;

const BACKLOG: u32 = 1024;

/// Pause after the first failed accept; doubles per consecutive failure.
const ACCEPT_BACKOFF_BASE: Duration = Duration::from_millis(5);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// What the accept loop does with one completed accept.
#[derive(Debug)]
pub(crate) enum AcceptOutcome<T> {
    Dispatch(T),
    /// Log `error`, wait `delay`, then issue the next accept.
    Backoff { error: ServeError, delay: Duration },
}

/// Classifies an accept result and tracks consecutive failures.
///
/// Persistent errors such as descriptor exhaustion fail every accept at
/// once, so each retry waits a little longer, up to `ACCEPT_BACKOFF_MAX`.
/// Any success resets the count.
pub(crate) fn classify_accept<T>(
    accepted: io::Result<T>,
    failures: &mut u32,
) -> AcceptOutcome<T> {
    match accepted {
        Ok(conn) => {
            *failures = 0;
            AcceptOutcome::Dispatch(conn)
        }
        Err(e) => {
            let exp = (*failures).min(8);
            *failures = failures.saturating_add(1);
            AcceptOutcome::Backoff {
                error: ServeError::Accept(e),
                delay: (ACCEPT_BACKOFF_BASE * 2u32.pow(exp)).min(ACCEPT_BACKOFF_MAX),
            }
        }
    }
}

/// Owns the listening socket and hands every accepted stream to a fresh
/// [`Connection`].
pub struct Acceptor {
    listener: TcpListener,
    settings: Arc<TransferConfig>,
    next_id: u64,
}

impl Acceptor {
    /// Binds `addr` with address reuse enabled. Must be called from within a
    /// runtime.
    pub fn bind(addr: SocketAddr, settings: TransferConfig) -> anyhow::Result<Self> {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(true)?;
        socket
            .bind(addr)
            .with_context(|| format!("Failed to bind {addr}"))?;
        let listener = socket.listen(BACKLOG)?;

        info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            settings: Arc::new(settings),
            next_id: 1,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until `shutdown` completes.
    ///
    /// Exactly one accept is outstanding at any time. A failed accept is
    /// logged and the next one is issued after a short backoff; only
    /// `shutdown` closes the listener.
    pub async fn run_until<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut failures = 0;

        loop {
            let accepted = tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => accepted,
            };

            match classify_accept(accepted, &mut failures) {
                AcceptOutcome::Dispatch((socket, peer)) => self.dispatch(socket, peer),
                AcceptOutcome::Backoff { error, delay } => {
                    warn!(error = %error, ?delay, "Accept failed, re-arming");
                    tokio::select! {
                        _ = &mut shutdown => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        info!("Listener closed");
    }

    fn dispatch(&mut self, socket: tokio::net::TcpStream, peer: SocketAddr) {
        let id = self.next_id;
        self.next_id += 1;
        info!(id, %peer, "Accepted connection");

        let conn = Connection::new(socket, Arc::clone(&self.settings));
        let span = tracing::info_span!("session", id, %peer);

        tokio::spawn(
            async move {
                if let Err(e) = conn.run().await {
                    warn!(error = %e, "Connection ended with error");
                }
                tracing::debug!("Connection finished");
            }
            .instrument(span),
        );
    }
}
