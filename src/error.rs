//! Error types for the file server.
//!
//! Every variant is scoped to a single connection except `Accept`, which is
//! scoped to a single accept attempt. None of them is fatal to the process.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A specialized `Result` type for serving operations.
pub type Result<T> = std::result::Result<T, ServeError>;

/// Failure modes of the accept loop and of a single session.
#[derive(Error, Debug)]
pub enum ServeError {
    /// Accepting a connection failed; the listener re-arms.
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),

    /// Reading the request failed or the peer reset the connection.
    #[error("read failed: {0}")]
    Read(#[source] io::Error),

    /// The inbound request grew past the configured limit without a terminator.
    #[error("request exceeds {limit} bytes without a terminator")]
    RequestTooLarge { limit: usize },

    /// The requested file could not be opened.
    #[error("cannot open '{}': {source}", .path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The requested path exists but is not a regular file.
    #[error("'{}' is not a regular file", .0.display())]
    NotAFile(PathBuf),

    /// Reading the next chunk failed mid-transfer.
    #[error("file read failed: {0}")]
    FileRead(#[source] io::Error),

    /// Writing to the socket failed.
    #[error("write failed: {0}")]
    Write(#[source] io::Error),

    /// The write queue has already stopped accepting buffers.
    #[error("write queue closed")]
    QueueClosed,
}
