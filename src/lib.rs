//! chunkd - minimal chunked file server
//!
//! Serves one file per connection, streamed in bounded chunks through a
//! per-connection ordered write queue.

pub mod config;
pub mod error;
pub mod http;
pub mod server;
pub mod transfer;
