//! File-side of a transfer: resolving a requested name and reading it back
//! in bounded chunks.

pub mod resolve;
pub mod source;

pub use resolve::resolve_path;
pub use source::{Chunk, ChunkedFile};
