//! Chunked, read-once view of a file on disk.

use std::path::Path;

use bytes::{Bytes, BytesMut};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::error::{Result, ServeError};

/// One slice of file bytes, transmitted as a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub bytes: Bytes,
    /// Set on the chunk that reaches the size captured at open time.
    pub is_last: bool,
}

/// A file opened for transfer.
///
/// Chunks never extend past the size captured by [`ChunkedFile::open`], so
/// the bytes served always sum to the advertised length even if the file
/// grows meanwhile. A file that shrinks surfaces as a read error.
#[derive(Debug)]
pub struct ChunkedFile {
    file: File,
    size: u64,
    remaining: u64,
    chunk_size: usize,
}

impl ChunkedFile {
    pub async fn open(path: impl AsRef<Path>, chunk_size: usize) -> Result<Self> {
        let path = path.as_ref();
        let open_err = |source| ServeError::FileOpen {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).await.map_err(open_err)?;
        let meta = file.metadata().await.map_err(open_err)?;

        if !meta.is_file() {
            return Err(ServeError::NotAFile(path.to_path_buf()));
        }

        tracing::debug!(path = %path.display(), size = meta.len(), "Opened file for transfer");

        Ok(Self {
            file,
            size: meta.len(),
            remaining: meta.len(),
            chunk_size: chunk_size.max(1),
        })
    }

    /// Total byte count captured at open time.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Reads the next chunk, or `None` once every byte has been produced.
    pub async fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        if self.remaining == 0 {
            return Ok(None);
        }

        let len = self.remaining.min(self.chunk_size as u64) as usize;
        let mut buf = BytesMut::zeroed(len);
        self.file
            .read_exact(&mut buf)
            .await
            .map_err(ServeError::FileRead)?;

        self.remaining -= len as u64;

        Ok(Some(Chunk {
            bytes: buf.freeze(),
            is_last: self.remaining == 0,
        }))
    }
}
