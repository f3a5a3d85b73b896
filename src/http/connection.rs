use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, ReadHalf};
use tokio::sync::mpsc;

use crate::config::TransferConfig;
use crate::error::{Result, ServeError};
use crate::http::parser::{find_request_end, parse_request};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::{PendingWrite, QueueEvent, Segment, WriteQueue, WriteQueueHandle};
use crate::transfer::{ChunkedFile, resolve_path};

/// One accepted connection: its read half, its write queue and, while a
/// transfer runs, the open file.
pub struct Connection<S> {
    reader: ReadHalf<S>,
    buffer: BytesMut,
    queue: WriteQueueHandle,
    events: mpsc::UnboundedReceiver<QueueEvent>,
    settings: Arc<TransferConfig>,
}

pub enum ConnectionState {
    AwaitingRequest,
    ResolvingFile(Request),
    StreamingFile { file: ChunkedFile, next_index: u64 },
    RespondingNotFound,
    /// The file is fully read and closed; the queue is still emptying.
    Draining,
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Splits `stream` and spawns its write queue on the current runtime.
    pub fn new(stream: S, settings: Arc<TransferConfig>) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        let (queue, events) = WriteQueue::spawn(writer);

        Self {
            reader,
            buffer: BytesMut::with_capacity(1024),
            queue,
            events,
            settings,
        }
    }

    /// Drives the connection to completion.
    ///
    /// Returns an error only when a response was under way and could not be
    /// finished. A client that goes away before completing a request ends the
    /// connection quietly.
    pub async fn run(mut self) -> Result<()> {
        let mut state = ConnectionState::AwaitingRequest;

        loop {
            state = match state {
                ConnectionState::AwaitingRequest => match self.read_request().await {
                    Ok(Some(req)) => ConnectionState::ResolvingFile(req),
                    Ok(None) => ConnectionState::Closed,
                    Err(e) => {
                        tracing::debug!(error = %e, "Dropping connection before a request");
                        self.queue.abort();
                        ConnectionState::Closed
                    }
                },

                ConnectionState::ResolvingFile(req) => self.resolve(req).await?,

                ConnectionState::StreamingFile { mut file, next_index } => {
                    self.wait_drained().await?;

                    match file.next_chunk().await {
                        Ok(Some(chunk)) => {
                            let is_last = chunk.is_last;
                            let write = PendingWrite::new(Segment::Chunk(next_index), chunk.bytes);
                            self.queue.enqueue(write)?;

                            if is_last {
                                drop(file);
                                tracing::debug!(chunks = next_index + 1, "File fully read");
                                ConnectionState::Draining
                            } else {
                                ConnectionState::StreamingFile {
                                    file,
                                    next_index: next_index + 1,
                                }
                            }
                        }
                        Ok(None) => {
                            drop(file);
                            self.queue.close();
                            ConnectionState::Closed
                        }
                        Err(e) => {
                            drop(file);
                            self.queue.abort();
                            return Err(e);
                        }
                    }
                }

                ConnectionState::RespondingNotFound | ConnectionState::Draining => {
                    self.wait_drained().await?;
                    self.queue.close();
                    ConnectionState::Closed
                }

                ConnectionState::Closed => break,
            };
        }

        Ok(())
    }

    /// Reads until one complete request block is buffered.
    ///
    /// The buffer never grows past `max_request_bytes`, so a block whose
    /// terminator lies beyond the limit is rejected. `Ok(None)` means the
    /// peer closed the connection first.
    async fn read_request(&mut self) -> Result<Option<Request>> {
        let limit = self.settings.max_request_bytes;

        loop {
            if let Some(end) = find_request_end(&self.buffer) {
                let block = self.buffer.split_to(end).freeze();
                return Ok(Some(parse_request(&block)));
            }

            let room = limit.saturating_sub(self.buffer.len());
            if room == 0 {
                return Err(ServeError::RequestTooLarge { limit });
            }

            let n = (&mut self.reader)
                .take(room as u64)
                .read_buf(&mut self.buffer)
                .await
                .map_err(ServeError::Read)?;

            if n == 0 {
                tracing::debug!("Client closed connection");
                return Ok(None);
            }
        }
    }

    async fn resolve(&mut self, req: Request) -> Result<ConnectionState> {
        let Request::Fetch { token, filename } = req else {
            tracing::debug!("Keep-alive received, awaiting another request");
            return Ok(ConnectionState::AwaitingRequest);
        };
        let shown = String::from_utf8_lossy(&token);

        let opened = match resolve_path(self.settings.root.as_deref(), &filename) {
            Some(path) => ChunkedFile::open(&path, self.settings.chunk_size)
                .await
                .map_err(|e| tracing::info!(error = %e, token = %shown, "File not served")),
            None => {
                tracing::info!(token = %shown, "No servable filename in request");
                Err(())
            }
        };

        match opened {
            Ok(file) => {
                tracing::info!(
                    filename = %String::from_utf8_lossy(&filename),
                    size = file.size(),
                    "Serving file"
                );
                let head = Response::file_header(&filename, file.size()).serialize();
                self.queue.enqueue(PendingWrite::new(Segment::Header, head))?;
                Ok(ConnectionState::StreamingFile { file, next_index: 0 })
            }
            Err(()) => {
                let page = Response::not_found(&token).serialize();
                self.queue.enqueue(PendingWrite::new(Segment::Body, page))?;
                Ok(ConnectionState::RespondingNotFound)
            }
        }
    }

    /// Waits for the write queue to empty, or surfaces its failure.
    async fn wait_drained(&mut self) -> Result<()> {
        match self.events.recv().await {
            Some(QueueEvent::Drained) => Ok(()),
            Some(QueueEvent::Failed(e)) => Err(e),
            None => Err(ServeError::QueueClosed),
        }
    }
}
