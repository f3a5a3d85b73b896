//! Ordered write queue.
//!
//! Each connection gets one [`WriteQueue`] actor that owns the write half of
//! the socket and a FIFO of pending buffers. Producers talk to it through
//! cloneable [`WriteQueueHandle`]s from any worker thread; the actor's inbox
//! is the only path to the socket, so writes for one connection are mutually
//! exclusive and leave in submission order without any shared lock.
//!
//! At most one write is in flight at a time: the writer is moved into the
//! in-flight future and only handed back when that write completes.

use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::pin::Pin;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::error::ServeError;

/// What a queued buffer carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// A response head.
    Header,
    /// An inline response body.
    Body,
    /// The n-th chunk of a file, counting from zero.
    Chunk(u64),
}

/// An immutable buffer waiting for, or undergoing, transmission.
#[derive(Debug, Clone)]
pub struct PendingWrite {
    pub segment: Segment,
    pub bytes: Bytes,
}

impl PendingWrite {
    pub fn new(segment: Segment, bytes: impl Into<Bytes>) -> Self {
        Self {
            segment,
            bytes: bytes.into(),
        }
    }
}

/// Notifications sent back to the owning session.
#[derive(Debug)]
pub enum QueueEvent {
    /// The last pending buffer was written and the queue is empty.
    Drained,
    /// A write failed. Every pending buffer was dropped with the socket.
    Failed(ServeError),
}

#[derive(Debug)]
enum Command {
    Enqueue(PendingWrite),
    Close,
    Abort,
}

/// Producer side of a [`WriteQueue`].
#[derive(Debug, Clone)]
pub struct WriteQueueHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl WriteQueueHandle {
    /// Appends `write` to the tail of the queue.
    ///
    /// Fails with [`ServeError::QueueClosed`] once the queue has failed,
    /// been aborted or finished closing.
    pub fn enqueue(&self, write: PendingWrite) -> Result<(), ServeError> {
        self.tx
            .send(Command::Enqueue(write))
            .map_err(|_| ServeError::QueueClosed)
    }

    /// Shuts the write side down after everything enqueued so far is written.
    pub fn close(&self) {
        let _ = self.tx.send(Command::Close);
    }

    /// Drops pending buffers and the socket without writing them.
    pub fn abort(&self) {
        let _ = self.tx.send(Command::Abort);
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

type InFlight<W> = Pin<Box<dyn Future<Output = (W, io::Result<()>)> + Send>>;

/// The actor serializing all writes of one connection.
pub struct WriteQueue<W> {
    /// `None` while a write is in flight or after the socket was released.
    writer: Option<W>,
    pending: VecDeque<PendingWrite>,
    in_flight: Option<InFlight<W>>,
    inbox: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<QueueEvent>,
    closing: bool,
}

/// Outcome of a single step of the actor.
enum Flow {
    Continue,
    Stop,
}

impl<W> WriteQueue<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Creates the actor around `writer` without starting it.
    pub fn new(writer: W) -> (Self, WriteQueueHandle, mpsc::UnboundedReceiver<QueueEvent>) {
        let (tx, inbox) = mpsc::unbounded_channel();
        let (events, events_rx) = mpsc::unbounded_channel();

        let queue = Self {
            writer: Some(writer),
            pending: VecDeque::new(),
            in_flight: None,
            inbox,
            events,
            closing: false,
        };

        (queue, WriteQueueHandle { tx }, events_rx)
    }

    /// Spawns the actor on the current runtime.
    pub fn spawn(writer: W) -> (WriteQueueHandle, mpsc::UnboundedReceiver<QueueEvent>) {
        let (queue, handle, events) = Self::new(writer);
        tokio::spawn(queue.run());
        (handle, events)
    }

    /// Runs until closed, aborted, failed, or every handle is dropped and the
    /// remaining buffers are written.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                cmd = self.inbox.recv(), if !self.closing => {
                    if let Flow::Stop = self.on_command(cmd) {
                        break;
                    }
                }
                (writer, result) = wait_in_flight(&mut self.in_flight) => {
                    self.in_flight = None;
                    if let Flow::Stop = self.on_write_complete(writer, result) {
                        break;
                    }
                }
            }
        }

        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.shutdown().await {
                tracing::debug!(error = %e, "Socket shutdown failed");
            }
        }
    }

    fn on_command(&mut self, cmd: Option<Command>) -> Flow {
        match cmd {
            Some(Command::Enqueue(write)) => {
                self.enqueue(write);
                Flow::Continue
            }
            Some(Command::Close) | None => {
                self.closing = true;
                if self.in_flight.is_none() && self.pending.is_empty() {
                    Flow::Stop
                } else {
                    Flow::Continue
                }
            }
            Some(Command::Abort) => {
                tracing::debug!(dropped = self.pending.len(), "Write queue aborted");
                self.release();
                Flow::Stop
            }
        }
    }

    fn enqueue(&mut self, write: PendingWrite) {
        tracing::trace!(segment = ?write.segment, len = write.bytes.len(), "Queued write");
        self.pending.push_back(write);

        if self.pending.len() == 1 {
            self.start_transmission();
        }
    }

    /// Starts writing the head of the queue unless a write is already out.
    fn start_transmission(&mut self) {
        if self.in_flight.is_some() {
            return;
        }
        let Some(head) = self.pending.front() else {
            return;
        };
        let Some(mut writer) = self.writer.take() else {
            return;
        };

        let bytes = head.bytes.clone();
        self.in_flight = Some(Box::pin(async move {
            let result = writer.write_all(&bytes).await;
            (writer, result)
        }));
    }

    fn on_write_complete(&mut self, writer: W, result: io::Result<()>) -> Flow {
        if let Err(e) = result {
            drop(writer);
            self.release();
            let _ = self.events.send(QueueEvent::Failed(ServeError::Write(e)));
            return Flow::Stop;
        }

        self.writer = Some(writer);
        if let Some(done) = self.pending.pop_front() {
            tracing::trace!(segment = ?done.segment, "Write completed");
        }

        if !self.pending.is_empty() {
            self.start_transmission();
            return Flow::Continue;
        }

        if self.closing {
            return Flow::Stop;
        }

        let _ = self.events.send(QueueEvent::Drained);
        Flow::Continue
    }

    fn release(&mut self) {
        self.pending.clear();
        self.in_flight = None;
        self.writer = None;
        self.inbox.close();
    }
}

/// Resolves with the in-flight write, or never if there is none.
///
/// Dropping this future leaves the in-flight write in its slot.
async fn wait_in_flight<W>(slot: &mut Option<InFlight<W>>) -> (W, io::Result<()>) {
    match slot {
        Some(fut) => fut.await,
        None => std::future::pending().await,
    }
}
