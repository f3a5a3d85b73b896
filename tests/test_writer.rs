//! Ordering and failure behavior of the per-connection write queue.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use std::time::Duration;

use chunkd::error::ServeError;
use chunkd::http::writer::{PendingWrite, QueueEvent, Segment, WriteQueue};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, DuplexStream};
use tokio::time::{Sleep, timeout};

/// Delays the `stall_on`-th successful write by `delay`.
struct StallingWriter {
    inner: DuplexStream,
    writes: usize,
    stall_on: usize,
    delay: Duration,
    stall: Option<Pin<Box<Sleep>>>,
}

impl StallingWriter {
    fn new(inner: DuplexStream, stall_on: usize, delay: Duration) -> Self {
        Self {
            inner,
            writes: 0,
            stall_on,
            delay,
            stall: None,
        }
    }
}

impl AsyncWrite for StallingWriter {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = &mut *self;
        if this.writes == this.stall_on {
            let delay = this.delay;
            let sleep = this
                .stall
                .get_or_insert_with(|| Box::pin(tokio::time::sleep(delay)));
            ready!(sleep.as_mut().poll(cx));
        }

        let n = ready!(Pin::new(&mut this.inner).poll_write(cx, buf))?;
        this.writes += 1;
        Poll::Ready(Ok(n))
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

fn read_all<R>(mut reader: R) -> tokio::task::JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        out
    })
}

#[tokio::test]
async fn test_stalled_write_keeps_submission_order() {
    for stall_on in [0, 3, 17] {
        let (server, client) = tokio::io::duplex(64);
        let writer = StallingWriter::new(server, stall_on, Duration::from_millis(30));
        let (handle, _events) = WriteQueue::spawn(writer);
        let reader = read_all(client);

        let mut expected = String::new();
        for i in 0..40u64 {
            let piece = format!("{i:03},");
            expected.push_str(&piece);
            handle
                .enqueue(PendingWrite::new(Segment::Chunk(i), piece))
                .unwrap();
        }
        handle.close();

        let out = timeout(Duration::from_secs(5), reader).await.unwrap().unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), expected, "stall_on = {stall_on}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_producers_never_interleave() {
    const PRODUCERS: usize = 8;
    const PER_PRODUCER: usize = 100;

    let (server, client) = tokio::io::duplex(256);
    let writer = StallingWriter::new(server, 5, Duration::from_millis(20));
    let (handle, _events) = WriteQueue::spawn(writer);
    let reader = read_all(client);

    let mut producers = Vec::new();
    for p in 0..PRODUCERS {
        let handle = handle.clone();
        producers.push(tokio::spawn(async move {
            for seq in 0..PER_PRODUCER {
                let record = format!("p{p}:{seq};");
                handle
                    .enqueue(PendingWrite::new(Segment::Body, record))
                    .unwrap();
                tokio::task::yield_now().await;
            }
        }));
    }
    for producer in producers {
        producer.await.unwrap();
    }
    handle.close();

    let out = timeout(Duration::from_secs(5), reader).await.unwrap().unwrap();
    let text = String::from_utf8(out).unwrap();

    let mut last_seen = vec![None::<usize>; PRODUCERS];
    let mut total = 0;
    for record in text.split(';').filter(|r| !r.is_empty()) {
        let (p, seq) = record
            .strip_prefix('p')
            .and_then(|r| r.split_once(':'))
            .expect("record framing intact");
        let p: usize = p.parse().unwrap();
        let seq: usize = seq.parse().unwrap();

        assert_eq!(last_seen[p].map_or(0, |s| s + 1), seq, "producer {p} out of order");
        last_seen[p] = Some(seq);
        total += 1;
    }

    assert_eq!(total, PRODUCERS * PER_PRODUCER);
}

#[tokio::test]
async fn test_drained_after_queue_empties() {
    let (server, mut client) = tokio::io::duplex(1024);
    let (handle, mut events) = WriteQueue::spawn(server);

    handle
        .enqueue(PendingWrite::new(Segment::Header, "head"))
        .unwrap();
    handle
        .enqueue(PendingWrite::new(Segment::Chunk(0), "body"))
        .unwrap();

    let event = timeout(Duration::from_secs(1), events.recv()).await.unwrap();
    assert!(matches!(event, Some(QueueEvent::Drained)));

    let mut buf = [0u8; 8];
    client.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"headbody");

    handle
        .enqueue(PendingWrite::new(Segment::Chunk(1), "more"))
        .unwrap();
    let event = timeout(Duration::from_secs(1), events.recv()).await.unwrap();
    assert!(matches!(event, Some(QueueEvent::Drained)));
}

#[tokio::test]
async fn test_close_flushes_then_shuts_down() {
    let (server, client) = tokio::io::duplex(16);
    let (handle, mut events) = WriteQueue::spawn(server);
    let reader = read_all(client);

    handle
        .enqueue(PendingWrite::new(Segment::Body, vec![b'x'; 100]))
        .unwrap();
    handle.close();

    let out = timeout(Duration::from_secs(1), reader).await.unwrap().unwrap();
    assert_eq!(out, vec![b'x'; 100]);

    // The actor is gone once the socket is shut down.
    assert!(events.recv().await.is_none());
    assert!(handle.is_closed());
}

#[tokio::test]
async fn test_dropping_every_handle_flushes_pending() {
    let (server, client) = tokio::io::duplex(8);
    let (handle, _events) = WriteQueue::spawn(server);
    let reader = read_all(client);

    handle
        .enqueue(PendingWrite::new(Segment::Body, "still delivered"))
        .unwrap();
    drop(handle);

    let out = timeout(Duration::from_secs(1), reader).await.unwrap().unwrap();
    assert_eq!(out, b"still delivered");
}

#[tokio::test]
async fn test_write_failure_reports_and_closes_queue() {
    let (server, client) = tokio::io::duplex(8);
    drop(client);

    let (handle, mut events) = WriteQueue::spawn(server);
    handle
        .enqueue(PendingWrite::new(Segment::Header, "nobody listening"))
        .unwrap();

    let event = timeout(Duration::from_secs(1), events.recv()).await.unwrap();
    assert!(matches!(event, Some(QueueEvent::Failed(ServeError::Write(_)))));

    let again = handle.enqueue(PendingWrite::new(Segment::Chunk(0), "late"));
    assert!(matches!(again, Err(ServeError::QueueClosed)));
}

#[tokio::test]
async fn test_abort_drops_pending_writes() {
    let (server, client) = tokio::io::duplex(64);
    let writer = StallingWriter::new(server, 0, Duration::from_secs(60));
    let (handle, _events) = WriteQueue::spawn(writer);
    let reader = read_all(client);

    for i in 0..3 {
        handle
            .enqueue(PendingWrite::new(Segment::Chunk(i), "never sent"))
            .unwrap();
    }
    handle.abort();

    let out = timeout(Duration::from_secs(1), reader).await.unwrap().unwrap();
    assert!(out.is_empty());
}
