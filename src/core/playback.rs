//! Per-session playback sequencing.
//!
//! Agent audio arrives from the upstream model in bursts of small chunks. The
//! [`PlaybackQueue`] hands them to a [`PlaybackSink`] one at a time, strictly in
//! enqueue order. A single worker task owns the consumer side, so two entries are
//! never played concurrently no matter how many producers enqueue.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Errors raised by the playback queue or a sink.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The queue was discarded before the entry could be accepted
    #[error("Playback queue discarded")]
    Discarded,

    /// The sink could not play an entry
    #[error("Playback failed: {0}")]
    Failed(String),

    /// The playback destination has gone away
    #[error("Playback destination closed")]
    DestinationClosed,
}

/// One buffered chunk of agent audio.
#[derive(Debug, Clone)]
pub struct PlaybackEntry {
    /// Position in enqueue order, starting at 0
    pub sequence: u64,
    /// Raw audio payload in the session's output format
    pub data: Bytes,
}

/// Destination that plays one entry at a time.
///
/// `play` returns once the destination has accepted the entry; the queue does not
/// start the next entry before that.
#[async_trait]
pub trait PlaybackSink: Send + Sync + 'static {
    async fn play(&self, entry: &PlaybackEntry) -> Result<(), PlaybackError>;
}

/// FIFO of agent audio bound to one playback destination.
///
/// A queue is never reused: when the destination is superseded, discard this
/// queue and create a new one.
pub struct PlaybackQueue {
    /// Sender and next sequence number, locked together so sequence order is
    /// channel order
    tx: Mutex<(mpsc::UnboundedSender<PlaybackEntry>, u64)>,
    pending: Arc<AtomicUsize>,
    idle: Arc<Notify>,
    worker: JoinHandle<()>,
}

impl PlaybackQueue {
    /// Create a queue and spawn its worker. Must be called inside a tokio runtime.
    pub fn new<S: PlaybackSink>(sink: S) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));
        let idle = Arc::new(Notify::new());

        let worker = tokio::spawn(Self::drain(
            Arc::new(sink),
            rx,
            pending.clone(),
            idle.clone(),
        ));

        Self {
            tx: Mutex::new((tx, 0)),
            pending,
            idle,
            worker,
        }
    }

    async fn drain(
        sink: Arc<dyn PlaybackSink>,
        mut rx: mpsc::UnboundedReceiver<PlaybackEntry>,
        pending: Arc<AtomicUsize>,
        idle: Arc<Notify>,
    ) {
        while let Some(entry) = rx.recv().await {
            if let Err(e) = sink.play(&entry).await {
                warn!(sequence = entry.sequence, error = %e, "Skipping playback entry");
            }
            if pending.fetch_sub(1, Ordering::AcqRel) == 1 {
                idle.notify_waiters();
            }
        }
        debug!("Playback worker stopped");
    }

    /// Append a chunk and return its sequence number.
    ///
    /// If nothing is playing, the worker starts on it immediately.
    pub fn enqueue(&self, data: Bytes) -> Result<u64, PlaybackError> {
        if self.worker.is_finished() {
            return Err(PlaybackError::Discarded);
        }

        let mut guard = self.tx.lock();
        let (tx, next) = &mut *guard;
        let sequence = *next;
        self.pending.fetch_add(1, Ordering::AcqRel);

        if tx.send(PlaybackEntry { sequence, data }).is_err() {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            return Err(PlaybackError::Discarded);
        }
        *next += 1;
        Ok(sequence)
    }

    /// Nothing playing and nothing buffered.
    pub fn is_idle(&self) -> bool {
        self.pending.load(Ordering::Acquire) == 0
    }

    /// Number of entries buffered or playing.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Wait until the queue drains.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_idle() || self.worker.is_finished() {
                return;
            }
            notified.await;
        }
    }

    /// Stop playback and drop anything still buffered.
    pub fn discard(self) {
        // Drop does the work
    }
}

impl Drop for PlaybackQueue {
    fn drop(&mut self) {
        self.worker.abort();
        if self.pending.swap(0, Ordering::AcqRel) > 0 {
            self.idle.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// Records play intervals so overlap can be detected.
    #[derive(Clone, Default)]
    struct RecordingSink {
        played: Arc<Mutex<Vec<u64>>>,
        active: Arc<AtomicUsize>,
        max_active: Arc<AtomicUsize>,
        fail_on: Option<u64>,
        delay: Duration,
    }

    #[async_trait]
    impl PlaybackSink for RecordingSink {
        async fn play(&self, entry: &PlaybackEntry) -> Result<(), PlaybackError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            if Some(entry.sequence) == self.fail_on {
                return Err(PlaybackError::Failed("device rejected chunk".into()));
            }
            self.played.lock().push(entry.sequence);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_plays_in_enqueue_order() {
        let sink = RecordingSink {
            delay: Duration::from_millis(2),
            ..Default::default()
        };
        let played = sink.played.clone();
        let queue = PlaybackQueue::new(sink);

        for i in 0..10u8 {
            let seq = queue.enqueue(Bytes::from(vec![i; 4])).unwrap();
            assert_eq!(seq, i as u64);
        }
        queue.wait_idle().await;

        assert_eq!(*played.lock(), (0..10).collect::<Vec<_>>());
        assert!(queue.is_idle());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_enqueue_never_overlaps() {
        let sink = RecordingSink {
            delay: Duration::from_millis(1),
            ..Default::default()
        };
        let played = sink.played.clone();
        let max_active = sink.max_active.clone();
        let queue = Arc::new(PlaybackQueue::new(sink));

        let mut producers = Vec::new();
        for _ in 0..4 {
            let queue = queue.clone();
            producers.push(tokio::spawn(async move {
                for _ in 0..10 {
                    queue.enqueue(Bytes::from_static(&[0, 0])).unwrap();
                    tokio::task::yield_now().await;
                }
            }));
        }
        for p in producers {
            p.await.unwrap();
        }
        queue.wait_idle().await;

        assert_eq!(max_active.load(Ordering::SeqCst), 1);
        let played = played.lock().clone();
        assert_eq!(played.len(), 40);
        assert!(played.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_failed_entry_is_skipped() {
        let sink = RecordingSink {
            fail_on: Some(1),
            ..Default::default()
        };
        let played = sink.played.clone();
        let queue = PlaybackQueue::new(sink);

        for _ in 0..3 {
            queue.enqueue(Bytes::from_static(&[1, 2])).unwrap();
        }
        queue.wait_idle().await;

        assert_eq!(*played.lock(), vec![0, 2]);
    }

    #[tokio::test]
    async fn test_discard_drops_buffered_audio() {
        let sink = RecordingSink {
            delay: Duration::from_millis(50),
            ..Default::default()
        };
        let played = sink.played.clone();
        let queue = PlaybackQueue::new(sink);

        for _ in 0..5 {
            queue.enqueue(Bytes::from_static(&[0, 0])).unwrap();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.discard();
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert!(played.lock().len() <= 1);
    }

    #[tokio::test]
    async fn test_empty_queue_is_idle() {
        let queue = PlaybackQueue::new(RecordingSink::default());
        assert!(queue.is_idle());
        assert_eq!(queue.pending(), 0);
        queue.wait_idle().await;
    }
}
