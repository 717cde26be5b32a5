//! Media track: a frame ring with async subscribers
//!
//! A [`MediaTrack`] owns the ring writer for one audio or video track. Any
//! number of [`TrackReader`]s follow it through [`TrackHandle::subscribe`].
//! Readers wait asynchronously on a [`Notify`] and never block a runtime
//! thread on a slot lock.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Notify;

use crate::error::{Error, Result};
use crate::media::{AvFrame, BufferPool};
use crate::ring::{DataFrame, ReaderState, RingReader, RingSlots, RingWriter};
use crate::stats::{TrackCounters, TrackStats};

use super::config::TrackConfig;

/// State shared between the producer and its subscribers
#[derive(Debug)]
struct TrackShared {
    name: String,
    notify: Notify,
    key_frame: RwLock<Option<Arc<DataFrame<AvFrame>>>>,
    counters: TrackCounters,
    pool: BufferPool,
}

impl TrackShared {
    /// Swap in a new cached key frame
    ///
    /// The lock is held only for the swap. The previous frame goes back to
    /// the pool unless a subscriber still holds it.
    fn store_key_frame(&self, frame: DataFrame<AvFrame>) {
        let previous = self.key_frame.write().replace(Arc::new(frame));
        if let Some(mut previous) = previous.and_then(|f| Arc::try_unwrap(f).ok()) {
            previous.reset();
        }
    }
}

/// Producer side of a track
pub struct MediaTrack {
    writer: RingWriter<AvFrame>,
    shared: Arc<TrackShared>,
    cache_key_frame: bool,
}

impl MediaTrack {
    /// Create a track and its ring
    pub fn new(config: TrackConfig) -> Result<Self> {
        let pool = BufferPool::with_limits(config.max_pooled_buffers, config.buffer_capacity);
        let writer = RingWriter::new(&config.ring, || AvFrame::new(pool.clone()))?;

        tracing::info!(
            track = %config.name,
            capacity = config.ring.capacity,
            policy = ?config.ring.write_policy,
            "Track created"
        );

        Ok(Self {
            writer,
            shared: Arc::new(TrackShared {
                name: config.name,
                notify: Notify::new(),
                key_frame: RwLock::new(None),
                counters: TrackCounters::new(),
                pool,
            }),
            cache_key_frame: config.cache_key_frame,
        })
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Pool the track's frames draw their buffers from
    pub fn pool(&self) -> &BufferPool {
        &self.shared.pool
    }

    /// Get a cloneable handle for subscribers
    pub fn handle(&self) -> TrackHandle {
        TrackHandle {
            ring: self.writer.ring().clone(),
            shared: self.shared.clone(),
        }
    }

    /// Fill the next frame and publish it to subscribers
    ///
    /// Key frames that reach the ring are also copied into the key frame
    /// cache. Returns `false` when the frame landed on a slot a lagging reader
    /// still held and was dropped.
    pub fn write<F>(&mut self, fill: F) -> bool
    where
        F: FnOnce(&mut DataFrame<AvFrame>),
    {
        let publishing = self.writer.is_normal();
        let frame = self.writer.frame_mut();
        fill(frame);

        let sequence = frame.sequence();
        let bytes = frame.bytes_in;
        let key_frame = frame.data.iframe;

        if key_frame && publishing && self.cache_key_frame {
            let mut copy = DataFrame::new(AvFrame::new(self.shared.pool.clone()));
            copy.assign(frame);
            self.shared.store_key_frame(copy);
        }

        let normal = self.writer.step();
        self.shared
            .counters
            .record_write(sequence, bytes, key_frame, normal);

        if !normal {
            tracing::warn!(
                track = %self.shared.name,
                sequence = sequence,
                subscribers = self.shared.counters.subscribers(),
                "Slot held by a lagging reader, frame discarded"
            );
        }

        self.shared.notify.notify_waiters();
        normal
    }

    /// Stop the track; subscribers drain what is published, then see `Closed`
    pub fn close(&mut self) {
        if self.writer.is_closed() {
            return;
        }
        self.writer.close();
        self.shared.notify.notify_waiters();

        let stats = self.shared.counters.snapshot(&self.shared.name);
        tracing::info!(
            track = %self.shared.name,
            frames = stats.frames_written,
            discarded = stats.frames_discarded,
            subscribers = stats.subscribers,
            "Track closed"
        );
    }

    pub fn stats(&self) -> TrackStats {
        self.shared.counters.snapshot(&self.shared.name)
    }
}

impl Drop for MediaTrack {
    fn drop(&mut self) {
        self.close();
    }
}

/// Consumer side of a track
#[derive(Clone)]
pub struct TrackHandle {
    ring: Arc<RingSlots<AvFrame>>,
    shared: Arc<TrackShared>,
}

impl TrackHandle {
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Subscribe starting from the next frame the producer publishes
    pub fn subscribe(&self) -> TrackReader {
        TrackReader::new(self.ring.clone(), self.shared.clone(), self.ring.current_index())
    }

    /// Subscribe starting from the last published frame
    ///
    /// Falls back to [`subscribe`](Self::subscribe) before the first publish.
    pub fn subscribe_latest(&self) -> TrackReader {
        let index = self
            .ring
            .latest()
            .unwrap_or_else(|| self.ring.current_index());
        TrackReader::new(self.ring.clone(), self.shared.clone(), index)
    }

    pub fn stats(&self) -> TrackStats {
        self.shared.counters.snapshot(&self.shared.name)
    }

    /// The cached key frame, if one was published
    pub fn key_frame(&self) -> Option<Arc<DataFrame<AvFrame>>> {
        self.shared.key_frame.read().clone()
    }

    /// Run `f` on the cached key frame, if one was published
    ///
    /// `f` runs after the cache lock is released.
    pub fn with_key_frame<R>(&self, f: impl FnOnce(&DataFrame<AvFrame>) -> R) -> Option<R> {
        self.key_frame().map(|frame| f(&frame))
    }

    /// Whether the producer has closed the track
    pub fn is_closed(&self) -> bool {
        self.ring.is_closed()
    }
}

/// A subscriber following a track
pub struct TrackReader {
    reader: RingReader<AvFrame>,
    shared: Arc<TrackShared>,
}

impl TrackReader {
    fn new(ring: Arc<RingSlots<AvFrame>>, shared: Arc<TrackShared>, index: u64) -> Self {
        let mut reader = RingReader::new(ring);
        reader.attach(index);

        let subscribers = shared.counters.add_subscriber();
        tracing::debug!(
            track = %shared.name,
            index = index,
            subscribers = subscribers,
            "Subscriber added"
        );

        Self { reader, shared }
    }

    /// Wait for the next frame
    ///
    /// Fails with [`Error::Discarded`] when the reader fell a lap behind
    /// (call [`resync`](Self::resync) to continue) or [`Error::Closed`] once
    /// every published frame has been read after the track closed.
    pub async fn recv(&mut self) -> Result<&DataFrame<AvFrame>> {
        loop {
            let notified = self.shared.notify.notified();
            tokio::pin!(notified);
            // Register before polling so a publish in between is not missed
            notified.as_mut().enable();

            if self.reader.poll_next()? {
                break;
            }
            notified.await;
        }
        self.reader.frame().ok_or(Error::Detached)
    }

    /// Take the next frame if it is already published
    pub fn try_recv(&mut self) -> Result<Option<&DataFrame<AvFrame>>> {
        self.reader.try_read()
    }

    /// Block the current thread until the next frame is published
    ///
    /// For consumers running on their own threads; never call this from an
    /// async task.
    pub fn recv_blocking(&mut self) -> Result<&DataFrame<AvFrame>> {
        self.reader.read_next()
    }

    /// Skip to the producer's current position after a discard
    pub fn resync(&mut self) {
        let from = self.reader.index();
        let to = self.reader.ring().current_index();
        self.reader.attach(to);
        self.shared.counters.record_resync();

        tracing::debug!(
            track = %self.shared.name,
            from = from,
            to = to,
            "Subscriber resynced"
        );
    }

    /// The frame currently held, if any
    pub fn frame(&self) -> Option<&DataFrame<AvFrame>> {
        self.reader.frame()
    }

    pub fn index(&self) -> u64 {
        self.reader.index()
    }

    /// Frames read so far
    pub fn count(&self) -> u64 {
        self.reader.count()
    }

    pub fn state(&self) -> ReaderState {
        self.reader.state()
    }
}

impl Drop for TrackReader {
    fn drop(&mut self) {
        self.reader.stop_read();
        let subscribers = self.shared.counters.remove_subscriber();
        tracing::debug!(
            track = %self.shared.name,
            subscribers = subscribers,
            "Subscriber removed"
        );
    }
}
