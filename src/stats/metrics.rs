//! Statistics for media tracks

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Live counters updated by the producer and by readers
#[derive(Debug)]
pub struct TrackCounters {
    started_at: Instant,
    frames_written: AtomicU64,
    frames_discarded: AtomicU64,
    bytes_in: AtomicU64,
    key_frames: AtomicU64,
    last_sequence: AtomicU64,
    subscribers: AtomicU32,
    resyncs: AtomicU64,
}

impl TrackCounters {
    /// Create zeroed counters starting now
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            frames_written: AtomicU64::new(0),
            frames_discarded: AtomicU64::new(0),
            bytes_in: AtomicU64::new(0),
            key_frames: AtomicU64::new(0),
            last_sequence: AtomicU64::new(0),
            subscribers: AtomicU32::new(0),
            resyncs: AtomicU64::new(0),
        }
    }

    /// Account for one producer write
    pub fn record_write(&self, sequence: u64, bytes: usize, key_frame: bool, normal: bool) {
        self.frames_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_in.fetch_add(bytes as u64, Ordering::Relaxed);
        self.last_sequence.store(sequence, Ordering::Relaxed);
        if key_frame {
            self.key_frames.fetch_add(1, Ordering::Relaxed);
        }
        if !normal {
            self.frames_discarded.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn add_subscriber(&self) -> u32 {
        self.subscribers.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn remove_subscriber(&self) -> u32 {
        self.subscribers.fetch_sub(1, Ordering::Relaxed).saturating_sub(1)
    }

    /// Number of attached readers
    pub fn subscribers(&self) -> u32 {
        self.subscribers.load(Ordering::Relaxed)
    }

    /// Account for a reader that skipped ahead after a discard
    pub fn record_resync(&self) {
        self.resyncs.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the counters into a snapshot
    pub fn snapshot(&self, name: &str) -> TrackStats {
        TrackStats {
            name: name.to_string(),
            started_at: self.started_at,
            frames_written: self.frames_written.load(Ordering::Relaxed),
            frames_discarded: self.frames_discarded.load(Ordering::Relaxed),
            bytes_in: self.bytes_in.load(Ordering::Relaxed),
            key_frames: self.key_frames.load(Ordering::Relaxed),
            last_sequence: self.last_sequence.load(Ordering::Relaxed),
            subscribers: self.subscribers(),
            resyncs: self.resyncs.load(Ordering::Relaxed),
        }
    }
}

impl Default for TrackCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Track-level statistics
#[derive(Debug, Clone)]
pub struct TrackStats {
    /// Track name
    pub name: String,
    /// When the track was created
    pub started_at: Instant,
    /// Frames written by the producer
    pub frames_written: u64,
    /// Writes that landed on a slot still held by a lagging reader
    pub frames_discarded: u64,
    /// Total input bytes
    pub bytes_in: u64,
    /// Key frames written
    pub key_frames: u64,
    /// Sequence of the last frame written
    pub last_sequence: u64,
    /// Attached readers
    pub subscribers: u32,
    /// Reader reattachments after a discard
    pub resyncs: u64,
}

impl TrackStats {
    /// Get duration since the track started
    pub fn duration(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Calculate bitrate in bits per second
    pub fn bitrate(&self) -> u64 {
        let secs = self.duration().as_secs();
        if secs > 0 {
            (self.bytes_in * 8) / secs
        } else {
            0
        }
    }

    /// Calculate frames per second
    pub fn framerate(&self) -> f64 {
        let secs = self.duration().as_secs_f64();
        if secs > 0.0 {
            self.frames_written as f64 / secs
        } else {
            0.0
        }
    }

    /// Share of writes that never reached readers
    pub fn discard_ratio(&self) -> f64 {
        if self.frames_written == 0 {
            0.0
        } else {
            self.frames_discarded as f64 / self.frames_written as f64
        }
    }
}
