//! Consumer cursor
//!
//! A reader keeps a shared lock on the slot of the frame it last read. While
//! it holds that lock the writer cannot reuse the slot; if the writer laps
//! around to it anyway the slot is flagged as discarded and the reader gets
//! [`Error::Discarded`] on its next read. Readers never coordinate with each
//! other.
//!
//! # States
//!
//! ```text
//!   Detached ──attach──► Attached ──try_read──► Holding ◄─┐
//!      ▲                    │                    │  │      │ try_read / read_next
//!      │                    └─────start_read─────┘  └──────┘
//!      │                                            │
//!      └──────stop_read──── Lapped ◄──── discard ───┘
//! ```

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::utils::Backoff;

use crate::error::{Error, Result};

use super::frame::DataFrame;
use super::slots::{next_index, RingSlots};

/// Sleep between checks once spinning on a writer that is filling its spare
const SPARE_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Reader lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// Not positioned
    Detached,
    /// Positioned at an index, nothing locked yet
    Attached,
    /// Holding a shared lock on the frame at the current index
    Holding,
    /// Fell behind; must reattach
    Lapped,
}

/// Consumer cursor into a ring
pub struct RingReader<T> {
    ring: Arc<RingSlots<T>>,
    index: u64,
    state: ReaderState,
    /// Frames read so far
    count: u64,
}

impl<T> RingReader<T> {
    /// Create a detached reader
    pub fn new(ring: Arc<RingSlots<T>>) -> Self {
        Self {
            ring,
            index: 0,
            state: ReaderState::Detached,
            count: 0,
        }
    }

    /// The ring being read
    pub fn ring(&self) -> &Arc<RingSlots<T>> {
        &self.ring
    }

    /// Current state
    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// Logical index the reader is positioned at
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Number of frames read
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Position the reader at `index` without locking anything
    ///
    /// The next [`try_read`](Self::try_read) returns the frame at `index`
    /// once it is published.
    pub fn attach(&mut self, index: u64) {
        self.release();
        self.index = index;
        self.state = ReaderState::Attached;
    }

    /// Block until the frame at `index` is published and hold it
    ///
    /// Fails with [`Error::Discarded`] if the slot is already stale, or
    /// [`Error::AheadOfWriter`] if the writer has not reached `index`.
    /// If the writer is filling its spare at `index`, this waits for it to
    /// move on and then reports the frame as discarded.
    ///
    /// Must not be called from the thread that drives the writer when
    /// `index` is the writer's current index: it would wait forever.
    pub fn start_read(&mut self, index: u64) -> Result<&DataFrame<T>> {
        self.release();
        self.index = index;

        let current = self.ring.current_index();
        if index > current {
            self.state = ReaderState::Detached;
            return Err(Error::AheadOfWriter { index, current });
        }

        let slot = self.ring.slot_at(index);
        if index == current && slot.is_discarded() && !self.ring.is_closed() {
            // The writer is filling its spare: nothing to lock until it moves on
            self.wait_past(index);
        }
        if slot.is_discarded() || self.ring.is_stale(index) {
            self.state = ReaderState::Lapped;
            return Err(self.stale_error());
        }

        slot.enter_shared();
        self.state = ReaderState::Holding;
        self.verify()?;

        self.count += 1;
        Ok(self.held_frame())
    }

    /// Block until the reader's next frame is published and hold it
    pub fn read_next(&mut self) -> Result<&DataFrame<T>> {
        match self.state {
            ReaderState::Detached => Err(Error::Detached),
            ReaderState::Lapped => Err(self.stale_error()),
            ReaderState::Attached => self.start_read(self.index),
            ReaderState::Holding => self.start_read(next_index(self.index)),
        }
    }

    /// Poll for the next frame without blocking
    ///
    /// Returns `Ok(None)` when the writer has not published it yet. The
    /// previously read frame stays locked until a newer one is available, so
    /// nothing is skipped.
    pub fn try_read(&mut self) -> Result<Option<&DataFrame<T>>> {
        if self.poll_next()? {
            Ok(Some(self.held_frame()))
        } else {
            Ok(None)
        }
    }

    /// Advance to the next frame if it is available
    ///
    /// Same protocol as [`try_read`](Self::try_read) without borrowing the
    /// frame; fetch it with [`frame`](Self::frame).
    pub fn poll_next(&mut self) -> Result<bool> {
        match self.state {
            ReaderState::Detached => Err(Error::Detached),
            ReaderState::Lapped => Err(self.stale_error()),
            ReaderState::Attached => {
                if self.not_published(self.index) {
                    return Ok(false);
                }
                if self.ring.is_stale(self.index) {
                    self.state = ReaderState::Lapped;
                    return Err(self.stale_error());
                }
                if !self.ring.slot_at(self.index).try_enter_shared() {
                    return Ok(false);
                }
                self.state = ReaderState::Holding;
                self.verify()?;
                self.count += 1;
                Ok(true)
            }
            ReaderState::Holding => {
                let held = self.ring.slot_at(self.index);
                if held.is_discarded() {
                    self.lapped();
                    return Err(self.stale_error());
                }

                let next = next_index(self.index);
                if self.not_published(next) {
                    return Ok(false);
                }
                if !self.ring.slot_at(next).try_enter_shared() {
                    return Ok(false);
                }
                // SAFETY: Holding means we own a shared lock on `held`
                unsafe { held.leave_shared() };

                self.index = next;
                self.verify()?;
                self.count += 1;
                Ok(true)
            }
        }
    }

    /// The frame currently held, if any
    pub fn frame(&self) -> Option<&DataFrame<T>> {
        match self.state {
            ReaderState::Holding => Some(self.held_frame()),
            _ => None,
        }
    }

    /// Release any held frame and detach
    ///
    /// Safe to call in any state, any number of times.
    pub fn stop_read(&mut self) {
        self.release();
        self.state = ReaderState::Detached;
    }

    /// Check the frame just entered; on failure release it and go Lapped
    fn verify(&mut self) -> Result<()> {
        // SAFETY: called right after taking a shared lock on `index`
        if unsafe { self.ring.holds(self.index) } {
            Ok(())
        } else {
            self.lapped();
            Err(self.stale_error())
        }
    }

    /// Whether `index` is at or past the writer's in-progress position
    ///
    /// Once the ring is closed the in-progress slot is readable and reports
    /// [`Error::Closed`].
    fn not_published(&self, index: u64) -> bool {
        index >= self.ring.current_index() && !self.ring.is_closed()
    }

    /// Wait until the writer moves past `index` or closes
    fn wait_past(&self, index: u64) {
        let backoff = Backoff::new();
        while self.ring.current_index() <= index && !self.ring.is_closed() {
            if backoff.is_completed() {
                thread::sleep(SPARE_POLL_INTERVAL);
            } else {
                backoff.snooze();
            }
        }
    }

    fn lapped(&mut self) {
        self.release();
        self.state = ReaderState::Lapped;
    }

    fn release(&mut self) {
        if self.state == ReaderState::Holding {
            // SAFETY: Holding means we own a shared lock on this slot
            unsafe { self.ring.slot_at(self.index).leave_shared() };
            self.state = ReaderState::Attached;
        }
    }

    fn held_frame(&self) -> &DataFrame<T> {
        debug_assert_eq!(self.state, ReaderState::Holding);
        // SAFETY: only called while Holding; the lock lives until `release`,
        // which needs `&mut self`.
        unsafe { self.ring.frame_at(self.index) }
    }

    /// The writer's final, never published slot reads as closed
    fn stale_error(&self) -> Error {
        if self.ring.is_closed() && self.index >= self.ring.current_index() {
            Error::Closed
        } else {
            Error::Discarded { index: self.index }
        }
    }
}

impl<T> Drop for RingReader<T> {
    fn drop(&mut self) {
        self.stop_read();
    }
}
