//! Per-slot synchronization
//!
//! Each slot owns one reader-writer lock for its whole life. The lock guards
//! whatever frame currently occupies the slot, not a particular sequence, so
//! staleness is checked separately: by the discard flag and by comparing the
//! frame's sequence against the index the reader expected.
//!
//! The lock is held across calls (a reader keeps its slot locked between
//! reads), so this uses the raw `parking_lot` lock rather than guards.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::lock_api::{self, RawRwLock as _, RawRwLockTimed as _};
use parking_lot::RawRwLock;

use super::frame::DataFrame;

/// One reusable ring position: lock, discard marker and frame
pub struct FrameSlot<T> {
    lock: RawRwLock,
    discarded: AtomicBool,
    frame: UnsafeCell<DataFrame<T>>,
}

// SAFETY: the frame is mutated only while the exclusive lock is held and read
// only while a shared lock is held.
unsafe impl<T: Send + Sync> Sync for FrameSlot<T> {}

impl<T> FrameSlot<T> {
    pub(crate) fn new(data: T) -> Self {
        Self {
            lock: <RawRwLock as lock_api::RawRwLock>::INIT,
            discarded: AtomicBool::new(false),
            frame: UnsafeCell::new(DataFrame::new(data)),
        }
    }

    /// Block until no writer holds the slot, then take a shared hold
    pub(crate) fn enter_shared(&self) {
        self.lock.lock_shared();
    }

    pub(crate) fn try_enter_shared(&self) -> bool {
        self.lock.try_lock_shared()
    }

    /// # Safety
    ///
    /// The caller must own a shared hold taken with `enter_shared` or
    /// `try_enter_shared`.
    pub(crate) unsafe fn leave_shared(&self) {
        self.lock.unlock_shared();
    }

    pub(crate) fn try_enter_exclusive(&self) -> bool {
        self.lock.try_lock_exclusive()
    }

    pub(crate) fn try_enter_exclusive_for(&self, timeout: Duration) -> bool {
        self.lock.try_lock_exclusive_for(timeout)
    }

    /// Stamp the write time and hand the slot to readers
    ///
    /// # Safety
    ///
    /// The caller must hold the exclusive lock.
    pub(crate) unsafe fn publish(&self) {
        (*self.frame.get()).write_time = Some(Instant::now());
        self.lock.unlock_exclusive();
    }

    /// Release the exclusive lock without publishing
    ///
    /// # Safety
    ///
    /// The caller must hold the exclusive lock.
    pub(crate) unsafe fn leave_exclusive(&self) {
        self.lock.unlock_exclusive();
    }

    /// Whether the slot's content must not be trusted
    pub fn is_discarded(&self) -> bool {
        self.discarded.load(Ordering::Acquire)
    }

    pub(crate) fn mark_discarded(&self) {
        self.discarded.store(true, Ordering::Release);
    }

    pub(crate) fn clear_discarded(&self) {
        self.discarded.store(false, Ordering::Release);
    }

    /// # Safety
    ///
    /// The caller must hold a shared or the exclusive lock for the lifetime
    /// of the returned reference.
    pub(crate) unsafe fn frame(&self) -> &DataFrame<T> {
        &*self.frame.get()
    }

    /// # Safety
    ///
    /// The caller must hold the exclusive lock for the lifetime of the
    /// returned reference.
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn frame_mut(&self) -> &mut DataFrame<T> {
        &mut *self.frame.get()
    }
}
