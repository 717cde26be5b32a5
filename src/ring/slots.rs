//! The ring of slots shared by the writer and all readers

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crossbeam::utils::CachePadded;

use super::frame::{sequence_of, DataFrame};
use super::slot::FrameSlot;

/// Next logical index. Indices grow without bound; only slot lookup wraps.
#[inline]
pub fn next_index(index: u64) -> u64 {
    index.wrapping_add(1)
}

/// Fixed-size circular sequence of frame slots
///
/// The slot for logical index `i` is `i % capacity`, so the same memory is
/// revisited every `capacity` writes.
pub struct RingSlots<T> {
    slots: Box<[FrameSlot<T>]>,
    /// Index the writer is filling
    current: CachePadded<AtomicU64>,
    closed: AtomicBool,
}

impl<T> RingSlots<T> {
    pub(crate) fn new(capacity: usize, mut factory: impl FnMut() -> T) -> Self {
        let slots = (0..capacity)
            .map(|_| FrameSlot::new(factory()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            slots,
            current: CachePadded::new(AtomicU64::new(0)),
            closed: AtomicBool::new(false),
        }
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn slot_at(&self, index: u64) -> &FrameSlot<T> {
        &self.slots[(index % self.slots.len() as u64) as usize]
    }

    /// Logical index the writer is currently filling
    pub fn current_index(&self) -> u64 {
        self.current.load(Ordering::Acquire)
    }

    pub(crate) fn set_current_index(&self, index: u64) {
        self.current.store(index, Ordering::Release);
    }

    /// Index of the most recently published frame, if any.
    ///
    /// The frame may still be in the middle of being released; a blocking
    /// read on it waits at most for the writer's current step to finish.
    pub fn latest(&self) -> Option<u64> {
        self.current_index().checked_sub(1)
    }

    /// Whether the slot at `index` has since been reused by the writer
    pub fn is_stale(&self, index: u64) -> bool {
        self.current_index().saturating_sub(index) >= self.slots.len() as u64
    }

    /// Whether the slot holding `index` is flagged as discarded
    pub fn is_discarded(&self, index: u64) -> bool {
        self.slot_at(index).is_discarded()
    }

    /// Whether the writer has been closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn mark_closed(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Check that a slot entered for `index` really holds that frame
    ///
    /// # Safety
    ///
    /// The caller must hold a lock on the slot for `index`.
    pub(crate) unsafe fn holds(&self, index: u64) -> bool {
        let slot = self.slot_at(index);
        !slot.is_discarded() && slot.frame().sequence == sequence_of(index)
    }

    /// # Safety
    ///
    /// The caller must hold a lock on the slot for `index` for the lifetime
    /// of the returned reference.
    pub(crate) unsafe fn frame_at(&self, index: u64) -> &DataFrame<T> {
        self.slot_at(index).frame()
    }
}
