//! The single producer side of the ring
//!
//! The writer always holds the exclusive lock on the slot it is filling, so
//! readers that reach the writer's position wait (or poll "not ready") until
//! the frame is published. On every step the writer takes the *next* slot
//! before releasing the current one; a reader that sees frame `i` therefore
//! never finds slot `i + 1` unguarded.

use std::sync::Arc;

use crate::error::Result;

use super::config::{RingConfig, WritePolicy};
use super::frame::{sequence_of, DataFrame, Reusable};
use super::reader::RingReader;
use super::slots::{next_index, RingSlots};

/// Producer cursor
///
/// There is exactly one writer per ring. It is not `Clone`; share the ring
/// with readers through [`RingWriter::reader`] or [`RingWriter::ring`].
pub struct RingWriter<T: Reusable> {
    ring: Arc<RingSlots<T>>,
    /// Logical index being filled
    index: u64,
    /// Whether the exclusive lock on `index` is held
    held: bool,
    closed: bool,
    /// Scratch frame filled when the slot is still held by a lagging reader
    spare: DataFrame<T>,
    policy: WritePolicy,
}

impl<T: Reusable> RingWriter<T> {
    /// Create a ring and its writer
    ///
    /// `factory` is called once per slot, plus once for the writer's spare
    /// frame.
    pub fn new(config: &RingConfig, mut factory: impl FnMut() -> T) -> Result<Self> {
        config.validate()?;

        let ring = Arc::new(RingSlots::new(config.capacity, &mut factory));
        let mut writer = Self {
            ring,
            index: 0,
            held: false,
            closed: false,
            spare: DataFrame::new(factory()),
            policy: config.write_policy,
        };

        writer.held = writer.acquire(0);
        if !writer.held {
            writer.prepare_spare(0);
        }

        Ok(writer)
    }

    /// The shared ring
    pub fn ring(&self) -> &Arc<RingSlots<T>> {
        &self.ring
    }

    /// Create a detached reader on this ring
    pub fn reader(&self) -> RingReader<T> {
        RingReader::new(Arc::clone(&self.ring))
    }

    /// Logical index currently being filled
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Whether the frame being filled will reach readers
    pub fn is_normal(&self) -> bool {
        self.held
    }

    /// Whether [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The frame being filled
    pub fn frame_mut(&mut self) -> &mut DataFrame<T> {
        if self.held {
            // SAFETY: the exclusive lock on this slot is held until `step` or
            // `close`, both of which need `&mut self`.
            unsafe { self.ring.slot_at(self.index).frame_mut() }
        } else {
            &mut self.spare
        }
    }

    /// Fill the current frame and publish it
    ///
    /// Returns `false` if the frame was filled into a discarded slot and
    /// never reached readers.
    pub fn write<F>(&mut self, fill: F) -> bool
    where
        F: FnOnce(&mut DataFrame<T>),
    {
        fill(self.frame_mut());
        self.step()
    }

    /// Publish the current frame and move to the next slot
    ///
    /// Never blocks under [`WritePolicy::Discard`]. Returns `false` when the
    /// slot just written had been forcibly discarded.
    pub fn step(&mut self) -> bool {
        if self.closed {
            self.spare.reset();
            return false;
        }

        let normal = self.held;
        let next = next_index(self.index);
        let next_held = self.acquire(next);

        self.ring.set_current_index(next);
        if normal {
            // SAFETY: acquired by the previous step (or `new`) and not yet released
            unsafe { self.ring.slot_at(self.index).publish() };
        }

        self.index = next;
        self.held = next_held;
        if !next_held {
            self.prepare_spare(next);
        }

        normal
    }

    /// Stop publishing
    ///
    /// The in-progress slot is flagged and released so readers waiting on it
    /// wake up and observe the ring as closed. Called on drop.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.ring.mark_closed();

        let slot = self.ring.slot_at(self.index);
        slot.mark_discarded();
        if self.held {
            // SAFETY: held since the last step
            unsafe { slot.leave_exclusive() };
            self.held = false;
        }
    }

    /// Take the slot for `index`, or flag it when a reader still holds it
    fn acquire(&self, index: u64) -> bool {
        let slot = self.ring.slot_at(index);
        let acquired = match self.policy {
            WritePolicy::Discard => slot.try_enter_exclusive(),
            WritePolicy::WaitFor(timeout) => slot.try_enter_exclusive_for(timeout),
        };

        if acquired {
            slot.clear_discarded();
            // SAFETY: exclusive lock taken above
            let frame = unsafe { slot.frame_mut() };
            frame.reset();
            frame.set_sequence(sequence_of(index));
        } else {
            slot.mark_discarded();
        }

        acquired
    }

    fn prepare_spare(&mut self, index: u64) {
        self.spare.reset();
        self.spare.set_sequence(sequence_of(index));
    }
}

impl<T: Reusable> Drop for RingWriter<T> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::{Duration, Instant};

    use super::*;
    use crate::error::Error;

    fn writer(capacity: usize) -> RingWriter<Vec<u64>> {
        RingWriter::new(&RingConfig::new(capacity), Vec::new).unwrap()
    }

    #[test]
    fn test_rejects_small_capacity() {
        let result = RingWriter::new(&RingConfig::new(1), Vec::<u8>::new);
        assert!(matches!(result, Err(Error::InvalidCapacity(1))));
    }

    #[test]
    fn test_sequence_follows_index() {
        let mut w = writer(4);

        for expected in 1..=10u64 {
            assert_eq!(w.frame_mut().sequence(), expected);
            assert!(w.write(|frame| frame.data.push(expected)));
        }

        assert_eq!(w.index(), 10);
        assert_eq!(w.ring().current_index(), 10);
        assert_eq!(w.ring().latest(), Some(9));
    }

    #[test]
    fn test_slot_reset_on_reuse() {
        let mut w = writer(2);
        w.write(|frame| {
            frame.bytes_in = 100;
            frame.data.extend([1, 2, 3]);
        });
        w.write(|_| {});

        // back on slot 0, lap 2
        let frame = w.frame_mut();
        assert_eq!(frame.sequence(), 3);
        assert_eq!(frame.bytes_in, 0);
        assert!(frame.data.is_empty());
    }

    #[test]
    fn test_contended_slot_is_discarded() {
        let mut w = writer(3);
        let mut reader = w.reader();

        assert!(w.write(|frame| frame.data.push(1)));
        reader.start_read(0).unwrap();

        assert!(w.write(|_| {}));
        // next slot is slot 0, still held by the reader
        assert!(w.write(|_| {}));
        assert!(!w.is_normal());
        assert!(w.ring().is_discarded(3));

        // the frame lands in the spare and does not reach readers
        assert!(!w.write(|frame| frame.data.push(4)));
        assert!(w.is_normal());

        reader.stop_read();
    }

    #[test]
    fn test_never_blocks_on_stalled_reader() {
        let mut w = writer(4);
        let mut reader = w.reader();
        w.write(|_| {});
        reader.start_read(0).unwrap();

        let started = Instant::now();
        let mut abnormal = 0;
        for _ in 0..1_000 {
            if !w.write(|frame| frame.data.push(0)) {
                abnormal += 1;
            }
        }

        assert!(started.elapsed() < Duration::from_secs(1));
        // slot 0 comes up once every lap
        assert_eq!(abnormal, 250);
        drop(reader);
    }

    #[test]
    fn test_wait_policy_gives_up() {
        let config = RingConfig::new(2).wait_for_readers(Duration::from_millis(10));
        let mut w = RingWriter::new(&config, Vec::<u8>::new).unwrap();
        let mut reader = w.reader();

        w.write(|_| {});
        reader.start_read(0).unwrap();

        let started = Instant::now();
        assert!(w.write(|_| {}));
        assert!(started.elapsed() >= Duration::from_millis(10));
        assert!(!w.is_normal());
    }

    #[test]
    fn test_wait_policy_takes_released_slot() {
        let config = RingConfig::new(2).wait_for_readers(Duration::from_millis(500));
        let mut w = RingWriter::new(&config, Vec::<u8>::new).unwrap();
        let mut reader = w.reader();

        w.write(|frame| frame.data.push(1));
        reader.start_read(0).unwrap();

        thread::scope(|s| {
            s.spawn(move || {
                thread::sleep(Duration::from_millis(20));
                reader.stop_read();
            });

            // slot 0 is needed next; the reader lets go within the timeout
            assert!(w.write(|frame| frame.data.push(2)));
        });

        assert!(w.is_normal());
        assert!(!w.ring().is_discarded(2));
        assert!(w.write(|frame| frame.data.push(3)));
        assert_eq!(w.frame_mut().sequence(), 4);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut w = writer(2);
        w.write(|_| {});

        w.close();
        w.close();

        assert!(w.is_closed());
        assert!(w.ring().is_closed());
        assert!(!w.write(|frame| frame.data.push(1)));
        assert_eq!(w.ring().current_index(), 1);
    }
}
