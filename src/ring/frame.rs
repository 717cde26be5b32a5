//! Frame data stored in each ring slot
//!
//! A [`DataFrame`] pairs producer metadata (sequence, write time, metrics)
//! with a payload. The payload only needs to know how to clear itself so the
//! slot can be refilled on the next lap without reallocating.

use std::time::Instant;

/// Payload that can be cleared in place for reuse
pub trait Reusable: Send + Sync {
    /// Drop the content but keep (or hand back) the storage
    fn reset(&mut self);
}

impl<T: Send + Sync> Reusable for Vec<T> {
    fn reset(&mut self) {
        self.clear();
    }
}

impl<T: Send + Sync> Reusable for Option<T> {
    fn reset(&mut self) {
        *self = None;
    }
}

impl Reusable for String {
    fn reset(&mut self) {
        self.clear();
    }
}

/// A frame as seen by readers
#[derive(Debug, Clone, Default)]
pub struct DataFrame<T> {
    /// Position in the stream, starting at 1 and increasing by 1 per frame
    pub sequence: u64,
    /// When the frame became readable
    pub write_time: Option<Instant>,
    /// Milliseconds since the previous frame
    pub delta_time: u32,
    /// Input bytes, for bitrate accounting
    pub bytes_in: usize,
    /// Payload
    pub data: T,
}

impl<T> DataFrame<T> {
    /// Create an empty frame around a payload
    pub fn new(data: T) -> Self {
        Self {
            sequence: 0,
            write_time: None,
            delta_time: 0,
            bytes_in: 0,
            data,
        }
    }

    /// Sequence number of this frame
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Set the sequence number
    pub fn set_sequence(&mut self, sequence: u64) {
        self.sequence = sequence;
    }

    /// Zero the producer metrics, leaving the payload alone
    pub(crate) fn reset_metrics(&mut self) {
        self.write_time = None;
        self.delta_time = 0;
        self.bytes_in = 0;
    }
}

impl<T: Reusable> DataFrame<T> {
    /// Clear metrics and payload. The sequence survives until reassigned.
    pub fn reset(&mut self) {
        self.reset_metrics();
        self.data.reset();
    }
}

/// Sequence carried by the frame at a logical ring index
#[inline]
pub(crate) fn sequence_of(index: u64) -> u64 {
    index.wrapping_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_keeps_sequence() {
        let mut frame = DataFrame::new(vec![1u8, 2, 3]);
        frame.set_sequence(42);
        frame.bytes_in = 3;
        frame.delta_time = 40;
        frame.write_time = Some(Instant::now());

        frame.reset();

        assert_eq!(frame.sequence(), 42);
        assert_eq!(frame.bytes_in, 0);
        assert_eq!(frame.delta_time, 0);
        assert!(frame.write_time.is_none());
        assert!(frame.data.is_empty());
    }

    #[test]
    fn test_reset_keeps_capacity() {
        let mut frame = DataFrame::new(Vec::<u64>::with_capacity(128));
        frame.data.extend(0..100);

        frame.reset();

        assert!(frame.data.is_empty());
        assert!(frame.data.capacity() >= 128);
    }

    #[test]
    fn test_option_payload() {
        let mut frame = DataFrame::new(Some(5u32));
        frame.reset();
        assert!(frame.data.is_none());
    }

    #[test]
    fn test_sequence_of_index() {
        assert_eq!(sequence_of(0), 1);
        assert_eq!(sequence_of(3), 4);
    }
}
