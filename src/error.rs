//! Error types
//!
//! Errors reported by the ring and the track layer. "No frame yet" is not an
//! error: polling reads return `Ok(None)` for it.

/// Error type for ring and track operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The requested slot was overwritten or flagged untrustworthy.
    ///
    /// Recoverable by reattaching at a fresher position.
    #[error("frame at index {index} was discarded")]
    Discarded { index: u64 },

    /// The writer went away and no further frames will be published
    #[error("ring writer closed")]
    Closed,

    /// A read was attempted on a reader that is not attached to a position
    #[error("reader is not attached")]
    Detached,

    /// A read targeted a position the writer has not reached yet
    #[error("index {index} is ahead of writer position {current}")]
    AheadOfWriter { index: u64, current: u64 },

    /// Ring capacity below the minimum of two slots
    #[error("ring capacity must be at least 2, got {0}")]
    InvalidCapacity(usize),
}

impl Error {
    /// Check if this is a discard (the reader fell a lap behind)
    pub fn is_discard(&self) -> bool {
        matches!(self, Error::Discarded { .. })
    }

    /// Check if the caller can continue by reattaching
    ///
    /// Precondition violations and a closed ring are not recoverable.
    pub fn is_recoverable(&self) -> bool {
        self.is_discard()
    }
}

/// Result alias for ring and track operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discard_is_recoverable() {
        let err = Error::Discarded { index: 7 };
        assert!(err.is_discard());
        assert!(err.is_recoverable());
        assert_eq!(err.to_string(), "frame at index 7 was discarded");
    }

    #[test]
    fn test_precondition_errors_are_distinct() {
        assert!(!Error::Detached.is_discard());
        assert!(!Error::Closed.is_recoverable());

        let err = Error::AheadOfWriter {
            index: 10,
            current: 4,
        };
        assert!(!err.is_recoverable());
        assert_eq!(err.to_string(), "index 10 is ahead of writer position 4");
    }
}
