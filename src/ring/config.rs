//! Ring configuration

use std::time::Duration;

use crate::error::{Error, Result};

/// Default number of slots in a ring
pub const DEFAULT_CAPACITY: usize = 64;

/// Minimum capacity: the writer always occupies one slot
pub const MIN_CAPACITY: usize = 2;

/// What the writer does when a reader still holds the slot it wants to reuse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    /// Never block: mark the slot discarded and move on
    #[default]
    Discard,
    /// Wait up to the given duration for readers to leave, then discard
    WaitFor(Duration),
}

/// Ring configuration options
#[derive(Debug, Clone)]
pub struct RingConfig {
    /// Number of slots.
    ///
    /// Trades the producer/consumer skew tolerated before discard against
    /// memory footprint.
    pub capacity: usize,

    /// Behaviour on a contended slot
    pub write_policy: WritePolicy,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            write_policy: WritePolicy::Discard,
        }
    }
}

impl RingConfig {
    /// Create a new config with the given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    /// Set the capacity
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the write policy
    pub fn write_policy(mut self, policy: WritePolicy) -> Self {
        self.write_policy = policy;
        self
    }

    /// Let the writer wait up to `timeout` for lagging readers
    pub fn wait_for_readers(self, timeout: Duration) -> Self {
        self.write_policy(WritePolicy::WaitFor(timeout))
    }

    /// Check the configuration before building a ring
    pub fn validate(&self) -> Result<()> {
        if self.capacity < MIN_CAPACITY {
            return Err(Error::InvalidCapacity(self.capacity));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RingConfig::default();

        assert_eq!(config.capacity, DEFAULT_CAPACITY);
        assert_eq!(config.write_policy, WritePolicy::Discard);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_capacity_too_small() {
        assert_eq!(
            RingConfig::new(1).validate(),
            Err(Error::InvalidCapacity(1))
        );
        assert_eq!(
            RingConfig::new(0).validate(),
            Err(Error::InvalidCapacity(0))
        );
        assert!(RingConfig::new(MIN_CAPACITY).validate().is_ok());
    }

    #[test]
    fn test_builder_chaining() {
        let config = RingConfig::default()
            .capacity(8)
            .wait_for_readers(Duration::from_millis(5));

        assert_eq!(config.capacity, 8);
        assert_eq!(
            config.write_policy,
            WritePolicy::WaitFor(Duration::from_millis(5))
        );
    }
}
