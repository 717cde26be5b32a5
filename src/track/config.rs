//! Track configuration

use crate::media::pool::{DEFAULT_BUFFER_CAPACITY, DEFAULT_MAX_POOLED};
use crate::ring::{RingConfig, WritePolicy};

/// Media track configuration options
#[derive(Debug, Clone)]
pub struct TrackConfig {
    /// Track name, used in logs and stats
    pub name: String,

    /// Ring options
    pub ring: RingConfig,

    /// Keep a copy of the latest key frame for late joiners
    pub cache_key_frame: bool,

    /// Idle buffers kept by the track's pool
    pub max_pooled_buffers: usize,

    /// Capacity of newly allocated buffers
    pub buffer_capacity: usize,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            name: "track".to_string(),
            ring: RingConfig::default(),
            cache_key_frame: true,
            max_pooled_buffers: DEFAULT_MAX_POOLED,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

impl TrackConfig {
    /// Create a new config with a track name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the ring capacity
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.ring.capacity = capacity;
        self
    }

    /// Set the write policy
    pub fn write_policy(mut self, policy: WritePolicy) -> Self {
        self.ring.write_policy = policy;
        self
    }

    /// Disable the key frame cache
    pub fn disable_key_frame_cache(mut self) -> Self {
        self.cache_key_frame = false;
        self
    }

    /// Set buffer pool limits
    pub fn pool_limits(mut self, max_pooled: usize, buffer_capacity: usize) -> Self {
        self.max_pooled_buffers = max_pooled;
        self.buffer_capacity = buffer_capacity;
        self
    }
}
