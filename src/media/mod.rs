//! Media payloads for the frame ring
//!
//! This module provides:
//! - A shared byte-buffer pool and buffer lists
//! - The audio/video frame stored in each ring slot

pub mod frame;
pub mod pool;

pub use frame::{AvFrame, RtpFrame};
pub use pool::{BufferList, BufferPool};
